//! Duplicate-send prevention.
//!
//! Before messaging anyone about a run, the engine inspects that
//! recipient's relay history for the exact phrases its own templates
//! produce. Deterministic string containment, no semantic judgment; the
//! phrase helpers in [`crate::message`] keep this check and the outbound
//! formatter in lockstep.

use crate::event::MessageHistoryEntry;
use crate::message::{assignment_phrase, signup_phrase, time_phrase};
use crate::time::CivilTime;

/// How many of the most recent history entries are inspected.
pub const HISTORY_LIMIT: usize = 20;

/// Whether this recipient was already messaged about `(run_name, time)`.
///
/// True iff a recent message carries both the attendee signup phrase and
/// the formatted event time, or carries the organizer assignment phrase
/// for the run. No history means not contacted.
pub fn already_contacted(
    history: &[MessageHistoryEntry],
    run_name: &str,
    time: CivilTime,
) -> bool {
    let signup = signup_phrase(run_name);
    let when = time_phrase(time);
    let assignment = assignment_phrase(run_name);

    let mut recent: Vec<&MessageHistoryEntry> = history.iter().collect();
    recent.sort_by_key(|entry| std::cmp::Reverse(entry.created_at));

    recent.iter().take(HISTORY_LIMIT).any(|entry| {
        (entry.body.contains(&signup) && entry.body.contains(&when))
            || entry.body.contains(&assignment)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_civil;

    fn entry(body: &str, created_at: &str) -> MessageHistoryEntry {
        MessageHistoryEntry {
            body: body.to_string(),
            created_at: parse_civil(created_at).unwrap(),
        }
    }

    fn target_time() -> CivilTime {
        parse_civil("2024-12-02T19:00:00").unwrap()
    }

    #[test]
    fn test_attendee_message_is_detected() {
        let history = vec![entry(
            "Hey Ada! You signed up for Office Loop on Monday, December 02 at 07:00 PM.",
            "2024-12-01T10:00:00",
        )];
        assert!(already_contacted(&history, "Office Loop", target_time()));
        // Different run name at the same time does not trip the gate.
        assert!(!already_contacted(&history, "Queens Loop", target_time()));
    }

    #[test]
    fn test_name_without_time_is_not_enough() {
        let history = vec![entry(
            "You signed up for Office Loop a while back, thanks for coming!",
            "2024-11-20T10:00:00",
        )];
        assert!(!already_contacted(&history, "Office Loop", target_time()));
    }

    #[test]
    fn test_assignment_phrase_alone_is_enough() {
        let history = vec![entry(
            "You are assigned to BL Office Loop on Monday, December 09 at 07:00 PM.",
            "2024-12-01T10:00:00",
        )];
        // The assignment check is name-only; a different formatted time
        // still counts as contacted for this run.
        assert!(already_contacted(&history, "Office Loop", target_time()));
    }

    #[test]
    fn test_empty_history_means_not_contacted() {
        assert!(!already_contacted(&[], "Office Loop", target_time()));
    }

    #[test]
    fn test_only_recent_entries_are_inspected() {
        let mut history = vec![entry(
            "You signed up for Office Loop on Monday, December 02 at 07:00 PM.",
            "2024-01-01T10:00:00",
        )];
        for day in 1..=HISTORY_LIMIT {
            history.push(entry(
                "General chatter about the weather.",
                &format!("2024-11-{:02}T10:00:00", day),
            ));
        }
        // The matching entry is the 21st most recent, past the limit.
        assert!(!already_contacted(&history, "Office Loop", target_time()));
    }

    #[test]
    fn test_decision_is_idempotent_and_stable_under_new_chatter() {
        let mut history = vec![entry(
            "You signed up for Office Loop on Monday, December 02 at 07:00 PM.",
            "2024-12-01T10:00:00",
        )];
        let first = already_contacted(&history, "Office Loop", target_time());
        let second = already_contacted(&history, "Office Loop", target_time());
        assert!(first && second);

        history.push(entry("Unrelated follow-up message.", "2024-12-01T11:00:00"));
        assert!(already_contacted(&history, "Office Loop", target_time()));
    }
}
