//! Outbound message templates.
//!
//! The duplicate-send gate works by searching message history for the
//! exact phrases these templates produce, so the phrase helpers here are
//! a wire contract between sending and checking. Any change to
//! [`signup_phrase`], [`time_phrase`], or [`assignment_phrase`] must keep
//! the gate in lockstep.

use crate::nudge::NudgeCandidate;
use crate::time::{format_event_time, CivilTime};

/// `"signed up for {run_name}"`, shared by the attendee template and the
/// gate.
pub fn signup_phrase(run_name: &str) -> String {
    format!("signed up for {run_name}")
}

/// `"on {formatted time}"`, shared by the attendee template and the gate.
pub fn time_phrase(time: CivilTime) -> String {
    format!("on {}", format_event_time(time))
}

/// `"You are assigned to BL {run_name}"`, shared by the organizer
/// template and the gate.
pub fn assignment_phrase(run_name: &str) -> String {
    format!("You are assigned to BL {run_name}")
}

/// `"Ada"`, `"Ada and Ben"`, `"Ada, Ben, and Cara"`.
pub fn join_first_names(names: &[String]) -> String {
    let firsts: Vec<&str> = names
        .iter()
        .filter_map(|name| name.split_whitespace().next())
        .collect();
    match firsts.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [a, b] => format!("{a} and {b}"),
        [head @ .., last] => format!("{}, and {last}", head.join(", ")),
    }
}

/// Group message to attendees who signed up for an upcoming run.
pub fn format_attendee_message(
    attendee_names: &[String],
    run_name: &str,
    time: CivilTime,
    location: Option<&str>,
) -> String {
    let greeting = match join_first_names(attendee_names).as_str() {
        "" => "Hey!".to_string(),
        names => format!("Hey {names}!"),
    };
    let where_line = match location {
        Some(location) => format!(" We're meeting at {location}."),
        None => String::new(),
    };
    format!(
        "{greeting} You {signup} {when}.{where_line} Reply here if you have any \
         questions. See you there!",
        signup = signup_phrase(run_name),
        when = time_phrase(time),
    )
}

/// Assignment nudge to an organizer, with the re-engagement list.
/// Co-organizers whose contact info could not be resolved still get a
/// mention so the recipient knows who else is on the hook.
pub fn format_organizer_message(
    run_name: &str,
    time: CivilTime,
    candidates: &[NudgeCandidate],
    co_organizers: &[String],
    unresolved_organizers: &[String],
    form_link: Option<&str>,
) -> String {
    let mut message = format!(
        "{assignment} {when}.",
        assignment = assignment_phrase(run_name),
        when = time_phrase(time),
    );

    if !co_organizers.is_empty() {
        message.push_str(&format!(
            " You're on with {}.",
            join_first_names(co_organizers)
        ));
    }

    for name in unresolved_organizers {
        message.push_str(&format!(
            " {name} is also BL for this run, but their contact info is not available yet."
        ));
    }

    if candidates.is_empty() {
        message.push_str(" No past attendees to nudge this time.");
    } else {
        message.push_str("\n\nPast attendees worth a nudge:\n");
        for candidate in candidates {
            message.push_str(&format!(
                "- {} (attended {}x, last on {}, {} days ago)\n",
                candidate.name,
                candidate.attendance_count,
                candidate.last_attendance.format("%b %d, %Y"),
                candidate.days_since_last
            ));
        }
    }

    if let Some(link) = form_link {
        message.push_str(&format!("\nPlease log attendance afterwards: {link}"));
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_civil;

    fn time() -> CivilTime {
        parse_civil("2024-12-02T19:00:00").unwrap()
    }

    #[test]
    fn test_join_first_names() {
        assert_eq!(join_first_names(&[]), "");
        assert_eq!(join_first_names(&["Ada Park".to_string()]), "Ada");
        assert_eq!(
            join_first_names(&["Ada Park".to_string(), "Ben Ito".to_string()]),
            "Ada and Ben"
        );
        assert_eq!(
            join_first_names(&[
                "Ada Park".to_string(),
                "Ben Ito".to_string(),
                "Cara Diaz".to_string()
            ]),
            "Ada, Ben, and Cara"
        );
    }

    #[test]
    fn test_attendee_message_carries_gate_phrases() {
        let message = format_attendee_message(
            &["Ada Park".to_string()],
            "Office Loop",
            time(),
            Some("Grand Army Plaza"),
        );
        assert!(message.contains("signed up for Office Loop"));
        assert!(message.contains("on Monday, December 02 at 07:00 PM"));
        assert!(message.contains("Grand Army Plaza"));
        assert!(message.starts_with("Hey Ada!"));
    }

    #[test]
    fn test_organizer_message_carries_assignment_phrase() {
        let candidates = vec![NudgeCandidate {
            name: "Ben Ito".to_string(),
            last_attendance: time(),
            attendance_count: 2,
            days_since_last: 9,
        }];
        let message = format_organizer_message(
            "Office Loop",
            time(),
            &candidates,
            &["Jennie Matz".to_string()],
            &[],
            Some("https://forms.example/attendance"),
        );
        assert!(message.contains("You are assigned to BL Office Loop"));
        assert!(message.contains("on Monday, December 02 at 07:00 PM"));
        assert!(message.contains("You're on with Jennie."));
        assert!(message.contains("- Ben Ito (attended 2x, last on Dec 02, 2024, 9 days ago)"));
        assert!(message.contains("https://forms.example/attendance"));
    }

    #[test]
    fn test_organizer_message_notes_unresolved_co_organizers() {
        let message = format_organizer_message(
            "Office Loop",
            time(),
            &[],
            &[],
            &["Gareth".to_string()],
            None,
        );
        assert!(message.contains(
            "Gareth is also BL for this run, but their contact info is not available yet."
        ));
    }

    #[test]
    fn test_organizer_message_without_candidates() {
        let message = format_organizer_message("Office Loop", time(), &[], &[], &[], None);
        assert!(message.contains("No past attendees to nudge"));
    }
}
