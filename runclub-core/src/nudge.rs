//! Nudge candidate selection.
//!
//! Ranks past attendees of a correlated run cluster for re-engagement.
//! Infrequent attendees come first (they are the ones worth nudging),
//! then whoever attended most recently within a tier. The list is cut
//! to `max_candidates` before exclusions are applied, so an exclusion
//! can leave the final list short of the cap.

use chrono::Duration;

use crate::attendance::AttendanceRecord;
use crate::similarity::{matches_any, EXCLUDE_THRESHOLD};
use crate::time::CivilTime;

/// Default cap on the candidate list.
pub const DEFAULT_MAX_CANDIDATES: usize = 10;

/// A past participant worth re-engaging, recomputed per invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct NudgeCandidate {
    pub name: String,
    pub last_attendance: CivilTime,
    pub attendance_count: u32,
    pub days_since_last: i64,
}

impl NudgeCandidate {
    /// Priority tier: infrequent attendees first.
    pub fn tier(&self) -> u8 {
        match self.attendance_count {
            0..=3 => 0,
            4..=6 => 1,
            _ => 2,
        }
    }
}

/// Rank the cluster's attendees into a nudge list.
///
/// `rsvp_names` are people already signed up (matched by first name,
/// case-insensitive); `organizer_names` are excluded by fuzzy match at
/// the strict threshold so an organizer writing their own name short is
/// still caught.
pub fn select_nudge_candidates(
    cluster: &[AttendanceRecord],
    rsvp_names: &[String],
    organizer_names: &[String],
    now: CivilTime,
    max_candidates: usize,
) -> Vec<NudgeCandidate> {
    let mut candidates: Vec<NudgeCandidate> = Vec::new();

    for record in cluster {
        for attendee in &record.attendees {
            match candidates
                .iter_mut()
                .find(|c| same_person(&c.name, attendee))
            {
                Some(candidate) => {
                    candidate.attendance_count += 1;
                    if record.date > candidate.last_attendance {
                        candidate.last_attendance = record.date;
                    }
                }
                None => candidates.push(NudgeCandidate {
                    name: attendee.clone(),
                    last_attendance: record.date,
                    attendance_count: 1,
                    days_since_last: 0,
                }),
            }
        }
    }

    for candidate in &mut candidates {
        let since = now.signed_duration_since(candidate.last_attendance);
        candidate.days_since_last = since.max(Duration::zero()).num_days();
    }

    candidates.sort_by_key(|c| (c.tier(), c.days_since_last));
    candidates.truncate(max_candidates);

    let rsvp_first_names: Vec<&str> = rsvp_names.iter().filter_map(|n| first_name(n)).collect();
    candidates.retain(|candidate| {
        if let Some(first) = first_name(&candidate.name) {
            if rsvp_first_names
                .iter()
                .any(|rsvp| rsvp.eq_ignore_ascii_case(first))
            {
                tracing::debug!(name = %candidate.name, "already RSVP'd, excluding");
                return false;
            }
        }
        if matches_any(&candidate.name, organizer_names, EXCLUDE_THRESHOLD) {
            tracing::debug!(name = %candidate.name, "matches an organizer, excluding");
            return false;
        }
        true
    });

    tracing::info!(count = candidates.len(), "selected nudge candidates");
    candidates
}

fn first_name(name: &str) -> Option<&str> {
    name.split_whitespace().next()
}

/// Whether two attendee spellings refer to the same person. The log often
/// records a bare first name on one row and the full name on another, so
/// containment in either direction (case-insensitive) merges them.
fn same_person(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}
