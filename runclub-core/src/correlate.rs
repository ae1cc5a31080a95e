//! Cross-source correlation.
//!
//! Matches entities across the three scheduling sources: calendar runs to
//! RSVP events (and the reverse), and a resolved run/event pair to the
//! historical attendance records for the same day of week. Candidate
//! selection goes through the time-window filter first, then either
//! deterministic similarity or the oracle depending on how many
//! candidates survive the window.
//!
//! Every "nothing matched" outcome here is a normal return value, not an
//! error. Oracle transport failures degrade to the deterministic path
//! where one is defined and to no-match otherwise.

use chrono::Weekday;

use crate::attendance::AttendanceRecord;
use crate::event::{Run, RsvpEvent};
use crate::oracle::{parse_name_set, parse_selection, MatchOracle, NO_MATCH};
use crate::similarity::{score, INCLUDE_THRESHOLD};
use crate::time::{format_event_time, CivilTime};
use crate::window::{filter_window, MatchCandidate};

/// Hours either side of a reference time inside which a candidate from
/// another source can still be the same occasion.
pub const CORRELATION_WINDOW_HOURS: i64 = 12;

/// Abbreviation table handed to the oracle inside the prompt. The oracle
/// itself carries no location knowledge.
pub type AbbreviationTable = [(&'static str, &'static str)];

/// How a set of windowed candidates gets matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// One candidate: score it directly, no oracle call.
    Deterministic,
    /// Several candidates: the oracle picks, with an explicit no-match
    /// option.
    OracleAssisted,
}

impl MatchStrategy {
    pub fn for_candidates(count: usize) -> MatchStrategy {
        if count <= 1 {
            MatchStrategy::Deterministic
        } else {
            MatchStrategy::OracleAssisted
        }
    }
}

const SYSTEM_MATCH: &str =
    "You are a careful assistant that matches event names across data sources. \
     Follow the matching rules exactly and never guess.";

/// Find the RSVP event that is the same occasion as `run`, if any.
pub async fn match_run_to_event<O: MatchOracle>(
    oracle: &O,
    run: &Run,
    events: Vec<RsvpEvent>,
    window_hours: i64,
    abbreviations: &AbbreviationTable,
) -> Option<RsvpEvent> {
    let candidates = filter_window(events, run.start_time, window_hours, |e| e.start_time);
    if candidates.is_empty() {
        tracing::info!(run = %run.name, "no RSVP events inside the window");
        return None;
    }

    let descriptions: Vec<String> = candidates.iter().map(describe_event).collect();
    let names: Vec<&str> = candidates.iter().map(|c| c.entity.title.as_str()).collect();

    let index = select_candidate(
        oracle,
        &run.name,
        run.start_time,
        &names,
        &descriptions,
        abbreviations,
    )
    .await?;
    Some(candidates.into_iter().nth(index)?.entity)
}

/// Find the calendar run that is the same occasion as `event`, if any.
/// Used to recover organizer assignments for an RSVP-first pass.
pub async fn match_event_to_run<O: MatchOracle>(
    oracle: &O,
    event: &RsvpEvent,
    runs: Vec<Run>,
    window_hours: i64,
    abbreviations: &AbbreviationTable,
) -> Option<Run> {
    let candidates = filter_window(runs, event.start_time, window_hours, |r| r.start_time);
    if candidates.is_empty() {
        tracing::info!(event = %event.title, "no calendar runs inside the window");
        return None;
    }

    let descriptions: Vec<String> = candidates.iter().map(describe_run).collect();
    let names: Vec<&str> = candidates.iter().map(|c| c.entity.name.as_str()).collect();

    let index = select_candidate(
        oracle,
        &event.title,
        event.start_time,
        &names,
        &descriptions,
        abbreviations,
    )
    .await?;
    Some(candidates.into_iter().nth(index)?.entity)
}

/// Pick the one candidate matching `target_name`, or `None`.
///
/// A single candidate is scored deterministically without an oracle call.
/// With several, the oracle selects by number; a transport failure or
/// malformed answer is a no-match.
async fn select_candidate<O: MatchOracle>(
    oracle: &O,
    target_name: &str,
    target_time: CivilTime,
    candidate_names: &[&str],
    candidate_descriptions: &[String],
    abbreviations: &AbbreviationTable,
) -> Option<usize> {
    match MatchStrategy::for_candidates(candidate_names.len()) {
        MatchStrategy::Deterministic => {
            let candidate = candidate_names[0];
            let similarity = score(target_name, candidate);
            if similarity >= INCLUDE_THRESHOLD {
                tracing::debug!(target_name, candidate, similarity, "single-candidate match");
                Some(0)
            } else {
                tracing::info!(target_name, candidate, similarity, "single candidate too dissimilar");
                None
            }
        }
        MatchStrategy::OracleAssisted => {
            let user = build_selection_prompt(
                target_name,
                target_time,
                candidate_descriptions,
                abbreviations,
            );
            match oracle.complete(SYSTEM_MATCH, &user).await {
                Ok(response) => {
                    let index = parse_selection(&response, candidate_names.len());
                    if index.is_none() {
                        tracing::info!(target_name, %response, "oracle reported no match");
                    }
                    index
                }
                Err(err) => {
                    tracing::warn!(target_name, %err, "oracle unavailable, treating as no match");
                    None
                }
            }
        }
    }
}

fn build_selection_prompt(
    target_name: &str,
    target_time: CivilTime,
    candidate_descriptions: &[String],
    abbreviations: &AbbreviationTable,
) -> String {
    let candidate_list = candidate_descriptions
        .iter()
        .enumerate()
        .map(|(i, desc)| format!("{}. {desc}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are matching a scheduled run against candidate events from another data source.\n\
         \n\
         Target run: \"{target_name}\"\n\
         Target time: {time}\n\
         \n\
         Candidates (each within the allowed time window):\n\
         {candidate_list}\n\
         \n\
         Matching rules:\n\
         1. Exact or near-exact name matches always match.\n\
         2. Ignore day-of-week prefixes and generic suffixes (\"Run\", \"Loop\", \"Series\") when comparing.\n\
         {abbrev_rules}\
         4. Different event types at the same location are NOT the same event \
         (a canvassing event is not a loop run).\n\
         5. If no candidate clearly refers to the same occasion, or the match is ambiguous, \
         do not guess.\n\
         \n\
         Respond with ONLY the number of the matching candidate, or exactly \"{no_match}\" if none match.",
        time = format_event_time(target_time),
        abbrev_rules = abbreviation_rules(abbreviations),
        no_match = NO_MATCH,
    )
}

fn abbreviation_rules(abbreviations: &AbbreviationTable) -> String {
    if abbreviations.is_empty() {
        return "3. There are no known abbreviations.\n".to_string();
    }
    let table = abbreviations
        .iter()
        .map(|(short, long)| format!("   - \"{short}\" means \"{long}\""))
        .collect::<Vec<_>>()
        .join("\n");
    format!("3. Known abbreviations:\n{table}\n")
}

fn describe_event(candidate: &MatchCandidate<RsvpEvent>) -> String {
    let event = &candidate.entity;
    let mut parts = vec![format!(
        "\"{}\" ({:.1}h from target)",
        event.title,
        candidate.delta_hours()
    )];
    if let Some(location) = event.location.as_ref().and_then(|l| l.display()) {
        parts.push(format!("location: {location}"));
    }
    if let Some(description) = &event.description {
        let snippet: String = description.chars().take(120).collect();
        parts.push(format!("description: {snippet}"));
    }
    parts.join(", ")
}

fn describe_run(candidate: &MatchCandidate<Run>) -> String {
    let run = &candidate.entity;
    format!("\"{}\" ({:.1}h from target)", run.name, candidate.delta_hours())
}

/// Records from the historical cluster that refer to the same occasion as
/// the target run/event names.
///
/// All records sharing the target's day of week are candidates. When they
/// all carry one distinct run name there is nothing to disambiguate and
/// every record is returned without an oracle call. Otherwise the oracle
/// selects the subset of historical names referring to the same location;
/// on failure the cluster is empty for this invocation.
pub async fn correlate_attendance<O: MatchOracle>(
    oracle: &O,
    target_names: &[String],
    day: Weekday,
    records: &[AttendanceRecord],
) -> Vec<AttendanceRecord> {
    let same_day: Vec<AttendanceRecord> = records
        .iter()
        .filter(|record| record.day_of_week == day)
        .cloned()
        .collect();
    if same_day.is_empty() {
        tracing::info!(?day, "no attendance history for this day of week");
        return Vec::new();
    }

    let mut distinct: Vec<&str> = Vec::new();
    for record in &same_day {
        if !distinct.iter().any(|name| name.eq_ignore_ascii_case(&record.run_name)) {
            distinct.push(&record.run_name);
        }
    }

    if distinct.len() == 1 {
        tracing::debug!(run = distinct[0], count = same_day.len(), "single historical run name");
        return same_day;
    }

    let user = build_attendance_prompt(target_names, &distinct);
    let selected = match oracle.complete(SYSTEM_MATCH, &user).await {
        Ok(response) => parse_name_set(&response),
        Err(err) => {
            tracing::warn!(%err, "oracle unavailable, skipping attendance correlation");
            return Vec::new();
        }
    };

    // Keep only names the history actually contains; the oracle may not
    // introduce new ones.
    let selected: Vec<String> = selected
        .into_iter()
        .filter(|name| distinct.iter().any(|known| known.eq_ignore_ascii_case(name)))
        .collect();
    if selected.is_empty() {
        tracing::info!(targets = ?target_names, "oracle matched no historical run names");
        return Vec::new();
    }

    same_day
        .into_iter()
        .filter(|record| {
            selected
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&record.run_name))
        })
        .collect()
}

fn build_attendance_prompt(target_names: &[String], historical_names: &[&str]) -> String {
    let targets = target_names
        .iter()
        .map(|name| format!("- {name}"))
        .collect::<Vec<_>>()
        .join("\n");
    let historical = historical_names
        .iter()
        .map(|name| format!("- {name}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are matching run names from an attendance log against an upcoming run.\n\
         \n\
         The upcoming run is known by these names across sources:\n\
         {targets}\n\
         \n\
         Historical run names from the attendance log (same day of week):\n\
         {historical}\n\
         \n\
         Matching rules:\n\
         1. Include every historical name that refers to the same location as the upcoming run.\n\
         2. Exact or near-exact matches are always included.\n\
         3. Ignore day-of-week prefixes and generic suffixes (\"Run\", \"Loop\", \"Series\").\n\
         4. Do NOT include a different event type that merely shares the location.\n\
         5. If none refer to the same location, respond with exactly \"{no_match}\".\n\
         \n\
         Respond with the matching historical names, one per line, exactly as written above.",
        no_match = NO_MATCH,
    )
}
