//! Calendar-run extraction.
//!
//! The monthly calendar is a free-text table; the oracle turns it into a
//! JSON array of runs. This module owns the prompts for identifying the
//! right calendar document and extracting runs, and the parsing of the
//! oracle's responses into [`Run`] values. Fetching the document text is
//! a collaborator concern.

use chrono::Duration;
use serde::Deserialize;

use crate::event::Run;
use crate::oracle::{strip_code_fences, NO_MATCH};
use crate::time::{parse_civil, CivilTime};

/// A document visible in the document store, for calendar identification.
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub modified: Option<String>,
}

const SYSTEM_IDENTIFY: &str = "You are a helpful assistant that identifies documents.";
const SYSTEM_PARSE: &str =
    "You are a helpful assistant that parses calendar data. Always respond with valid JSON.";

/// Prompt asking which document is the calendar for the current month.
pub fn build_identify_doc_prompt(docs: &[DocumentSummary], now: CivilTime) -> (String, String) {
    let doc_list = docs
        .iter()
        .map(|doc| {
            format!(
                "- ID: {}, Name: {}, Modified: {}",
                doc.id,
                doc.name,
                doc.modified.as_deref().unwrap_or("Unknown")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let month = now.format("%B").to_string();
    let year = now.format("%Y").to_string();

    let user = format!(
        "You are helping identify which document is the calendar/schedule document for the current month.\n\
         \n\
         Current date/time: {current}\n\
         Current month: {month} {year}\n\
         \n\
         Here are the available documents:\n\
         {doc_list}\n\
         \n\
         Based on the document names, identify the calendar/schedule document for {month} {year}.\n\
         Look for documents with names like \"{month} {year} Calendar\", \"{month} Calendar\", etc.\n\
         \n\
         If you cannot find an appropriate calendar document for {month} {year}, respond with exactly \"{no_match}\".\n\
         Otherwise, respond with ONLY the document ID, nothing else.",
        current = now.format("%Y-%m-%d %I:%M %p %Z"),
        no_match = NO_MATCH,
    );

    (SYSTEM_IDENTIFY.to_string(), user)
}

/// Parse the identification response into a document id.
pub fn parse_doc_id_response(response: &str) -> Option<String> {
    let cleaned = strip_code_fences(response);
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(NO_MATCH) {
        return None;
    }
    Some(cleaned.to_string())
}

/// Prompt asking the oracle to extract every run from the calendar text,
/// including organizer (BL) assignments, as a JSON array.
pub fn build_parse_runs_prompt(calendar_text: &str, now: CivilTime) -> (String, String) {
    let month = now.format("%B").to_string();
    let year = now.format("%Y").to_string();

    let user = format!(
        "You are parsing a monthly calendar document to extract ALL runs.\n\
         \n\
         Current month/year: {month} {year}\n\
         \n\
         Calendar document content:\n\
         {calendar_text}\n\
         \n\
         CALENDAR FORMAT:\n\
         The calendar is a monthly table/grid with days of the week as column headers.\n\
         Each cell contains a day number, then zero or more run entries. A run entry has a\n\
         run name and time (e.g., \"Office Loop 7 PM\"), then a BL (bottom-liner) section:\n\
         \"BL: (H) Name\" for Head and \"(T) Name\" for Tail. Some runs have both, one, or\n\
         no BLs; the separator after \"BL:\" may be missing. Ignore other fields such as\n\
         \"Chat blast:\" or \"RSVP reach out:\".\n\
         \n\
         TASK:\n\
         Extract ALL runs from the entire month. For each run, combine the cell's day\n\
         number with {month} {year} and the parsed time (7 PM = 19:00) into an ISO\n\
         datetime with the US Eastern offset, and collect ALL BL names regardless of\n\
         (H) or (T) role.\n\
         \n\
         Respond with ONLY a JSON array. Each run must have:\n\
         - \"time\": ISO datetime (e.g., \"{year}-12-02T19:00:00-05:00\")\n\
         - \"name\": run name (e.g., \"Office Loop\")\n\
         - \"bls\": array of BL names ([] if none)\n\
         - \"full_text\": the complete text block for this run including the BL section\n\
         \n\
         If no runs are found, respond with []."
    );

    (SYSTEM_PARSE.to_string(), user)
}

#[derive(Debug, Deserialize)]
struct RawRun {
    time: String,
    name: String,
    #[serde(default)]
    bls: Vec<String>,
    #[serde(default)]
    full_text: String,
}

/// Parse the run-extraction response. Unparsable JSON yields an empty
/// list; runs with an unparsable time are skipped and logged.
pub fn parse_runs_response(response: &str) -> Vec<Run> {
    let cleaned = strip_code_fences(response);
    let raw_runs: Vec<RawRun> = match serde_json::from_str(cleaned) {
        Ok(runs) => runs,
        Err(err) => {
            tracing::error!(%err, "failed to parse runs JSON from oracle");
            return Vec::new();
        }
    };

    let mut runs = Vec::new();
    for raw in raw_runs {
        match parse_civil(&raw.time) {
            Ok(start_time) => runs.push(Run {
                name: raw.name,
                start_time,
                organizers: raw.bls,
                raw_text: raw.full_text,
            }),
            Err(err) => {
                tracing::warn!(run = %raw.name, time = %raw.time, %err, "skipping run with bad time");
            }
        }
    }

    tracing::info!(count = runs.len(), "parsed runs from calendar");
    runs
}

/// Runs starting between `now` and `now + hours`, inclusive. This is the
/// forward-looking "what is coming up" filter, distinct from the
/// symmetric correlation window.
pub fn upcoming_within(runs: Vec<Run>, now: CivilTime, hours: i64) -> Vec<Run> {
    let cutoff = now + Duration::hours(hours);
    runs.into_iter()
        .filter(|run| run.start_time >= now && run.start_time <= cutoff)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_runs_response_with_code_fences() {
        let response = r#"```json
[{"time": "2024-12-02T19:00:00-05:00", "name": "Office Loop", "bls": ["Gareth", "Nic L"], "full_text": "Office Loop 7 PM\nBL: (H) Gareth\n(T) Nic L"}]
```"#;
        let runs = parse_runs_response(response);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, "Office Loop");
        assert_eq!(runs[0].organizers, vec!["Gareth", "Nic L"]);
    }

    #[test]
    fn test_parse_runs_skips_bad_times_keeps_good() {
        let response = r#"[
            {"time": "garbage", "name": "Bad", "bls": []},
            {"time": "2024-12-02T19:00:00-05:00", "name": "Good", "bls": []}
        ]"#;
        let runs = parse_runs_response(response);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, "Good");
        assert!(runs[0].organizers.is_empty());
    }

    #[test]
    fn test_parse_runs_unparsable_is_empty() {
        assert!(parse_runs_response("I could not parse the calendar").is_empty());
    }

    #[test]
    fn test_parse_doc_id_response() {
        assert_eq!(parse_doc_id_response(" doc-123 ").unwrap(), "doc-123");
        assert!(parse_doc_id_response("NONE").is_none());
        assert!(parse_doc_id_response("").is_none());
    }

    #[test]
    fn test_upcoming_within_is_forward_looking() {
        let now = parse_civil("2024-12-02T12:00:00").unwrap();
        let mk = |time: &str| Run {
            name: time.to_string(),
            start_time: parse_civil(time).unwrap(),
            organizers: vec![],
            raw_text: String::new(),
        };
        let runs = vec![
            mk("2024-12-02T11:00:00"), // already started
            mk("2024-12-02T19:00:00"), // within 10 hours
            mk("2024-12-02T22:00:00"), // exactly at cutoff
            mk("2024-12-02T22:00:01"), // beyond
        ];
        let upcoming = upcoming_within(runs, now, 10);
        let names: Vec<_> = upcoming.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["2024-12-02T19:00:00", "2024-12-02T22:00:00"]);
    }
}
