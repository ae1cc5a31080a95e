//! Attendance-log parsing.
//!
//! The attendance source is a form-backed sheet, one row per historical
//! run occurrence. The column layout is fixed per sheet generation; the
//! constants below document the current (Google Form) generation.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;

use crate::time::{CivilTime, EASTERN};

/// 0-indexed column: "When did the run happen?"
pub const DATE_COL: usize = 2;
/// 0-indexed column: "Which run was it?"
pub const RUN_NAME_COL: usize = 3;
/// 0-indexed column: "Who attended?"
pub const ATTENDEES_COL: usize = 5;

/// One historical run occurrence.
#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub date: CivilTime,
    pub run_name: String,
    /// Canonicalized attendee names: notes stripped, shape-checked,
    /// deduplicated case-insensitively.
    pub attendees: Vec<String>,
    pub day_of_week: Weekday,
}

static NOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*$").unwrap());
static NAME_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s\-'.]+$").unwrap());

/// Parse raw sheet rows into records. The first row is the form header.
/// Rows with a missing or unparsable date, missing run name, or no valid
/// attendees are skipped and logged.
pub fn parse_attendance_rows(rows: &[Vec<String>], now: CivilTime) -> Vec<AttendanceRecord> {
    let mut records = Vec::new();

    for (index, row) in rows.iter().enumerate().skip(1) {
        let row_number = index + 1;
        let date_str = cell(row, DATE_COL);
        let run_name = cell(row, RUN_NAME_COL);
        let attendees_str = cell(row, ATTENDEES_COL);

        if date_str.is_empty() || run_name.is_empty() || attendees_str.is_empty() {
            tracing::debug!(row = row_number, "skipping incomplete attendance row");
            continue;
        }

        let Some(date) = parse_record_date(date_str, now) else {
            tracing::warn!(row = row_number, date = date_str, "could not parse attendance date");
            continue;
        };

        let attendees = parse_attendee_list(attendees_str);
        if attendees.is_empty() {
            tracing::warn!(row = row_number, run = run_name, "no valid attendees parsed");
            continue;
        }

        records.push(AttendanceRecord {
            day_of_week: date.weekday(),
            date,
            run_name: run_name.to_string(),
            attendees,
        });
    }

    tracing::info!(count = records.len(), "parsed attendance records");
    records
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.trim()).unwrap_or("")
}

/// Strip a trailing parenthetical note and validate the name shape.
/// Returns `None` for entries that do not look like a person's name.
///
/// Known gap carried from the source data: all-letter placeholders such
/// as "TBD" pass the shape check and are kept.
pub fn clean_attendee_name(raw: &str) -> Option<String> {
    // Multi-line cell entries keep only their first line.
    let first_line = raw.trim().lines().next().unwrap_or("").trim();
    let name = NOTE_RE.replace(first_line, "").trim().to_string();

    if !name.is_empty() && NAME_SHAPE_RE.is_match(&name) {
        Some(name)
    } else {
        None
    }
}

/// Split a comma-separated attendee cell into canonical names,
/// deduplicated case-insensitively with first spelling kept.
fn parse_attendee_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for entry in raw.split(',') {
        let Some(name) = clean_attendee_name(entry) else {
            continue;
        };
        if !names.iter().any(|seen| seen.eq_ignore_ascii_case(&name)) {
            names.push(name);
        }
    }
    names
}

/// Parse a form date. Accepts `M/D/YYYY`, `M/D/YY`, `YYYY-MM-DD`, and
/// year-less `M/D` (resolved to whichever year puts the date within six
/// months of `now`). The result is midnight Eastern.
fn parse_record_date(raw: &str, now: CivilTime) -> Option<CivilTime> {
    for fmt in ["%m/%d/%Y", "%m/%d/%y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return midnight_eastern(date);
        }
    }

    // Year-less short form.
    let (month_str, day_str) = raw.split_once('/')?;
    let month: u32 = month_str.trim().parse().ok()?;
    let day: u32 = day_str.trim().parse().ok()?;

    let mut date = NaiveDate::from_ymd_opt(now.year(), month, day)?;
    let today = now.date_naive();
    if today - date > Duration::days(180) {
        date = NaiveDate::from_ymd_opt(now.year() + 1, month, day)?;
    } else if date - today > Duration::days(180) {
        date = NaiveDate::from_ymd_opt(now.year() - 1, month, day)?;
    }
    midnight_eastern(date)
}

fn midnight_eastern(date: NaiveDate) -> Option<CivilTime> {
    date.and_hms_opt(0, 0, 0)
        .and_then(|naive| {
            use chrono::TimeZone;
            EASTERN.from_local_datetime(&naive).earliest()
        })
}
