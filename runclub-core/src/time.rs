//! Civil-time handling.
//!
//! Every timestamp in the engine lives in one fixed civil zone
//! (US Eastern). The zone's UTC offset changes with daylight saving, so
//! conversions always go through chrono-tz rather than a constant offset.
//! Timestamps that arrive without zone information are interpreted as
//! already being Eastern.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::error::{EngineError, EngineResult};

/// The fixed civil zone for all scheduling data.
pub const EASTERN: Tz = chrono_tz::America::New_York;

/// A timestamp in the fixed civil zone.
pub type CivilTime = DateTime<Tz>;

/// Parse an ISO-8601-ish timestamp into civil time.
///
/// Accepts, in order of preference:
/// - RFC 3339 with offset or `Z` (converted into Eastern)
/// - `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DDTHH:MM` without a zone (assumed Eastern)
/// - `YYYY-MM-DD` (midnight Eastern)
pub fn parse_civil(s: &str) -> EngineResult<CivilTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&EASTERN));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return civil_from_naive(naive, s);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| EngineError::Parse(format!("Invalid date: {s}")))?;
        return civil_from_naive(naive, s);
    }

    Err(EngineError::Parse(format!("Unrecognized timestamp: {s}")))
}

/// Resolve a naive local time in the Eastern zone. During the fall-back
/// transition the earlier of the two possible instants is used.
fn civil_from_naive(naive: NaiveDateTime, original: &str) -> EngineResult<CivilTime> {
    EASTERN
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| EngineError::Parse(format!("Nonexistent local time: {original}")))
}

/// Canonical event-time string used in outbound messages and the
/// idempotency gate, e.g. "Tuesday, December 02 at 07:00 PM".
pub fn format_event_time(t: CivilTime) -> String {
    t.format("%A, %B %d at %I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Offset, Timelike};

    #[test]
    fn test_parse_with_explicit_offset() {
        let t = parse_civil("2024-12-02T19:00:00-05:00").unwrap();
        assert_eq!(t.hour(), 19);
        assert_eq!(t.day(), 2);
    }

    #[test]
    fn test_parse_naive_assumed_eastern() {
        let t = parse_civil("2024-07-04T09:30:00").unwrap();
        assert_eq!(t.hour(), 9);
        // July is daylight time: UTC-4
        assert_eq!(t.offset().fix().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_parse_naive_winter_is_standard_offset() {
        let t = parse_civil("2024-12-02T19:00:00").unwrap();
        // December is standard time: UTC-5
        assert_eq!(t.offset().fix().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_parse_utc_converts_to_eastern() {
        let t = parse_civil("2024-12-03T00:00:00Z").unwrap();
        // Midnight UTC is 7 PM the previous day in EST.
        assert_eq!(t.day(), 2);
        assert_eq!(t.hour(), 19);
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        let t = parse_civil("2024-12-02").unwrap();
        assert_eq!(t.hour(), 0);
        assert_eq!(t.minute(), 0);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(parse_civil("next tuesday-ish").is_err());
    }

    #[test]
    fn test_format_event_time_zero_pads() {
        let t = parse_civil("2025-12-02T19:00:00-05:00").unwrap();
        assert_eq!(format_event_time(t), "Tuesday, December 02 at 07:00 PM");
    }
}
