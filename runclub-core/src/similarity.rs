//! Deterministic string-similarity scoring.
//!
//! Character-level sequence similarity (Jaro-Winkler) over normalized
//! forms. The metric is symmetric: `score(a, b) == score(b, a)`.
//!
//! Two thresholds are used on purpose. Exclusion decisions ("is this
//! attendee actually an organizer?") use the strict cutoff because a
//! false exclusion silently loses a match. Inclusion decisions when
//! disambiguating within a single day use the lenient cutoff because a
//! false inclusion only costs an extra nudge suggestion.

use crate::normalize::normalize_name;

/// Acceptance cutoff for exclusion decisions.
pub const EXCLUDE_THRESHOLD: f64 = 0.8;

/// Acceptance cutoff for inclusion decisions within a single day's runs.
pub const INCLUDE_THRESHOLD: f64 = 0.6;

/// Similarity of two names in [0, 1] on normalized forms.
pub fn score(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&normalize_name(a), &normalize_name(b))
}

/// Whether `name` scores at or above `threshold` against any of `others`.
pub fn matches_any(name: &str, others: &[String], threshold: f64) -> bool {
    others.iter().any(|other| score(name, other) >= threshold)
}
