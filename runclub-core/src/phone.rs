//! Phone number normalization.
//!
//! Every phone number in the system is normalized to E.164 form
//! (`+1XXXXXXXXXX`) before any comparison or message dispatch. All
//! numbers are assumed to be US/Canada.

use crate::error::{EngineError, EngineResult};

/// Normalize a phone number to `+1XXXXXXXXXX`.
///
/// Accepts 10-digit numbers, 11-digit numbers with a leading 1, and any
/// punctuated or spaced variant of those.
pub fn normalize_phone(raw: &str) -> EngineResult<String> {
    if raw.trim().is_empty() {
        return Err(EngineError::Parse("Phone number cannot be empty".into()));
    }

    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => Ok(format!("+1{digits}")),
        11 if digits.starts_with('1') => Ok(format!("+{digits}")),
        11 => Err(EngineError::Parse(format!(
            "11-digit number must start with 1 (country code): {raw}"
        ))),
        n => Err(EngineError::Parse(format!(
            "Invalid phone number length ({n} digits): {raw}"
        ))),
    }
}

/// Whether `phone` normalizes to a valid E.164 US number.
pub fn is_valid_phone(phone: &str) -> bool {
    normalize_phone(phone).is_ok()
}
