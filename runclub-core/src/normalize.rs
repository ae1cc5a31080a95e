//! Name normalization for deterministic comparison.
//!
//! Calendar entries, RSVP titles, and attendance rows name the same route
//! with different noise words ("Office Loop", "Office Loop Run", "the
//! office loop"). Normalization strips that noise so the similarity
//! scorer compares the parts that actually identify a location. The
//! semantic oracle always receives raw names; only the deterministic
//! matcher uses normalized forms.

/// Generic tokens that carry no identity.
const STOP_TOKENS: [&str; 5] = ["run", "loop", "morning", "evening", "the"];

/// Lowercase, drop punctuation and stop tokens, collapse whitespace.
pub fn normalize_name(raw: &str) -> String {
    let lowered: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    lowered
        .split_whitespace()
        .filter(|token| !STOP_TOKENS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_stop_tokens() {
        assert_eq!(normalize_name("The Office Loop Run"), "office");
        assert_eq!(normalize_name("Queens Run"), "queens");
    }

    #[test]
    fn test_collapses_whitespace_and_punctuation() {
        assert_eq!(normalize_name("  Prospect   Park's Loop "), "prospect park s");
        assert_eq!(normalize_name("Jennie Matz (T)"), "jennie matz t");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_name("Saturday Queens Loop");
        assert_eq!(normalize_name(&once), once);
    }

    #[test]
    fn test_empty_and_all_noise() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("the run"), "");
    }
}
