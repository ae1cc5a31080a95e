//! Semantic match oracle: client contract and response parsing.
//!
//! The oracle is a stateless natural-language request/response service
//! used to disambiguate among windowed candidates when deterministic
//! matching is insufficient. This module defines the trait collaborator
//! clients implement, plus the parsers for the three response shapes the
//! engine asks for: a single selected index, an inclusive name set, and a
//! name-to-name JSON map.
//!
//! Parsing is deliberately forgiving about transport but strict about
//! meaning: a malformed response is a failed match (the caller proceeds
//! as if no match were found), never a fatal error.

use crate::error::EngineResult;

/// A stateless prompt-in, text-out completion service.
#[allow(async_fn_in_trait)]
pub trait MatchOracle {
    /// Send one request and return the raw text response.
    ///
    /// Implementations return [`crate::error::EngineError::Oracle`] for
    /// transport or auth failures; they never interpret the content.
    async fn complete(&self, system: &str, user: &str) -> EngineResult<String>;
}

/// Explicit no-match signal the oracle is contracted to return instead of
/// guessing.
pub const NO_MATCH: &str = "NONE";

/// Strip a Markdown code fence wrapper, if present.
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "text", ...) on the opening fence.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

/// Parse a single-selection response into a zero-based candidate index.
///
/// The oracle answers with a 1-based candidate number or [`NO_MATCH`].
/// Anything non-numeric, out of range, or ambiguous is `None`.
pub fn parse_selection(response: &str, candidate_count: usize) -> Option<usize> {
    let cleaned = strip_code_fences(response);
    if cleaned.eq_ignore_ascii_case(NO_MATCH) {
        return None;
    }
    let number: usize = cleaned.parse().ok()?;
    if number >= 1 && number <= candidate_count {
        Some(number - 1)
    } else {
        tracing::warn!(response = cleaned, candidate_count, "oracle selection out of range");
        None
    }
}

/// Parse an inclusive name-set response: one name per line, optional
/// bullet prefixes, [`NO_MATCH`] for the empty set.
pub fn parse_name_set(response: &str) -> Vec<String> {
    let cleaned = strip_code_fences(response);
    if cleaned.eq_ignore_ascii_case(NO_MATCH) {
        return Vec::new();
    }
    cleaned
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches("- ")
                .trim_start_matches("* ")
                .trim()
        })
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a name-to-name JSON map (`{"Nic L": "Nicolas Lavin", "X": null}`).
/// Returns `None` when the response is not a JSON object.
pub fn parse_name_map(response: &str) -> Option<Vec<(String, Option<String>)>> {
    let cleaned = strip_code_fences(response);
    let value: serde_json::Value = serde_json::from_str(cleaned).ok()?;
    let object = value.as_object()?;

    let mut mappings = Vec::with_capacity(object.len());
    for (name, matched) in object {
        let matched = match matched {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            _ => return None,
        };
        mappings.push((name.clone(), matched));
    }
    Some(mappings)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted oracle for engine tests.

    use std::cell::RefCell;

    use super::MatchOracle;
    use crate::error::{EngineError, EngineResult};

    /// Replays canned responses in order and counts calls.
    pub struct ScriptedOracle {
        responses: RefCell<Vec<EngineResult<String>>>,
        pub calls: RefCell<usize>,
    }

    impl ScriptedOracle {
        pub fn new(responses: Vec<EngineResult<String>>) -> Self {
            let mut responses = responses;
            responses.reverse();
            ScriptedOracle {
                responses: RefCell::new(responses),
                calls: RefCell::new(0),
            }
        }

        pub fn unavailable() -> Self {
            ScriptedOracle::new(vec![])
        }

        pub fn call_count(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl MatchOracle for ScriptedOracle {
        async fn complete(&self, _system: &str, _user: &str) -> EngineResult<String> {
            *self.calls.borrow_mut() += 1;
            self.responses
                .borrow_mut()
                .pop()
                .unwrap_or_else(|| Err(EngineError::Oracle("scripted oracle exhausted".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_valid() {
        assert_eq!(parse_selection("2", 3), Some(1));
        assert_eq!(parse_selection(" 1 ", 1), Some(0));
    }

    #[test]
    fn test_parse_selection_none_and_malformed() {
        assert_eq!(parse_selection("NONE", 3), None);
        assert_eq!(parse_selection("none", 3), None);
        assert_eq!(parse_selection("candidate 2", 3), None);
        assert_eq!(parse_selection("0", 3), None);
        assert_eq!(parse_selection("4", 3), None);
        assert_eq!(parse_selection("", 3), None);
    }

    #[test]
    fn test_parse_name_set() {
        let response = "- Thursday South Brooklyn\n* SBK Dumping Run\nQueens Loop";
        assert_eq!(
            parse_name_set(response),
            vec!["Thursday South Brooklyn", "SBK Dumping Run", "Queens Loop"]
        );
        assert!(parse_name_set("NONE").is_empty());
        assert!(parse_name_set("  ").is_empty());
    }

    #[test]
    fn test_parse_name_map() {
        let response = r#"{"Nic L": "Nicolas Lavin", "Unknown": null}"#;
        let map = parse_name_map(response).unwrap();
        assert!(map.contains(&("Nic L".to_string(), Some("Nicolas Lavin".to_string()))));
        assert!(map.contains(&("Unknown".to_string(), None)));
    }

    #[test]
    fn test_parse_name_map_rejects_non_object() {
        assert!(parse_name_map("not json at all").is_none());
        assert!(parse_name_map(r#"["a", "b"]"#).is_none());
        assert!(parse_name_map(r#"{"a": 3}"#).is_none());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n2\n```"), "2");
        assert_eq!(strip_code_fences("plain"), "plain");
    }
}
