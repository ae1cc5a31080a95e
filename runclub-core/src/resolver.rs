//! Organizer name to contact resolution.
//!
//! Calendar organizer names are abbreviated and sometimes misspelled
//! ("Nic L" for "Nicolas Lavin"). The oracle maps them onto the contact
//! directory; when it is unavailable or answers with something other
//! than a JSON object, resolution falls back to exact case-insensitive
//! matching so a reachable organizer with a clean name is never lost.

use crate::contact::Contact;
use crate::oracle::{parse_name_map, MatchOracle};

/// Outcome of resolving one batch of organizer names.
#[derive(Debug, Default)]
pub struct Resolution {
    pub resolved: Vec<Contact>,
    /// Names with no directory match, reported so downstream messaging
    /// can mention them without contact info.
    pub unresolved: Vec<String>,
}

const SYSTEM_RESOLVE: &str =
    "You are a helpful assistant that matches abbreviated names to a contact directory. \
     Always respond with valid JSON.";

/// Resolve organizer display names against the directory.
///
/// `allow_list`, when non-empty, filters the resolved set after matching;
/// a resolved contact not on the list is dropped silently, not reported
/// as unresolved.
pub async fn resolve_organizers<O: MatchOracle>(
    oracle: &O,
    names: &[String],
    directory: &[Contact],
    allow_list: &[String],
) -> Resolution {
    if names.is_empty() {
        return Resolution::default();
    }

    let mappings = match oracle_mappings(oracle, names, directory).await {
        Some(mappings) => mappings,
        None => exact_mappings(names, directory),
    };

    let mut resolution = Resolution::default();
    for (name, matched) in mappings {
        let contact = matched.as_deref().and_then(|canonical| {
            directory
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(canonical))
        });
        match contact {
            Some(contact) => resolution.resolved.push(contact.clone()),
            None => resolution.unresolved.push(name),
        }
    }

    if !allow_list.is_empty() {
        resolution.resolved.retain(|contact| {
            let allowed = allow_list
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&contact.name));
            if !allowed {
                tracing::info!(name = %contact.name, "organizer not on allow-list, dropping");
            }
            allowed
        });
    }

    tracing::info!(
        resolved = resolution.resolved.len(),
        unresolved = resolution.unresolved.len(),
        "resolved organizer contacts"
    );
    resolution
}

/// Oracle-backed mapping pass. `None` means the fallback should run.
async fn oracle_mappings<O: MatchOracle>(
    oracle: &O,
    names: &[String],
    directory: &[Contact],
) -> Option<Vec<(String, Option<String>)>> {
    let user = build_resolution_prompt(names, directory);
    let response = match oracle.complete(SYSTEM_RESOLVE, &user).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(%err, "oracle unavailable, using exact name matching");
            return None;
        }
    };

    let Some(mappings) = parse_name_map(&response) else {
        tracing::warn!(%response, "unparsable resolution response, using exact name matching");
        return None;
    };

    // Every requested name must appear; a partial map falls back too.
    let complete = names.iter().all(|name| {
        mappings
            .iter()
            .any(|(mapped, _)| mapped.eq_ignore_ascii_case(name))
    });
    if complete {
        Some(mappings)
    } else {
        tracing::warn!("resolution response missing names, using exact name matching");
        None
    }
}

fn exact_mappings(names: &[String], directory: &[Contact]) -> Vec<(String, Option<String>)> {
    names
        .iter()
        .map(|name| {
            let matched = directory
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
                .map(|c| c.name.clone());
            (name.clone(), matched)
        })
        .collect()
}

fn build_resolution_prompt(names: &[String], directory: &[Contact]) -> String {
    let name_list = names
        .iter()
        .map(|name| format!("- {name}"))
        .collect::<Vec<_>>()
        .join("\n");
    let directory_list = directory
        .iter()
        .map(|contact| format!("- {}", contact.name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Match each of these names (possibly abbreviated or misspelled) to the contact \
         directory below.\n\
         \n\
         Names to match:\n\
         {name_list}\n\
         \n\
         Contact directory:\n\
         {directory_list}\n\
         \n\
         Rules:\n\
         1. \"Nic L\" matches \"Nicolas Lavin\"; first name plus an initial matches the \
         full name when unambiguous.\n\
         2. Allow for minor misspellings.\n\
         3. If a name could match more than one directory entry, or matches none, map it \
         to null. Never guess.\n\
         \n\
         Respond with ONLY a JSON object mapping each input name to the exact directory \
         name, or null. Example: {{\"Nic L\": \"Nicolas Lavin\", \"Unknown Person\": null}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::oracle::testing::ScriptedOracle;

    fn directory() -> Vec<Contact> {
        vec![
            Contact {
                name: "Nicolas Lavin".to_string(),
                phone: "+15550001111".to_string(),
            },
            Contact {
                name: "Jennie Matz".to_string(),
                phone: "+15550002222".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_oracle_resolves_abbreviations() {
        let oracle = ScriptedOracle::new(vec![Ok(
            r#"{"Nic L": "Nicolas Lavin", "Mystery BL": null}"#.to_string(),
        )]);
        let names = vec!["Nic L".to_string(), "Mystery BL".to_string()];

        let resolution = resolve_organizers(&oracle, &names, &directory(), &[]).await;
        assert_eq!(resolution.resolved.len(), 1);
        assert_eq!(resolution.resolved[0].phone, "+15550001111");
        assert_eq!(resolution.unresolved, vec!["Mystery BL"]);
    }

    #[tokio::test]
    async fn test_oracle_failure_falls_back_to_exact() {
        let oracle = ScriptedOracle::new(vec![Err(EngineError::Oracle("down".into()))]);
        let names = vec!["jennie matz".to_string(), "Nic L".to_string()];

        let resolution = resolve_organizers(&oracle, &names, &directory(), &[]).await;
        // Exact matching finds the clean name but not the abbreviation.
        assert_eq!(resolution.resolved.len(), 1);
        assert_eq!(resolution.resolved[0].name, "Jennie Matz");
        assert_eq!(resolution.unresolved, vec!["Nic L"]);
    }

    #[tokio::test]
    async fn test_malformed_response_falls_back_to_exact() {
        let oracle = ScriptedOracle::new(vec![Ok("Nic L is probably Nicolas".to_string())]);
        let names = vec!["Jennie Matz".to_string()];

        let resolution = resolve_organizers(&oracle, &names, &directory(), &[]).await;
        assert_eq!(resolution.resolved.len(), 1);
        assert!(resolution.unresolved.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_map_falls_back_to_exact() {
        // Response only covers one of two names.
        let oracle =
            ScriptedOracle::new(vec![Ok(r#"{"Nic L": "Nicolas Lavin"}"#.to_string())]);
        let names = vec!["Nic L".to_string(), "Jennie Matz".to_string()];

        let resolution = resolve_organizers(&oracle, &names, &directory(), &[]).await;
        // Fallback: exact matching resolves "Jennie Matz" only.
        assert_eq!(resolution.resolved.len(), 1);
        assert_eq!(resolution.resolved[0].name, "Jennie Matz");
        assert_eq!(resolution.unresolved, vec!["Nic L"]);
    }

    #[tokio::test]
    async fn test_allow_list_filters_after_resolution() {
        let oracle = ScriptedOracle::new(vec![Ok(
            r#"{"Nic L": "Nicolas Lavin", "Jennie Matz": "Jennie Matz"}"#.to_string(),
        )]);
        let names = vec!["Nic L".to_string(), "Jennie Matz".to_string()];
        let allow = vec!["jennie matz".to_string()];

        let resolution = resolve_organizers(&oracle, &names, &directory(), &allow).await;
        assert_eq!(resolution.resolved.len(), 1);
        assert_eq!(resolution.resolved[0].name, "Jennie Matz");
        // Dropped by allow-list, not unresolved.
        assert!(resolution.unresolved.is_empty());
    }

    #[tokio::test]
    async fn test_empty_names_short_circuits() {
        let oracle = ScriptedOracle::unavailable();
        let resolution = resolve_organizers(&oracle, &[], &directory(), &[]).await;
        assert!(resolution.resolved.is_empty());
        assert!(resolution.unresolved.is_empty());
        assert_eq!(oracle.call_count(), 0);
    }
}
