//! Contact directory parsing.
//!
//! The directory is a free-text document with one "Name: phone" line per
//! person. It is the authoritative identity space for organizers and
//! message recipients.

use std::sync::LazyLock;

use regex::Regex;

use crate::phone::normalize_phone;

/// A canonical directory entry. `phone` is always E.164.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub name: String,
    pub phone: String,
}

static LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:–—-]+?)\s*[:–—-]\s*(.+)$").unwrap());

/// Parse directory text into contacts.
///
/// Tolerates extra whitespace, `:` or dash separators, and varied phone
/// formats. Header lines, dividers, and lines without a normalizable
/// phone number are skipped (the skip is logged, not an error).
pub fn parse_directory(text: &str) -> Vec<Contact> {
    let mut contacts = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("---") {
            continue;
        }
        let lowered = line.to_lowercase();
        if matches!(lowered.as_str(), "phone directory" | "contacts" | "numbers") {
            continue;
        }

        let Some(captures) = LINE_RE.captures(line) else {
            tracing::debug!(line, "skipping unparsable directory line");
            continue;
        };

        let name = captures[1].trim().to_string();
        let phone_part = captures[2].trim();

        if name.len() < 2 || !phone_part.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }

        match normalize_phone(phone_part) {
            Ok(phone) => contacts.push(Contact { name, phone }),
            Err(err) => {
                tracing::warn!(%name, phone = phone_part, %err, "dropping contact with bad phone");
            }
        }
    }

    tracing::info!(count = contacts.len(), "parsed contact directory");
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_basic_lines() {
        let text = "Phone Directory\n\nRyan Beauchamp: 555-123-4567\nJennie Matz - (555) 987 6543\n";
        let contacts = parse_directory(text);
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].name, "Ryan Beauchamp");
        assert_eq!(contacts[0].phone, "+15551234567");
        assert_eq!(contacts[1].phone, "+15559876543");
    }

    #[test]
    fn test_skips_headers_dividers_and_bad_phones() {
        let text = "# Contacts\n---\nKarl Steel: 123\nNo Separator Line\nA: 5550001111\n";
        let contacts = parse_directory(text);
        // "Karl Steel" has a 3-digit phone; "A" is too short a name.
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_en_dash_separator() {
        let contacts = parse_directory("Nic Lavin – 555 000 2222");
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Nic Lavin");
    }
}
