//! Source-neutral scheduling entities.
//!
//! These types represent the three scheduling data sources in a
//! source-agnostic way: calendar runs, RSVP-platform events, and the
//! people attached to them. Collaborator clients convert their API
//! responses into these types; the engine works exclusively with them.

use serde::{Deserialize, Serialize};

use crate::time::CivilTime;

/// A scheduled group activity instance parsed from the calendar source.
/// Immutable after creation.
#[derive(Debug, Clone)]
pub struct Run {
    pub name: String,
    pub start_time: CivilTime,
    /// Organizer display names as written in the calendar. May be empty.
    pub organizers: Vec<String>,
    /// The complete calendar text block for this run.
    pub raw_text: String,
}

/// An event fetched from the RSVP platform. Fetched fresh every
/// invocation, never persisted.
#[derive(Debug, Clone)]
pub struct RsvpEvent {
    pub id: String,
    pub title: String,
    pub start_time: CivilTime,
    pub location: Option<RsvpLocation>,
    pub description: Option<String>,
    pub accepted_count: u32,
}

/// Structured place attached to an RSVP event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RsvpLocation {
    pub venue: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
}

impl RsvpLocation {
    /// Non-empty parts joined with commas, or `None` when nothing is set.
    pub fn display(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.venue, &self.locality, &self.region]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// A person signed up for an RSVP event.
#[derive(Debug, Clone)]
pub struct RsvpAttendee {
    pub name: String,
    /// Primary phone in E.164 form when one was available and valid.
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Read-only view over one outbound message in the relay's history for a
/// recipient. Used only for pattern inspection.
#[derive(Debug, Clone)]
pub struct MessageHistoryEntry {
    pub body: String,
    pub created_at: CivilTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display_skips_empty_parts() {
        let loc = RsvpLocation {
            venue: Some("Grand Army Plaza".to_string()),
            locality: Some(String::new()),
            region: Some("NY".to_string()),
        };
        assert_eq!(loc.display().unwrap(), "Grand Army Plaza, NY");
        assert!(RsvpLocation::default().display().is_none());
    }
}
