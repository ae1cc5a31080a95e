//! Action Network (OSDI) client for RSVP events and attendees.
//!
//! Events are paginated; three pages is plenty for a group this size and
//! keeps a runaway listing from stalling the invocation. Attendee
//! assembly follows attendance links to person records, deduplicating
//! person ids along the way.

use anyhow::{Context, Result};
use serde_json::Value;

use runclub_core::phone::normalize_phone;
use runclub_core::time::parse_civil;
use runclub_core::{RsvpAttendee, RsvpEvent, RsvpLocation};

const API_BASE: &str = "https://actionnetwork.org/api/v2";
const MAX_EVENT_PAGES: u32 = 3;

pub struct RsvpClient {
    http: reqwest::Client,
    api_key: String,
}

impl RsvpClient {
    pub fn new(api_key: &str) -> RsvpClient {
        RsvpClient {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
        }
    }

    async fn get(&self, url: &str) -> Result<Value> {
        self.http
            .get(url)
            .header("OSDI-API-Token", &self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to reach RSVP platform: {url}"))?
            .error_for_status()
            .with_context(|| format!("RSVP platform request failed: {url}"))?
            .json()
            .await
            .context("Failed to parse RSVP platform response")
    }

    /// List events across up to [`MAX_EVENT_PAGES`] pages. Events with a
    /// missing or unparsable start date are skipped and logged.
    pub async fn list_events(&self) -> Result<Vec<RsvpEvent>> {
        let mut events = Vec::new();

        for page in 1..=MAX_EVENT_PAGES {
            let body = self.get(&format!("{API_BASE}/events?page={page}")).await?;
            let page_events = embedded(&body, "osdi:events");
            if page_events.is_empty() {
                break;
            }
            for raw in &page_events {
                if let Some(event) = parse_event(raw) {
                    events.push(event);
                }
            }
        }

        tracing::info!(count = events.len(), "fetched RSVP events");
        Ok(events)
    }

    /// Fetch the attendee roster for one event, one person record per
    /// accepted attendance.
    pub async fn list_attendees(&self, event_id: &str) -> Result<Vec<RsvpAttendee>> {
        let body = self
            .get(&format!("{API_BASE}/events/{event_id}/attendances"))
            .await?;

        let mut person_urls: Vec<String> = Vec::new();
        for attendance in embedded(&body, "osdi:attendances") {
            if attendance.pointer("/status").and_then(Value::as_str) == Some("cancelled") {
                continue;
            }
            let Some(url) = attendance
                .pointer("/_links/osdi:person/href")
                .and_then(Value::as_str)
            else {
                continue;
            };
            if !person_urls.iter().any(|seen| seen == url) {
                person_urls.push(url.to_string());
            }
        }

        let mut attendees = Vec::new();
        for url in &person_urls {
            match self.get(url).await {
                Ok(person) => attendees.push(parse_person(&person)),
                Err(err) => {
                    tracing::warn!(%url, %err, "failed to fetch attendee record");
                }
            }
        }

        tracing::info!(event_id, count = attendees.len(), "fetched attendee roster");
        Ok(attendees)
    }
}

fn embedded(body: &Value, key: &str) -> Vec<Value> {
    body.pointer(&format!("/_embedded/{key}"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn parse_event(raw: &Value) -> Option<RsvpEvent> {
    let title = raw.get("title").and_then(Value::as_str)?.to_string();
    let start_raw = raw.get("start_date").and_then(Value::as_str)?;
    let start_time = match parse_civil(start_raw) {
        Ok(t) => t,
        Err(err) => {
            tracing::warn!(%title, start = start_raw, %err, "skipping event with bad start date");
            return None;
        }
    };

    // The event's own id is carried in its identifiers list as
    // "action_network:<uuid>".
    let id = raw
        .get("identifiers")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find_map(|ident| ident.strip_prefix("action_network:"))?
        .to_string();

    let location = raw.get("location").map(|loc| RsvpLocation {
        venue: loc.get("venue").and_then(Value::as_str).map(str::to_string),
        locality: loc
            .get("locality")
            .and_then(Value::as_str)
            .map(str::to_string),
        region: loc.get("region").and_then(Value::as_str).map(str::to_string),
    });

    Some(RsvpEvent {
        id,
        title,
        start_time,
        location,
        description: raw
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        accepted_count: raw
            .get("total_accepted")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
    })
}

fn parse_person(person: &Value) -> RsvpAttendee {
    let given = person.get("given_name").and_then(Value::as_str).unwrap_or("");
    let family = person
        .get("family_name")
        .and_then(Value::as_str)
        .unwrap_or("");
    let name = format!("{given} {family}").trim().to_string();

    let phone = person
        .get("phone_numbers")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|p| p.get("primary").and_then(Value::as_bool).unwrap_or(false))
        .chain(
            person
                .get("phone_numbers")
                .and_then(Value::as_array)
                .into_iter()
                .flatten(),
        )
        .filter_map(|p| p.get("number").and_then(Value::as_str))
        .find_map(|number| normalize_phone(number).ok());

    let email = person
        .get("email_addresses")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|e| e.get("address").and_then(Value::as_str))
        .next()
        .map(str::to_string);

    RsvpAttendee { name, phone, email }
}
