//! The main workflow: find upcoming runs, correlate them across sources,
//! and message signed-up attendees (and, optionally, nudge organizers).
//!
//! One invocation processes one reference-time snapshot sequentially.
//! Failures on one run are logged and the loop moves on, and a flaky
//! RSVP or attendance source degrades to an empty collection; only
//! configuration problems and calendar discovery abort the whole
//! invocation.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Timelike};

use runclub_core::attendance::{parse_attendance_rows, AttendanceRecord};
use runclub_core::calendar::{
    build_identify_doc_prompt, build_parse_runs_prompt, parse_doc_id_response,
    parse_runs_response, upcoming_within,
};
use runclub_core::contact::{parse_directory, Contact};
use runclub_core::correlate::{
    correlate_attendance, match_event_to_run, match_run_to_event, AbbreviationTable,
    CORRELATION_WINDOW_HOURS,
};
use runclub_core::error::EngineError;
use runclub_core::gate::already_contacted;
use runclub_core::message::{format_attendee_message, format_organizer_message};
use runclub_core::nudge::{select_nudge_candidates, DEFAULT_MAX_CANDIDATES};
use runclub_core::oracle::MatchOracle;
use runclub_core::resolver::resolve_organizers;
use runclub_core::time::{parse_civil, EASTERN};
use runclub_core::{CivilTime, Run, RsvpEvent};

use crate::clients::google::GoogleClient;
use crate::clients::oracle::OracleClient;
use crate::clients::relay::RelayClient;
use crate::clients::rsvp::RsvpClient;
use crate::config::Config;

/// How far ahead a run counts as "coming up".
const RUN_WINDOW_HOURS: i64 = 10;

/// Nothing is sent outside these Eastern wall-clock hours.
const OPERATING_HOURS: std::ops::Range<u32> = 8..20;

/// Location shorthand the calendar authors use; fed to the oracle inside
/// the matching prompts.
const ABBREVIATIONS: &AbbreviationTable = &[
    ("SBK", "South Brooklyn"),
    ("PP", "Prospect Park"),
    ("LES", "Lower East Side"),
    ("GAP", "Grand Army Plaza"),
];

pub struct PingOptions {
    pub dry_run: bool,
    pub include_nudges: bool,
    /// Walk upcoming RSVP events and match each back to a calendar run,
    /// instead of walking calendar runs.
    pub rsvp_first: bool,
    /// `YYYY-MM-DD[,HH:MM]`, interpreted as Eastern.
    pub simulate_time: Option<String>,
}

pub async fn run(config: &Config, options: &PingOptions) -> Result<()> {
    let now = reference_time(options.simulate_time.as_deref())?;
    tracing::info!(%now, dry_run = options.dry_run, "starting ping");

    // The hours guard applies to simulated times too, so a rehearsal of
    // an off-hours invocation behaves like the real one would.
    if !within_operating_hours(now) {
        tracing::info!(hour = now.hour(), "outside operating hours, nothing to do");
        return Ok(());
    }

    let oracle = OracleClient::new(
        &config.oracle.base_url,
        &config.oracle.username,
        &config.oracle.password,
    );
    let google = GoogleClient::connect(
        &config.google.client_id,
        &config.google.client_secret,
        &config.google.refresh_token,
    )
    .await?;

    let runs = fetch_upcoming_runs(&google, &oracle, now).await?;
    if runs.is_empty() {
        tracing::info!("no runs in the next {RUN_WINDOW_HOURS} hours");
        return Ok(());
    }

    let directory_text = google
        .fetch_document_text(&config.phone_directory_doc_id)
        .await
        .context("Failed to fetch the contact directory")?;
    let contacts = parse_directory(&directory_text);

    let rsvp = RsvpClient::new(&config.rsvp.api_key);
    let events = or_empty(rsvp.list_events().await, "rsvp events");

    let attendance = if options.include_nudges {
        let sheet_id = config.attendance_sheet_id()?;
        let rows = or_empty(google.fetch_sheet_rows(sheet_id).await, "attendance sheet");
        parse_attendance_rows(&rows, now)
    } else {
        Vec::new()
    };

    let relay = RelayClient::new(
        &config.relay.account_sid,
        &config.relay.auth_token,
        &config.relay.phone_number,
    );

    if options.rsvp_first {
        for event in upcoming_events(&events, now, RUN_WINDOW_HOURS) {
            let Some(run) = match_event_to_run(
                &oracle,
                &event,
                runs.clone(),
                CORRELATION_WINDOW_HOURS,
                ABBREVIATIONS,
            )
            .await
            else {
                tracing::info!(event = %event.title, "no matching calendar run");
                continue;
            };
            tracing::info!(event = %event.title, run = %run.name, "matched calendar run");

            let outcome = process_pair(
                &run, &event, &attendance, &contacts, &oracle, &rsvp, &relay, config, options,
                now,
            )
            .await;
            if let Err(err) = outcome {
                tracing::error!(event = %event.title, %err, "event processing failed, continuing");
            }
        }
        return Ok(());
    }

    for run in &runs {
        let Some(event) = match_run_to_event(
            &oracle,
            run,
            events.clone(),
            CORRELATION_WINDOW_HOURS,
            ABBREVIATIONS,
        )
        .await
        else {
            tracing::info!(run = %run.name, "no matching RSVP event");
            continue;
        };
        tracing::info!(run = %run.name, event = %event.title, "matched RSVP event");

        let outcome = process_pair(
            run, &event, &attendance, &contacts, &oracle, &rsvp, &relay, config, options, now,
        )
        .await;
        if let Err(err) = outcome {
            tracing::error!(run = %run.name, %err, "run processing failed, continuing");
        }
    }

    Ok(())
}

/// Degrade a collaborator failure to an empty collection so one flaky
/// source cannot abort the whole invocation.
fn or_empty<T>(result: Result<Vec<T>>, source: &str) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(err) => {
            let err = EngineError::Collaborator(format!("{err:#}"));
            tracing::warn!(source, %err, "continuing without this source");
            Vec::new()
        }
    }
}

fn within_operating_hours(time: CivilTime) -> bool {
    OPERATING_HOURS.contains(&time.hour())
}

/// Events starting between `now` and `now + hours`, inclusive; the same
/// forward window the calendar side uses.
fn upcoming_events(events: &[RsvpEvent], now: CivilTime, hours: i64) -> Vec<RsvpEvent> {
    let cutoff = now + Duration::hours(hours);
    events
        .iter()
        .filter(|event| event.start_time >= now && event.start_time <= cutoff)
        .cloned()
        .collect()
}

/// Identify this month's calendar document and extract the runs starting
/// within the forward window.
async fn fetch_upcoming_runs(
    google: &GoogleClient,
    oracle: &OracleClient,
    now: CivilTime,
) -> Result<Vec<Run>> {
    let documents = google.list_documents().await?;
    if documents.is_empty() {
        bail!("No documents visible to the configured account");
    }

    let (system, user) = build_identify_doc_prompt(&documents, now);
    let response = oracle
        .complete(&system, &user)
        .await
        .context("Calendar identification failed")?;
    let Some(doc_id) = parse_doc_id_response(&response) else {
        bail!("No calendar document found for the current month");
    };
    tracing::info!(%doc_id, "identified calendar document");

    let calendar_text = google.fetch_document_text(&doc_id).await?;
    let (system, user) = build_parse_runs_prompt(&calendar_text, now);
    let response = oracle
        .complete(&system, &user)
        .await
        .context("Calendar parsing failed")?;
    let runs = parse_runs_response(&response);

    Ok(upcoming_within(runs, now, RUN_WINDOW_HOURS))
}

/// Process one correlated run/event pair, however the pair was found.
#[allow(clippy::too_many_arguments)]
async fn process_pair(
    run: &Run,
    event: &RsvpEvent,
    attendance: &[AttendanceRecord],
    contacts: &[Contact],
    oracle: &OracleClient,
    rsvp: &RsvpClient,
    relay: &RelayClient,
    config: &Config,
    options: &PingOptions,
    now: CivilTime,
) -> Result<()> {
    tracing::info!(run = %run.name, start = %run.start_time, "processing run");

    let attendees = rsvp.list_attendees(&event.id).await?;

    let resolution = resolve_organizers(
        oracle,
        &run.organizers,
        contacts,
        &config.allowed_organizers,
    )
    .await;
    for name in &resolution.unresolved {
        tracing::warn!(run = %run.name, %name, "organizer has no directory contact");
    }
    if resolution.resolved.is_empty() {
        tracing::info!(run = %run.name, "no reachable organizers, skipping messaging");
        return Ok(());
    }
    let organizer_phones: Vec<String> = resolution
        .resolved
        .iter()
        .map(|c| c.phone.clone())
        .collect();

    if options.include_nudges {
        let attendee_names: Vec<String> = attendees.iter().map(|a| a.name.clone()).collect();
        nudge_organizers(
            run,
            event,
            attendance,
            &attendee_names,
            &resolution.resolved,
            &resolution.unresolved,
            oracle,
            relay,
            config,
            options,
            now,
        )
        .await?;
    }

    let location = event.location.as_ref().and_then(|l| l.display());
    for attendee in &attendees {
        let Some(phone) = &attendee.phone else {
            tracing::debug!(name = %attendee.name, "attendee has no phone, skipping");
            continue;
        };
        if organizer_phones.contains(phone) {
            continue;
        }

        let history = match relay.message_history(phone).await {
            Ok(history) => history,
            Err(err) => {
                tracing::warn!(name = %attendee.name, %err, "history fetch failed, skipping to stay idempotent");
                continue;
            }
        };
        if already_contacted(&history, &run.name, run.start_time) {
            tracing::debug!(name = %attendee.name, "already contacted about this run");
            continue;
        }

        let message = format_attendee_message(
            std::slice::from_ref(&attendee.name),
            &run.name,
            run.start_time,
            location.as_deref(),
        );
        let mut recipients = organizer_phones.clone();
        recipients.push(phone.clone());

        if options.dry_run {
            tracing::info!(name = %attendee.name, %message, "dry run, would send attendee message");
        } else {
            relay.send_message(&recipients, &message).await?;
        }
    }

    Ok(())
}

/// Send the assignment nudge to the run's organizers, unless one of them
/// already received it.
#[allow(clippy::too_many_arguments)]
async fn nudge_organizers(
    run: &Run,
    event: &RsvpEvent,
    attendance: &[AttendanceRecord],
    rsvp_names: &[String],
    organizers: &[Contact],
    unresolved: &[String],
    oracle: &OracleClient,
    relay: &RelayClient,
    config: &Config,
    options: &PingOptions,
    now: CivilTime,
) -> Result<()> {
    for organizer in organizers {
        let history = relay.message_history(&organizer.phone).await?;
        if already_contacted(&history, &run.name, run.start_time) {
            tracing::info!(run = %run.name, "organizers already nudged for this run");
            return Ok(());
        }
    }

    let targets = vec![run.name.clone(), event.title.clone()];
    let cluster =
        correlate_attendance(oracle, &targets, chrono::Datelike::weekday(&run.start_time), attendance)
            .await;

    let mut exclude_names: Vec<String> = run.organizers.clone();
    exclude_names.extend(organizers.iter().map(|c| c.name.clone()));

    let candidates = select_nudge_candidates(
        &cluster,
        rsvp_names,
        &exclude_names,
        now,
        DEFAULT_MAX_CANDIDATES,
    );

    let organizer_names: Vec<String> = organizers.iter().map(|c| c.name.clone()).collect();
    let message = format_organizer_message(
        &run.name,
        run.start_time,
        &candidates,
        &organizer_names,
        unresolved,
        config.attendance_form_link.as_deref(),
    );
    let recipients: Vec<String> = organizers.iter().map(|c| c.phone.clone()).collect();

    if options.dry_run {
        tracing::info!(run = %run.name, %message, "dry run, would send organizer nudge");
    } else {
        relay.send_message(&recipients, &message).await?;
    }
    Ok(())
}

/// Now in Eastern, or the simulated time (`YYYY-MM-DD[,HH:MM]`).
fn reference_time(simulate: Option<&str>) -> Result<CivilTime> {
    match simulate {
        None => Ok(chrono::Utc::now().with_timezone(&EASTERN)),
        Some(raw) => {
            let normalized = raw.replace(',', "T");
            let time = parse_civil(&normalized)
                .with_context(|| format!("Invalid simulated time: {raw}"))?;
            tracing::info!(%time, "using simulated reference time");
            Ok(time)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_time_accepts_date_and_time() {
        let t = reference_time(Some("2024-12-02,19:30")).unwrap();
        assert_eq!(t.to_rfc3339(), "2024-12-02T19:30:00-05:00");

        let t = reference_time(Some("2024-12-02")).unwrap();
        assert_eq!(t.hour(), 0);
    }

    #[test]
    fn test_reference_time_rejects_garbage() {
        assert!(reference_time(Some("tomorrow-ish")).is_err());
    }

    #[test]
    fn test_operating_hours_apply_to_simulated_times() {
        let evening = reference_time(Some("2024-12-02,19:30")).unwrap();
        assert!(within_operating_hours(evening));

        let late = reference_time(Some("2024-12-02,21:00")).unwrap();
        assert!(!within_operating_hours(late));

        // A bare date parses to midnight, which is outside hours too.
        let midnight = reference_time(Some("2024-12-02")).unwrap();
        assert!(!within_operating_hours(midnight));
    }

    #[test]
    fn test_or_empty_swallows_collaborator_failures() {
        let ok: Vec<u32> = or_empty(Ok(vec![1, 2]), "events");
        assert_eq!(ok, vec![1, 2]);

        let degraded: Vec<u32> = or_empty(Err(anyhow::anyhow!("503 from upstream")), "events");
        assert!(degraded.is_empty());
    }

    #[test]
    fn test_upcoming_events_window_is_forward_looking() {
        let now = parse_civil("2024-12-02T12:00:00").unwrap();
        let mk = |id: &str, time: &str| RsvpEvent {
            id: id.to_string(),
            title: id.to_string(),
            start_time: parse_civil(time).unwrap(),
            location: None,
            description: None,
            accepted_count: 0,
        };
        let events = vec![
            mk("past", "2024-12-02T11:00:00"),
            mk("soon", "2024-12-02T19:00:00"),
            mk("cutoff", "2024-12-02T22:00:00"),
            mk("beyond", "2024-12-02T22:00:01"),
        ];
        let upcoming = upcoming_events(&events, now, 10);
        let ids: Vec<_> = upcoming.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["soon", "cutoff"]);
    }
}
