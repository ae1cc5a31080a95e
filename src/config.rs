//! Environment-based configuration.
//!
//! All credentials and document ids come from the environment. Loading
//! happens once, before any processing; a missing required variable
//! aborts the invocation immediately so a half-configured run never
//! sends anything.

use anyhow::Result;

use runclub_core::error::EngineError;

#[derive(Debug, Clone)]
pub struct Config {
    pub google: GoogleConfig,
    pub oracle: OracleConfig,
    pub rsvp: RsvpConfig,
    pub relay: RelayConfig,

    /// Document holding "Name: phone" contact lines.
    pub phone_directory_doc_id: String,
    /// Sheet of attendance form responses. Only needed for nudges.
    pub attendance_sheet_id: Option<String>,
    /// Organizer allow-list; empty means everyone resolved is allowed.
    pub allowed_organizers: Vec<String>,
    /// Link appended to organizer nudges for logging attendance.
    pub attendance_form_link: Option<String>,
}

/// OAuth credentials for the Google REST APIs (Drive, Docs, Sheets).
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RsvpConfig {
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Our own number, in E.164. Also the author identity on outbound
    /// conversation messages.
    pub phone_number: String,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        let config = Config {
            google: GoogleConfig {
                client_id: required("GOOGLE_CLIENT_ID")?,
                client_secret: required("GOOGLE_CLIENT_SECRET")?,
                refresh_token: required("GOOGLE_REFRESH_TOKEN")?,
            },
            oracle: OracleConfig {
                base_url: required("ORACLE_SERVER_URL")?
                    .trim_end_matches('/')
                    .to_string(),
                username: required("ORACLE_USERNAME")?,
                password: required("ORACLE_PASSWORD")?,
            },
            rsvp: RsvpConfig {
                api_key: required("ACTION_NETWORK_API_KEY")?,
            },
            relay: RelayConfig {
                account_sid: required("TWILIO_ACCOUNT_SID")?,
                auth_token: required("TWILIO_AUTH_TOKEN")?,
                phone_number: required("TWILIO_PHONE_NUMBER")?,
            },
            phone_directory_doc_id: required("PHONE_DIRECTORY_DOC_ID")?,
            attendance_sheet_id: optional("ATTENDANCE_SHEET_ID"),
            allowed_organizers: optional("ALLOWED_BLS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            attendance_form_link: optional("ATTENDANCE_FORM_LINK"),
        };
        Ok(config)
    }

    /// Nudge selection needs the attendance sheet.
    pub fn attendance_sheet_id(&self) -> Result<&str> {
        match &self.attendance_sheet_id {
            Some(id) => Ok(id),
            None => Err(EngineError::Config(
                "ATTENDANCE_SHEET_ID must be set when nudges are enabled".into(),
            )
            .into()),
        }
    }
}

fn required(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err(EngineError::Config(format!(
            "Environment variable {name} is set but empty"
        ))
        .into()),
        Err(_) => Err(EngineError::Config(format!(
            "Missing required environment variable: {name}"
        ))
        .into()),
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
