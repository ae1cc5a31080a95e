//! HTTP collaborator clients.
//!
//! Each client owns a `reqwest::Client` plus its credentials and exposes
//! the handful of blocking-from-the-workflow's-point-of-view calls the
//! engine needs. Clients convert API payloads into `runclub_core` types
//! at the boundary; nothing past this module sees raw JSON.

pub mod google;
pub mod oracle;
pub mod relay;
pub mod rsvp;
