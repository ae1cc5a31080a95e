//! Core matching engine for the run-club nudge tooling.
//!
//! This crate holds everything that does not touch the network: entity
//! types for the three scheduling sources, name/phone normalization,
//! similarity scoring, time-window filtering, cross-source correlation,
//! contact resolution, nudge ranking, message templates, and the
//! duplicate-send gate. Collaborator clients live in the CLI crate and
//! feed these functions.

pub mod attendance;
pub mod calendar;
pub mod contact;
pub mod correlate;
pub mod error;
pub mod event;
pub mod gate;
pub mod message;
pub mod normalize;
pub mod nudge;
pub mod oracle;
pub mod phone;
pub mod resolver;
pub mod similarity;
pub mod time;
pub mod window;

// Re-export the entity types and error alias at crate root for convenience
pub use error::{EngineError, EngineResult};
pub use event::*;
pub use time::CivilTime;
