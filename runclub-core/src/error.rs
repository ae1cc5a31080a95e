//! Error types for the run-club engine.
//!
//! "No match" and "nothing in the window" are normal outcomes and are
//! expressed as `None` or empty collections, never as errors. The variants
//! here cover genuine failures only.

use thiserror::Error;

/// Errors that can occur in engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed date, name, or row in source data. Callers skip the
    /// offending record and continue.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The semantic oracle could not be reached or failed at the transport
    /// level. A malformed oracle *response* is not this error; it is
    /// treated as a failed match.
    #[error("Oracle unavailable: {0}")]
    Oracle(String),

    /// A document/sheet/RSVP/relay call failed. Caught per source and
    /// degraded to an empty collection rather than aborting.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Required credential or id missing. Fatal before processing starts.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
