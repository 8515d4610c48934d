//! Common error types for Roomtone

use thiserror::Error;

/// Common result type for Roomtone operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Roomtone core
///
/// The remote client never retries on its own; the enrichment pipeline owns
/// the only retry policy. Inventory decrements are not rolled back when a
/// subsequent remote write fails (best-effort placement semantics).
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP-level failure (wraps reqwest errors and non-2xx statuses)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Payload did not decode into the expected typed shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Payload decoded but violated the wire contract
    /// (non-integer upload response, missing "OK" sentinel)
    #[error("Unexpected response format: {0}")]
    ResponseFormat(String),

    /// Business-rule rejection: furniture quantity is already zero
    #[error("Insufficient inventory for furniture {furniture_id}")]
    InsufficientInventory { furniture_id: i64 },

    /// Soft failure: enrichment polling exhausted its attempt budget.
    /// The diary keeps its provisional fields and remains usable.
    #[error("Enrichment timed out for diary {diary_id} after {attempts} attempts")]
    EnrichmentTimeout { diary_id: i64, attempts: u32 },

    /// Audio device failed to start or stop recording
    #[error("Audio capture error: {0}")]
    Capture(String),

    /// Caller contract violation: redemption requested with no current diary
    #[error("No active diary: redemption requires a completed capture cycle")]
    NoActiveDiary,

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Coordinate values outside the accepted grid/orientation range
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
