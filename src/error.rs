use crate::eventstream::DecodeError;
use crate::transport::TransportError;
use thiserror::Error;

/// Unified error type for the streaming core.
///
/// This aggregates the low-level failure modes into the categories callers
/// actually branch on: configuration problems fail before any I/O, transport
/// and decode problems terminate an in-flight stream, and remote errors carry
/// the service-reported detail. Normal end-of-stream is never an error and
/// has no variant here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Event-stream decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Remote service error ({event_type}): {message}")]
    Remote { event_type: String, message: String },

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Whether this error was produced before any network I/O took place.
    pub fn is_pre_flight(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::Serialization(_))
    }
}
