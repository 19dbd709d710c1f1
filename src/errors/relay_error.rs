//! Errors raised while binding or running a call relay.
//!
//! None of these are fatal to the process: each is scoped to the one
//! media-stream connection it occurred on.

use thiserror::Error;

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Relay-level failures.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The stream request path carries no call identifier
    #[error("No call identifier in stream path '{0}'")]
    MissingCallId(String),

    /// A stream arrived for a call the webhook never answered
    #[error("No session recorded for call {0}")]
    UnknownCall(String),

    /// An inbound frame was not valid JSON or missed required fields
    #[error("Malformed stream frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    /// A second stream arrived for a call that already has one
    #[error("Call {0} already has a media stream")]
    StreamAlreadyBound(String),

    /// The inbound connection is closed or closing
    #[error("Inbound stream closed")]
    StreamClosed,

    /// The inbound writer is behind; the frame was not queued
    #[error("Inbound stream queue full")]
    StreamFull,
}

impl RelayError {
    /// Whether the error rejects the connection before any relaying starts.
    pub fn is_correlation_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingCallId(_) | Self::UnknownCall(_) | Self::StreamAlreadyBound(_)
        )
    }
}
