//! Telephony media-stream protocol.
//!
//! The telephony platform opens one WebSocket per call, at the URL handed out
//! by the answer-call webhook. The call id is the last path segment.

mod handle;
pub mod markup;
pub mod messages;

pub use handle::{
    InboundSignal, STREAM_CHANNEL_CAPACITY, StreamHandle, StreamOutlet, StreamRoute, stream_channel,
};
pub use messages::{InboundMedia, OutboundFrame, StartMetadata, StreamEvent};

/// Extract the call id from a stream request path.
///
/// The id is the last non-empty path segment; any query string is ignored.
/// Returns `None` when the path has no segments at all.
pub fn call_id_from_path(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/').find(|segment| !segment.is_empty())
}
