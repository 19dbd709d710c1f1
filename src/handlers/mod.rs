//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `incoming` - Answer-call webhook
//! - `media_stream` - Per-call media-stream WebSocket

pub mod api;
pub mod incoming;
pub mod media_stream;

pub use incoming::answer_call;
pub use media_stream::media_stream_handler;
