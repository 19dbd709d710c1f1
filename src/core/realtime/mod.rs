//! Realtime speech-to-speech model connection.
//!
//! # Architecture
//!
//! - [`RealtimeConnector`] opens a connection and returns immediately
//! - [`RemoteHandle`] is the session-side half (state, send, close)
//! - [`RemoteEndpoint`] is the transport-side half (drains client events,
//!   reports [`RemoteEvent`]s)
//!
//! The OpenAI Realtime API is the only provider.

mod base;
pub mod openai;

pub use base::{
    ConnectionState, REMOTE_CHANNEL_CAPACITY, RealtimeConnector, RealtimeError, RealtimeResult,
    RemoteConnection, RemoteEndpoint, RemoteEvent, RemoteHandle, remote_pair,
};
pub use openai::{
    ClientEvent, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat, OpenAIRealtimeConnector,
    OpenAIRealtimeVoice, ServerEvent, SessionConfig,
};
