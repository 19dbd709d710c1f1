//! OpenAI Realtime API module.
//!
//! Speech-to-speech over a single WebSocket. The relay uses it in pass-through
//! mode: caller audio is appended to the input buffer as-is, model audio comes
//! back as `response.audio.delta` frames in the same telephony encoding.
//!
//! # Supported Voices
//!
//! alloy, ash, ballad, coral, echo, sage, shimmer, verse
//!
//! # Audio Format
//!
//! G.711 u-law at 8kHz by default; a-law and PCM 16-bit at 24kHz are also
//! accepted by the API.

mod client;
mod config;
pub mod messages;

pub use client::{OpenAIRealtimeConnector, build_connect_request, build_connect_url};
pub use config::{
    DEFAULT_REALTIME_MODEL, DEFAULT_TEMPERATURE, OPENAI_BETA_HEADER, OPENAI_REALTIME_URL,
    OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice, SessionDefaults, TEMPERATURE_RANGE,
};
pub use messages::{ApiError, ClientEvent, ServerEvent, Session, SessionConfig, TurnDetection};
