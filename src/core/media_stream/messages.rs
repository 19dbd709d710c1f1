//! Telephony media-stream frame types.
//!
//! Every frame is a JSON text message tagged by its `event` field.
//!
//! Inbound (telephony platform to relay):
//! - connected - transport is up, no stream yet
//! - start - carries `start.streamSid`
//! - media - carries `media.payload`, base64 G.711 u-law at 8kHz
//! - stop / closed - the call is ending
//!
//! Outbound (relay to telephony platform):
//! - media - `{event, streamSid, media: {payload}}`

use serde::{Deserialize, Serialize};

// =============================================================================
// Inbound
// =============================================================================

/// Event received on the media-stream connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Transport handshake done
    Connected {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },

    /// Stream metadata, sent once before any media
    Start {
        start: StartMetadata,
        #[serde(rename = "sequenceNumber", default)]
        sequence_number: Option<String>,
    },

    /// One chunk of caller audio
    Media {
        media: InboundMedia,
        #[serde(rename = "sequenceNumber", default)]
        sequence_number: Option<String>,
    },

    /// Platform stopped the stream
    Stop,

    /// Platform closed the stream
    Closed,

    /// Any other event (mark, dtmf, ...)
    #[serde(other)]
    Unrecognized,
}

impl StreamEvent {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Metadata carried by the `start` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub media_format: Option<MediaFormat>,
}

/// Audio encoding announced in the `start` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub sample_rate: u32,
    #[serde(default)]
    pub channels: u16,
}

/// Caller audio carried by a `media` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMedia {
    /// Base64-encoded audio
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

// =============================================================================
// Outbound
// =============================================================================

/// Frame sent back on the media-stream connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundFrame {
    /// Model audio for playback on the call
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
}

/// Audio payload of an outbound `media` frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

impl OutboundFrame {
    /// Wrap a base64 audio chunk for the given stream.
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Media {
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: payload.into(),
            },
        }
    }
}
