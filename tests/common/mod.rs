//! Shared helpers for integration tests.

#![allow(dead_code)]

use waav_call_relay::ServerConfig;
use waav_call_relay::core::realtime::{OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice};

/// Minimal configuration pointing the relay at `realtime_url`.
pub fn test_config(realtime_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        openai_api_key: "sk-test".to_string(),
        realtime_url: realtime_url.to_string(),
        realtime_model: "gpt-4o-realtime-preview-2024-10-01".to_string(),
        realtime_voice: OpenAIRealtimeVoice::Alloy,
        audio_format: OpenAIRealtimeAudioFormat::G711Ulaw,
        temperature: 0.8,
        instructions: "You are a test assistant.".to_string(),
        settle_delay_ms: 10,
        setup_timeout_secs: 5,
        ws_server_uri: "wss://relay.example.com/media-stream".to_string(),
        stream_path: "/media-stream".to_string(),
        fallback_phrase: "Goodbye".to_string(),
    }
}
