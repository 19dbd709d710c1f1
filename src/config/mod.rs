//! Configuration module for the call relay
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use waav_call_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable fallbacks
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::realtime::openai::{
    OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice, SessionDefaults,
};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 250;
pub const DEFAULT_SETUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STREAM_PATH: &str = "/media-stream";
pub const DEFAULT_FALLBACK_PHRASE: &str = "I say this after websocket connection ends";
pub const DEFAULT_INSTRUCTIONS: &str = "You are a friendly voice assistant answering a phone call. \
Keep replies short and conversational, speak naturally, and ask a clarifying question \
when the caller's request is unclear.";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Server configuration
///
/// Contains all configuration needed to run the relay:
/// - Listener settings (host, port)
/// - Remote model connection (credential, endpoint, model, voice, audio format)
/// - Relay timing (settle delay, setup timeout)
/// - Telephony-facing URLs and markup text
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Remote model
    pub openai_api_key: String,
    pub realtime_url: String,
    pub realtime_model: String,
    pub realtime_voice: OpenAIRealtimeVoice,
    pub audio_format: OpenAIRealtimeAudioFormat,
    pub temperature: f32,
    /// Instruction text sent to the model and seeded into every conversation log
    pub instructions: String,

    // Relay timing
    pub settle_delay_ms: u64,
    /// 0 disables the bound
    pub setup_timeout_secs: u64,

    // Telephony
    /// Public base URI the telephony platform connects back to
    pub ws_server_uri: String,
    /// Local route the media-stream listener is mounted on
    pub stream_path: String,
    pub fallback_phrase: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("openai_api_key", &"<redacted>")
            .field("realtime_url", &self.realtime_url)
            .field("realtime_model", &self.realtime_model)
            .field("realtime_voice", &self.realtime_voice)
            .field("audio_format", &self.audio_format)
            .field("temperature", &self.temperature)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("setup_timeout_secs", &self.setup_timeout_secs)
            .field("ws_server_uri", &self.ws_server_uri)
            .field("stream_path", &self.stream_path)
            .finish_non_exhaustive()
    }
}

/// Zeroize the API key when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.openai_api_key.zeroize();
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// `OPENAI_API_KEY` and `WS_SERVER_URI` are required; everything else has
    /// a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        merge::merge_config(None)
    }

    /// Load configuration from a YAML file, falling back to environment
    /// variables for anything the file leaves out.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;
        merge::merge_config(Some(yaml_config))
    }

    /// Socket address to bind, as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for the session configuration frame.
    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            voice: self.realtime_voice,
            audio_format: self.audio_format,
            instructions: self.instructions.clone(),
            temperature: self.temperature,
        }
    }
}
