use std::path::Path;

use super::env::{env_parse, env_string};
use super::validation::{validate_stream_path, validate_temperature, validate_ws_url};
use super::yaml::YamlConfig;
use super::{
    ConfigError, DEFAULT_FALLBACK_PHRASE, DEFAULT_HOST, DEFAULT_INSTRUCTIONS, DEFAULT_PORT,
    DEFAULT_SETTLE_DELAY_MS, DEFAULT_SETUP_TIMEOUT_SECS, DEFAULT_STREAM_PATH, ServerConfig,
};
use crate::core::realtime::openai::{
    DEFAULT_REALTIME_MODEL, DEFAULT_TEMPERATURE, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeVoice,
};

/// Merge YAML values over environment values over defaults, then validate.
pub(super) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let realtime = yaml.realtime.unwrap_or_default();
    let relay = yaml.relay.unwrap_or_default();
    let telephony = yaml.telephony.unwrap_or_default();

    let host = server
        .host
        .or_else(|| env_string("HOST"))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match server.port {
        Some(port) => port,
        None => env_parse("PORT")?.unwrap_or(DEFAULT_PORT),
    };

    let openai_api_key = realtime
        .api_key
        .or_else(|| env_string("OPENAI_API_KEY"))
        .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

    let realtime_url = realtime
        .url
        .or_else(|| env_string("OPENAI_REALTIME_URL"))
        .unwrap_or_else(|| OPENAI_REALTIME_URL.to_string());
    validate_ws_url("OPENAI_REALTIME_URL", &realtime_url)?;

    let realtime_model = realtime
        .model
        .or_else(|| env_string("OPENAI_REALTIME_MODEL"))
        .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string());

    let realtime_voice = match realtime
        .voice
        .or_else(|| env_string("OPENAI_REALTIME_VOICE"))
    {
        Some(raw) => OpenAIRealtimeVoice::parse(&raw).ok_or_else(|| ConfigError::Invalid {
            key: "OPENAI_REALTIME_VOICE",
            reason: format!("unknown voice '{raw}'"),
        })?,
        None => OpenAIRealtimeVoice::default(),
    };

    let audio_format = match realtime
        .audio_format
        .or_else(|| env_string("OPENAI_REALTIME_AUDIO_FORMAT"))
    {
        Some(raw) => OpenAIRealtimeAudioFormat::parse(&raw).ok_or_else(|| ConfigError::Invalid {
            key: "OPENAI_REALTIME_AUDIO_FORMAT",
            reason: format!("unknown audio format '{raw}'"),
        })?,
        None => OpenAIRealtimeAudioFormat::default(),
    };

    let temperature = match realtime.temperature {
        Some(value) => value,
        None => env_parse("OPENAI_REALTIME_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE),
    };
    validate_temperature(temperature)?;

    let instructions = resolve_instructions(realtime.instructions, realtime.instructions_path)?;

    let settle_delay_ms = match relay.settle_delay_ms {
        Some(value) => value,
        None => env_parse("RELAY_SETTLE_DELAY_MS")?.unwrap_or(DEFAULT_SETTLE_DELAY_MS),
    };
    let setup_timeout_secs = match relay.setup_timeout_secs {
        Some(value) => value,
        None => env_parse("RELAY_SETUP_TIMEOUT_SECS")?.unwrap_or(DEFAULT_SETUP_TIMEOUT_SECS),
    };

    let ws_server_uri = telephony
        .ws_server_uri
        .or_else(|| env_string("WS_SERVER_URI"))
        .ok_or(ConfigError::Missing("WS_SERVER_URI"))?;
    validate_ws_url("WS_SERVER_URI", &ws_server_uri)?;

    let stream_path = telephony
        .stream_path
        .or_else(|| env_string("RELAY_STREAM_PATH"))
        .unwrap_or_else(|| DEFAULT_STREAM_PATH.to_string());
    validate_stream_path(&stream_path)?;

    let fallback_phrase = telephony
        .fallback_phrase
        .or_else(|| env_string("RELAY_FALLBACK_PHRASE"))
        .unwrap_or_else(|| DEFAULT_FALLBACK_PHRASE.to_string());

    Ok(ServerConfig {
        host,
        port,
        openai_api_key,
        realtime_url,
        realtime_model,
        realtime_voice,
        audio_format,
        temperature,
        instructions,
        settle_delay_ms,
        setup_timeout_secs,
        ws_server_uri,
        stream_path,
        fallback_phrase,
    })
}

/// Inline YAML, YAML file, inline env, env file, then the built-in prompt.
fn resolve_instructions(
    inline: Option<String>,
    path: Option<String>,
) -> Result<String, ConfigError> {
    if let Some(text) = inline.filter(|t| !t.trim().is_empty()) {
        return Ok(text);
    }
    if let Some(path) = path {
        return read_instructions(&path);
    }
    if let Some(text) = env_string("RELAY_INSTRUCTIONS") {
        return Ok(text);
    }
    if let Some(path) = env_string("RELAY_INSTRUCTIONS_PATH") {
        return read_instructions(&path);
    }
    Ok(DEFAULT_INSTRUCTIONS.to_string())
}

fn read_instructions(path: &str) -> Result<String, ConfigError> {
    let path = Path::new(path);
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ConfigError::Invalid {
            key: "instructions_path",
            reason: format!("{} is empty", path.display()),
        });
    }
    Ok(text.to_string())
}
