use url::Url;

use super::ConfigError;
use crate::core::realtime::openai::TEMPERATURE_RANGE;

/// Check that `value` is an absolute `ws://` or `wss://` URL.
pub(super) fn validate_ws_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("'{value}' is not a valid URL: {e}"),
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(ConfigError::Invalid {
            key,
            reason: format!("expected ws or wss scheme, got '{other}'"),
        }),
    }
}

pub(super) fn validate_temperature(value: f32) -> Result<(), ConfigError> {
    if TEMPERATURE_RANGE.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key: "temperature",
            reason: format!(
                "{value} is outside {}..={}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            ),
        })
    }
}

pub(super) fn validate_stream_path(value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') || value.len() < 2 || value.ends_with('/') {
        return Err(ConfigError::Invalid {
            key: "stream_path",
            reason: format!("'{value}' must start with '/' and name a path"),
        });
    }
    if value.contains(['{', '}', '*', '?', '#']) {
        return Err(ConfigError::Invalid {
            key: "stream_path",
            reason: format!("'{value}' contains reserved characters"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ws_url() {
        assert!(validate_ws_url("url", "wss://api.openai.com/v1/realtime").is_ok());
        assert!(validate_ws_url("url", "ws://localhost:8080/stream").is_ok());
        assert!(validate_ws_url("url", "https://api.openai.com").is_err());
        assert!(validate_ws_url("url", "relay.example.com").is_err());
    }

    #[test]
    fn test_validate_temperature() {
        assert!(validate_temperature(0.6).is_ok());
        assert!(validate_temperature(0.8).is_ok());
        assert!(validate_temperature(1.2).is_ok());
        assert!(validate_temperature(0.5).is_err());
        assert!(validate_temperature(1.5).is_err());
    }

    #[test]
    fn test_validate_stream_path() {
        assert!(validate_stream_path("/media-stream").is_ok());
        assert!(validate_stream_path("/twilio/media").is_ok());
        assert!(validate_stream_path("media-stream").is_err());
        assert!(validate_stream_path("/").is_err());
        assert!(validate_stream_path("/media-stream/").is_err());
        assert!(validate_stream_path("/media/{id}").is_err());
    }
}
