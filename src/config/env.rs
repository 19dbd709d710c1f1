use std::env;
use std::fmt::Display;
use std::str::FromStr;

use super::ConfigError;

/// Read an environment variable, treating blank values as unset.
pub(super) fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read and parse an environment variable.
pub(super) fn env_parse<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    env_string(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: format!("'{raw}': {e}"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_string_blank_is_unset() {
        unsafe {
            env::set_var("RELAY_TEST_BLANK", "   ");
        }
        assert_eq!(env_string("RELAY_TEST_BLANK"), None);
        unsafe {
            env::remove_var("RELAY_TEST_BLANK");
        }
    }

    #[test]
    #[serial]
    fn test_env_parse() {
        unsafe {
            env::set_var("RELAY_TEST_NUMBER", " 42 ");
            env::set_var("RELAY_TEST_BAD_NUMBER", "forty");
        }
        assert_eq!(env_parse::<u64>("RELAY_TEST_NUMBER").unwrap(), Some(42));
        assert!(matches!(
            env_parse::<u64>("RELAY_TEST_BAD_NUMBER"),
            Err(ConfigError::Invalid { key: "RELAY_TEST_BAD_NUMBER", .. })
        ));
        assert_eq!(env_parse::<u64>("RELAY_TEST_UNSET_NUMBER").unwrap(), None);
        unsafe {
            env::remove_var("RELAY_TEST_NUMBER");
            env::remove_var("RELAY_TEST_BAD_NUMBER");
        }
    }
}
