//! Environment configuration helpers

use std::str::FromStr;

use thiserror::Error;

/// Error raised when an environment variable holds an unusable value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value for {name}: {value:?} ({reason})")]
pub struct EnvError {
    /// Variable name
    pub name: String,
    /// Raw value found in the environment
    pub value: String,
    /// Why it was rejected
    pub reason: String,
}

/// Read a non-empty environment variable.
///
/// Unset and blank variables both read as `None`.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a boolean flag, falling back to `default` when unset.
///
/// Accepts `1/0`, `true/false`, `yes/no` and `on/off` in any case.
pub fn env_flag(name: &str, default: bool) -> Result<bool, EnvError> {
    let Some(raw) = env_var(name) else {
        return Ok(default);
    };

    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EnvError {
            name: name.to_string(),
            value: raw,
            reason: "expected a boolean".to_string(),
        }),
    }
}

/// Parse an environment variable into `T`, falling back to `default` when unset.
pub fn env_parse<T>(name: &str, default: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| EnvError {
            name: name.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_blank_is_none() {
        unsafe {
            std::env::set_var("SENTINEL_UTILS_TEST_BLANK", "   ");
        }
        assert_eq!(env_var("SENTINEL_UTILS_TEST_BLANK"), None);
        assert_eq!(env_var("SENTINEL_UTILS_TEST_NEVER_SET"), None);
    }

    #[test]
    fn test_env_flag() {
        unsafe {
            std::env::set_var("SENTINEL_UTILS_TEST_FLAG_ON", "Yes");
            std::env::set_var("SENTINEL_UTILS_TEST_FLAG_OFF", "0");
            std::env::set_var("SENTINEL_UTILS_TEST_FLAG_BAD", "maybe");
        }
        assert_eq!(env_flag("SENTINEL_UTILS_TEST_FLAG_ON", false), Ok(true));
        assert_eq!(env_flag("SENTINEL_UTILS_TEST_FLAG_OFF", true), Ok(false));
        assert_eq!(env_flag("SENTINEL_UTILS_TEST_FLAG_UNSET", true), Ok(true));

        let err = env_flag("SENTINEL_UTILS_TEST_FLAG_BAD", true).unwrap_err();
        assert_eq!(err.name, "SENTINEL_UTILS_TEST_FLAG_BAD");
        assert_eq!(err.value, "maybe");
    }

    #[test]
    fn test_env_parse() {
        unsafe {
            std::env::set_var("SENTINEL_UTILS_TEST_NUM", "42");
            std::env::set_var("SENTINEL_UTILS_TEST_NUM_BAD", "forty");
        }
        assert_eq!(env_parse::<u64>("SENTINEL_UTILS_TEST_NUM", 7), Ok(42));
        assert_eq!(env_parse::<u64>("SENTINEL_UTILS_TEST_NUM_UNSET", 7), Ok(7));
        assert!(env_parse::<u64>("SENTINEL_UTILS_TEST_NUM_BAD", 7).is_err());
    }
}
