//! Application configuration parsed from environment variables.

use std::path::PathBuf;

use canvas::consts::DEFAULT_EMOJI_SIZE;

pub const DEFAULT_DATA_DIR: &str = "emojiart-data";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_FETCH_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// Limits applied to every background fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub request_secs: u64,
    pub connect_secs: u64,
    pub max_bytes: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            request_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            connect_secs: DEFAULT_FETCH_CONNECT_TIMEOUT_SECS,
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub fetch: FetchLimits,
    pub default_emoji_size: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            fetch: FetchLimits::default(),
            default_emoji_size: DEFAULT_EMOJI_SIZE,
        }
    }
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `EMOJIART_DATA_DIR`: key-value store directory (default `emojiart-data`)
    /// - `EMOJIART_FETCH_TIMEOUT_SECS`: default 30
    /// - `EMOJIART_FETCH_CONNECT_TIMEOUT_SECS`: default 10
    /// - `EMOJIART_MAX_IMAGE_BYTES`: default 32 MiB
    /// - `EMOJIART_DEFAULT_EMOJI_SIZE`: default 40, values below 1 are rejected
    ///
    /// Unparseable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Parse` if the data dir is set but blank or the default emoji
    /// size is not positive.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = match std::env::var("EMOJIART_DATA_DIR") {
            Ok(raw) if raw.trim().is_empty() => {
                return Err(ConfigError::Parse("EMOJIART_DATA_DIR is empty".into()));
            }
            Ok(raw) => PathBuf::from(raw.trim()),
            Err(_) => PathBuf::from(DEFAULT_DATA_DIR),
        };

        let fetch = FetchLimits {
            request_secs: env_parse("EMOJIART_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS),
            connect_secs: env_parse("EMOJIART_FETCH_CONNECT_TIMEOUT_SECS", DEFAULT_FETCH_CONNECT_TIMEOUT_SECS),
            max_bytes: env_parse("EMOJIART_MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES),
        };

        let default_emoji_size = env_parse("EMOJIART_DEFAULT_EMOJI_SIZE", DEFAULT_EMOJI_SIZE);
        if default_emoji_size < 1 {
            return Err(ConfigError::Parse(format!(
                "EMOJIART_DEFAULT_EMOJI_SIZE must be positive, got {default_emoji_size}"
            )));
        }

        Ok(Self { data_dir, fetch, default_emoji_size })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
