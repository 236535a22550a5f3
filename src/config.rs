use std::{env, fmt::Display, str::FromStr};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_SCORE: u64 = 30;
pub const DEFAULT_COUNTER_PATH: &str = "/api/claps";
pub const DEFAULT_KEY_PREFIX: &str = "CLAP:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: Option<String>,
    pub max_score: u64,
    pub counter_path: String,
    pub key_prefix: String,
    pub hash_visitors: bool,
    pub reply_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            redis_url: None,
            max_score: DEFAULT_MAX_SCORE,
            counter_path: DEFAULT_COUNTER_PATH.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            hash_visitors: true,
            reply_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_score = try_load(&lookup, "CLAPS_MAX_SCORE", defaults.max_score)?;
        if max_score == 0 {
            return Err(invalid("CLAPS_MAX_SCORE", "0", "must be at least 1"));
        }

        let counter_path = try_load(&lookup, "CLAPS_PATH", defaults.counter_path)?;
        if !counter_path.starts_with('/') || counter_path == "/" {
            return Err(invalid(
                "CLAPS_PATH",
                &counter_path,
                "must start with '/' and not be the root",
            ));
        }

        Ok(Self {
            port: try_load(&lookup, "PORT", defaults.port)?,
            redis_url: optional(&lookup, "REDIS_URL"),
            max_score,
            counter_path,
            key_prefix: try_load(&lookup, "CLAPS_KEY_PREFIX", defaults.key_prefix)?,
            hash_visitors: try_load(&lookup, "CLAPS_HASH_VISITORS", defaults.hash_visitors)?,
            reply_url: optional(&lookup, "CLAPS_REPLY_URL"),
        })
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn try_load<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(lookup, key) {
        Some(value) => value
            .parse()
            .map_err(|err: T::Err| invalid(key, &value, err)),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
