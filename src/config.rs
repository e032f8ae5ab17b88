//! Process configuration.
//!
//! Built once at start-up from the environment and handed to the service
//! and router by value. Nothing in the crate reads the environment after
//! `AppConfig::from_env()` returns.

use std::fmt;
use std::net::SocketAddr;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Kenshin Reader";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_BIND_ADDR: &str = "KENSHIN_BIND_ADDR";
pub const ENV_MODEL: &str = "KENSHIN_GEMINI_MODEL";
pub const ENV_BASE_URL: &str = "KENSHIN_GEMINI_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "KENSHIN_GEMINI_TIMEOUT_SECS";
pub const ENV_TEMPERATURE: &str = "KENSHIN_GEMINI_TEMPERATURE";
pub const ENV_MAX_UPLOAD_BYTES: &str = "KENSHIN_MAX_UPLOAD_BYTES";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// 20 MiB covers a full-resolution phone photo plus multipart overhead.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "kenshin_reader=info,tower_http=info"
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingVar(&'static str),

    #[error("{var} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Connection settings for the Gemini provider.
#[derive(Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Outbound timeout. `None` leaves the request unbounded.
    pub timeout_secs: Option<u64>,
    /// Sampling temperature. `None` sends no generation config and leaves
    /// the model default in place.
    pub temperature: Option<f32>,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
    pub gemini: GeminiConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = read(ENV_API_KEY).ok_or(ConfigError::MissingVar(ENV_API_KEY))?;

        let bind_raw = read(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                var: ENV_BIND_ADDR,
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let max_upload_bytes = match read(ENV_MAX_UPLOAD_BYTES) {
            Some(raw) => parse_number::<usize>(ENV_MAX_UPLOAD_BYTES, &raw)?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let timeout_secs = match read(ENV_TIMEOUT_SECS) {
            Some(raw) => Some(parse_number::<u64>(ENV_TIMEOUT_SECS, &raw)?),
            None => None,
        };

        let temperature = match read(ENV_TEMPERATURE) {
            Some(raw) => Some(parse_temperature(&raw)?),
            None => None,
        };

        let base_url = read(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            bind_addr,
            max_upload_bytes,
            gemini: GeminiConfig {
                api_key,
                model: read(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: base_url.trim_end_matches('/').to_string(),
                timeout_secs,
                temperature,
            },
        })
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Gemini accepts temperatures in `0.0..=2.0`.
fn parse_temperature(raw: &str) -> Result<f32, ConfigError> {
    let value = parse_number::<f32>(ENV_TEMPERATURE, raw)?;
    if !(0.0..=2.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            var: ENV_TEMPERATURE,
            value: raw.to_string(),
            reason: "must be between 0.0 and 2.0".into(),
        });
    }
    Ok(value)
}
