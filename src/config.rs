//! Environment-driven configuration for the relay.

use std::env;
use std::sync::OnceLock;

use thiserror::Error;

const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 600;

/// Errors that can occur while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is present but cannot be parsed.
    #[error("Invalid value for {variable}: {message}")]
    InvalidValue {
        /// Name of the offending environment variable.
        variable: String,
        /// Parser error text.
        message: String,
    },
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the remote API. Optional at boot; a key can also be
    /// installed later through the configure endpoint.
    pub gemini_api_key: Option<String>,
    /// Base URL of the remote API, without the `/v1beta` suffix.
    pub api_base_url: String,
    /// Model identifier used for grounded generation.
    pub generation_model: String,
    /// Fixed listen port. When unset the server scans a local range.
    pub server_port: Option<u16>,
    /// Delay between processing-state polls for an uploaded file.
    pub file_poll_interval_ms: u64,
    /// Deadline for an uploaded file to leave the `PROCESSING` state.
    pub file_poll_timeout_secs: u64,
}

impl Config {
    /// Reads configuration from the process environment, applying defaults
    /// for everything that is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            gemini_api_key: optional_var("GEMINI_API_KEY"),
            api_base_url: optional_var("GEMINI_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            generation_model: optional_var("GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            server_port: parse_var("SERVER_PORT")?,
            file_poll_interval_ms: parse_var("FILE_POLL_INTERVAL_MS")?
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            file_poll_timeout_secs: parse_var("FILE_POLL_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_POLL_TIMEOUT_SECS),
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_var(name)
        .map(|raw| {
            raw.parse().map_err(|err: T::Err| ConfigError::InvalidValue {
                variable: name.to_string(),
                message: err.to_string(),
            })
        })
        .transpose()
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Loads a `.env` file when present and caches the parsed configuration for
/// the lifetime of the process.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Invalid configuration");
    if CONFIG.set(config).is_err() {
        tracing::debug!("Configuration already initialized; keeping the first value");
    }
}

/// Returns the global configuration.
///
/// Panics when called before [`init_config`].
pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}
