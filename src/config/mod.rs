//! Configuration module for the VOX gateway.
//!
//! Configuration comes from environment variables, with a `.env` file loaded
//! at startup as a base layer (actual environment variables override `.env`
//! values, which override defaults).
//!
//! # Environment Variables
//! - `HOST` - bind address (default `0.0.0.0`)
//! - `PORT` - listen port (default `3000`)
//! - `GEMINI_API_KEY` - API key for the Gemini Live API (required for the bridge)
//! - `GEMINI_LIVE_URL` - override the Live API endpoint (tests only)
//! - `GEMINI_SETUP_TIMEOUT_SECS` - setup acknowledgement timeout (default `30`)
//! - `GEMINI_DEBUG` - set to `1` to also request TEXT modality from the model
//! - `CORS_ALLOWED_ORIGINS` - comma-separated list or `*` (default: same-origin only)

use thiserror::Error;
use zeroize::Zeroize;

/// Default setup acknowledgement timeout in seconds.
pub const DEFAULT_SETUP_TIMEOUT_SECS: u64 = 30;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Server configuration.
///
/// Contains everything needed to run the gateway: bind address, the Gemini
/// credential, and per-deployment bridge settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    /// Gemini API key. The bridge refuses sessions when unset; the key never
    /// leaves the server.
    pub gemini_api_key: Option<String>,

    /// Live API endpoint override. Unset in production; integration tests
    /// point this at a local mock server.
    pub gemini_live_url: Option<String>,

    /// How long to wait for the setup acknowledgement before giving up on a
    /// freshly opened upstream connection.
    pub gemini_setup_timeout_secs: u64,

    /// Request TEXT modality alongside AUDIO for every session.
    pub gemini_debug: bool,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

/// Zeroize the credential when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        if let Some(ref mut key) = self.gemini_api_key {
            key.zeroize();
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            gemini_api_key: None,
            gemini_live_url: None,
            gemini_setup_timeout_secs: DEFAULT_SETUP_TIMEOUT_SECS,
            gemini_debug: false,
            cors_allowed_origins: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// The `.env` file is loaded in `main` before this runs, so its values
    /// appear here as ordinary environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = env_var("HOST").unwrap_or_else(|| defaults.host.clone());
        let port = match env_var("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT".to_string(),
                value,
            })?,
            None => defaults.port,
        };

        let gemini_setup_timeout_secs = match env_var("GEMINI_SETUP_TIMEOUT_SECS") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "GEMINI_SETUP_TIMEOUT_SECS".to_string(),
                value,
            })?,
            None => defaults.gemini_setup_timeout_secs,
        };

        Ok(Self {
            host,
            port,
            gemini_api_key: env_var("GEMINI_API_KEY"),
            gemini_live_url: env_var("GEMINI_LIVE_URL"),
            gemini_setup_timeout_secs,
            gemini_debug: env_var("GEMINI_DEBUG")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS"),
        })
    }

    /// Get the server address as a string in "host:port" form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the Gemini bridge can serve sessions.
    pub fn has_gemini_credential(&self) -> bool {
        self.gemini_api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
    }

    /// Redacted form of the API key for startup logging.
    ///
    /// Shows the first eight and last four characters; short keys are fully
    /// masked.
    pub fn redacted_gemini_key(&self) -> String {
        match self.gemini_api_key.as_deref() {
            // get() keeps this safe for keys with multi-byte characters at
            // the slice boundaries
            Some(key) if key.len() > 12 => {
                match (key.get(..8), key.get(key.len() - 4..)) {
                    (Some(head), Some(tail)) => format!("{head}...{tail}"),
                    _ => "****".to_string(),
                }
            }
            Some(_) => "****".to_string(),
            None => "(not set)".to_string(),
        }
    }
}

/// Read an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Parse a boolean flag the way shell-style env vars spell them.
fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "True" | "yes" | "YES")
}
