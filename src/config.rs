//! Lifecycle configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;

use crate::error::SvcError;

/// Default number of entries held by the shared DNS cache.
pub const DEFAULT_CACHE_SIZE: usize = 5_000;

/// Default idle period before the instance asks to be stopped.
pub const DEFAULT_IDLE_TIMEOUT_MS: i64 = 120_000;

/// Default upstream resolver.
pub const DEFAULT_UPSTREAM: &str = "1.1.1.1:53";

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level service configuration.
///
/// Loaded once per process instance via [`SvcConfig::from_env`].
#[derive(Debug, Clone)]
pub struct SvcConfig {
    /// Capacity of the shared DNS cache. Zero is rejected at construction
    /// time by the cache itself, not here.
    pub cache_size: usize,

    /// Idle period armed after each serviced request, in milliseconds.
    /// Negative values are passed through and rejected by the idle timer.
    pub idle_timeout_ms: i64,

    /// Upstream resolver address handed to the resolver collaborator.
    pub upstream: SocketAddr,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for SvcConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            upstream: SocketAddr::from(([1, 1, 1, 1], 53)),
            log_format: LogFormat::Text,
        }
    }
}

impl SvcConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`SvcError::InvalidConfig`] if `UPSTREAM_RESOLVER` is set but
    /// cannot be parsed as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, SvcError> {
        dotenvy::dotenv().ok();

        let upstream: SocketAddr = std::env::var("UPSTREAM_RESOLVER")
            .unwrap_or_else(|_| DEFAULT_UPSTREAM.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| SvcError::InvalidConfig {
                key: "UPSTREAM_RESOLVER",
                reason: e.to_string(),
            })?;

        let log_format = match std::env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            cache_size: parse_env("CACHE_SIZE", DEFAULT_CACHE_SIZE),
            idle_timeout_ms: parse_env("IDLE_TIMEOUT_MS", DEFAULT_IDLE_TIMEOUT_MS),
            upstream,
            log_format,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
