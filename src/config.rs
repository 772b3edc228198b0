//! Configuration Module
//!
//! Handles loading and managing sidecar configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default cache TTL: 24 hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Offline core configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory backing the file storage substrate
    pub data_dir: PathBuf,
    /// HTTP server port (localhost sidecar)
    pub server_port: u16,
    /// Age in seconds after which a cached entry reads as absent
    pub cache_ttl: u64,
    /// Retries after the first attempt in `retry_with_backoff`
    pub retry_max: u32,
    /// Base backoff delay in milliseconds (doubles per retry)
    pub retry_base_ms: u64,
    /// Failed executions before a pending action is dead-lettered
    pub action_max_attempts: u32,
    /// Per-action execution timeout in seconds
    pub action_timeout: u64,
    /// Expired-entry sweep interval in seconds, 0 disables the sweep
    pub cache_sweep_interval: u64,
    /// Helpline shown when every automated channel failed
    pub helpline_number: String,
    /// Initial connectivity assumption before the host reports
    pub start_online: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DATA_DIR` - Storage directory (default: ./offline-data)
    /// - `SERVER_PORT` - HTTP server port (default: 3030)
    /// - `CACHE_TTL_SECS` - Cache TTL in seconds (default: 86400)
    /// - `RETRY_MAX` - Retries after the first attempt (default: 3)
    /// - `RETRY_BASE_MS` - Base backoff delay (default: 1000)
    /// - `ACTION_MAX_ATTEMPTS` - Attempts before dead-lettering (default: 5)
    /// - `ACTION_TIMEOUT_SECS` - Per-action timeout (default: 30)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep interval, 0 = off (default: 0)
    /// - `HELPLINE_NUMBER` - Phone fallback number (default: 1800-XXX-XXXX)
    /// - `START_ONLINE` - Initial connectivity (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cache_ttl: parse_var("CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
            retry_max: parse_var("RETRY_MAX").unwrap_or(defaults.retry_max),
            retry_base_ms: parse_var("RETRY_BASE_MS").unwrap_or(defaults.retry_base_ms),
            action_max_attempts: parse_var("ACTION_MAX_ATTEMPTS")
                .unwrap_or(defaults.action_max_attempts),
            action_timeout: parse_var("ACTION_TIMEOUT_SECS").unwrap_or(defaults.action_timeout),
            cache_sweep_interval: parse_var("CACHE_SWEEP_INTERVAL")
                .unwrap_or(defaults.cache_sweep_interval),
            helpline_number: env::var("HELPLINE_NUMBER").unwrap_or(defaults.helpline_number),
            start_online: parse_var("START_ONLINE").unwrap_or(defaults.start_online),
        }
    }

    pub fn cache_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }

    pub fn action_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.action_timeout)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./offline-data"),
            server_port: 3030,
            cache_ttl: DEFAULT_CACHE_TTL_SECS,
            retry_max: 3,
            retry_base_ms: 1000,
            action_max_attempts: 5,
            action_timeout: 30,
            cache_sweep_interval: 0,
            helpline_number: "1800-XXX-XXXX".to_string(),
            start_online: true,
        }
    }
}
