//! Cache configuration: whitelist, TTL, fetch timeout and the success predicate

use crate::cache::{FreshnessPolicy, Payload, DEFAULT_TTL_DAYS};
use crate::origin::DEFAULT_FETCH_TIMEOUT;
use chrono::Duration;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Assets intercepted when no whitelist is configured
pub const DEFAULT_WHITELIST: [&str; 2] = [
    "https://raw.githubusercontent.com/burtimax/telegram_games_unity_build/refs/heads/master/Build/telegram_games_unity_build.data.unityweb",
    "https://raw.githubusercontent.com/burtimax/telegram_games_unity_build/refs/heads/master/Build/telegram_games_unity_build.wasm.unityweb",
];

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The whitelist has no entries
    #[error("Whitelist must contain at least one URL")]
    EmptyWhitelist,

    /// The TTL is zero or negative
    #[error("TTL must be positive, got {0} days")]
    InvalidTtl(i64),

    /// A zero fetch timeout would fail every fetch
    #[error("Fetch timeout must be at least one second")]
    InvalidTimeout,
}

/// Decides whether an origin response may be cached as fresh
pub type SuccessPredicate = Arc<dyn Fn(&Payload) -> bool + Send + Sync>;

/// Accepts every response that arrived without a transport error
pub fn accept_any_response() -> SuccessPredicate {
    Arc::new(|_: &Payload| true)
}

/// Accepts only 2xx responses
pub fn accept_success_status() -> SuccessPredicate {
    Arc::new(Payload::is_success)
}

/// Settings consumed by [`crate::cache::CacheManager`]
#[derive(Clone)]
pub struct CacheConfig {
    /// Identifiers eligible for interception, in configured order
    pub whitelist: Vec<String>,
    /// How long a fetched entry stays fresh
    pub ttl: Duration,
    /// Upper bound on a single origin fetch
    pub fetch_timeout: std::time::Duration,
    /// Gate on the cache-write path
    pub is_successful: SuccessPredicate,
}

impl CacheConfig {
    pub fn freshness_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy::new(self.ttl)
    }

    /// Loads a JSON config file, falling back to defaults for missing fields
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&raw)?;
        let mut config = Self::default();
        file.apply(&mut config)?;
        Ok(config)
    }

    /// Sets the TTL in whole days
    pub fn set_ttl_days(&mut self, days: i64) -> Result<(), ConfigError> {
        if days <= 0 {
            return Err(ConfigError::InvalidTtl(days));
        }
        self.ttl = Duration::days(days);
        Ok(())
    }

    /// Sets the origin fetch timeout in whole seconds
    pub fn set_fetch_timeout_secs(&mut self, secs: u64) -> Result<(), ConfigError> {
        if secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        self.fetch_timeout = std::time::Duration::from_secs(secs);
        Ok(())
    }

    /// Replaces the whitelist
    pub fn set_whitelist(&mut self, whitelist: Vec<String>) -> Result<(), ConfigError> {
        if whitelist.is_empty() {
            return Err(ConfigError::EmptyWhitelist);
        }
        self.whitelist = whitelist;
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            whitelist: DEFAULT_WHITELIST.iter().map(|url| url.to_string()).collect(),
            ttl: Duration::days(DEFAULT_TTL_DAYS),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            is_successful: accept_any_response(),
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("whitelist", &self.whitelist)
            .field("ttl", &self.ttl)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

/// On-disk config format
///
/// ```json
/// {
///   "whitelist": ["https://cdn.example.com/game.wasm"],
///   "ttl_days": 14,
///   "fetch_timeout_secs": 60,
///   "require_success": false
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    whitelist: Option<Vec<String>>,
    ttl_days: Option<i64>,
    fetch_timeout_secs: Option<u64>,
    require_success: Option<bool>,
}

impl ConfigFile {
    fn apply(self, config: &mut CacheConfig) -> Result<(), ConfigError> {
        if let Some(whitelist) = self.whitelist {
            config.set_whitelist(whitelist)?;
        }
        if let Some(days) = self.ttl_days {
            config.set_ttl_days(days)?;
        }
        if let Some(secs) = self.fetch_timeout_secs {
            config.set_fetch_timeout_secs(secs)?;
        }
        if self.require_success == Some(true) {
            config.is_successful = accept_success_status();
        }
        Ok(())
    }
}
