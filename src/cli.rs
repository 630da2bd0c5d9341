//! Command-line interface parsing for assetcache
//!
//! This module handles parsing of CLI arguments using clap and turns them,
//! together with an optional JSON config file, into the settings the binary
//! starts with.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::{default_cache_dir, CacheSource, EntryStatus, SweepReport};
use crate::config::{accept_success_status, CacheConfig, ConfigError};
use crate::origin::FetchError;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The config file or a flag value was invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No cache directory was given and none could be derived from $HOME
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDir,

    /// The origin could not be reached and no cached copy was available
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Writing the response body failed
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// `warm` finished with some assets still unfetched
    #[error("{0} asset(s) could not be fetched")]
    IncompleteWarm(usize),
}

/// assetcache - cache large static assets locally with stale fallback
#[derive(Parser, Debug)]
#[command(name = "assetcache")]
#[command(about = "Cache whitelisted static assets with a TTL and stale fallback")]
#[command(version)]
pub struct Cli {
    /// Directory holding cached entries (defaults to the XDG cache directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// JSON config file with whitelist, ttl_days, fetch_timeout_secs, require_success
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Days a fetched asset stays fresh
    #[arg(long, global = true, value_name = "DAYS", value_parser = clap::value_parser!(i64).range(1..))]
    pub ttl_days: Option<i64>,

    /// Seconds allowed for one origin fetch
    #[arg(long, global = true, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Only cache 2xx responses
    #[arg(long, global = true)]
    pub require_success: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Delete expired entries and exit
    Activate,
    /// Serve a URL through the cache
    ///
    /// Examples:
    ///   assetcache get https://cdn.example.com/game.wasm -o game.wasm
    ///   assetcache get https://cdn.example.com/game.data > game.data
    Get {
        /// URL to fetch; non-whitelisted URLs are fetched without caching
        url: String,
        /// Write the body here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Fetch every whitelisted URL that is missing or stale
    Warm,
    /// Show the freshness of every whitelisted URL
    Status,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub cache: CacheConfig,
    pub cache_dir: PathBuf,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// The config file is applied first, then individual flags override it.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut cache = match &cli.config {
            Some(path) => CacheConfig::from_file(path)?,
            None => CacheConfig::default(),
        };

        if let Some(days) = cli.ttl_days {
            cache.set_ttl_days(days)?;
        }
        if let Some(secs) = cli.timeout_secs {
            cache.set_fetch_timeout_secs(secs)?;
        }
        if cli.require_success {
            cache.is_successful = accept_success_status();
        }

        let cache_dir = match &cli.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir().ok_or(CliError::NoCacheDir)?,
        };

        Ok(StartupConfig { cache, cache_dir })
    }
}

/// One-line summary of a sweep
pub fn format_sweep(report: &SweepReport) -> String {
    format!(
        "scanned {} entries, removed {}, purged {} incomplete, {} deletions failed",
        report.scanned, report.removed, report.purged, report.failed
    )
}

pub fn describe_source(source: CacheSource) -> &'static str {
    match source {
        CacheSource::Fresh => "cache hit",
        CacheSource::Network => "fetched",
        CacheSource::Stale => "stale (origin unavailable)",
        CacheSource::Uncached => "fetched, not cached",
    }
}

/// Human-readable age such as `3d 4h` or `12m`
pub fn format_age(age: chrono::Duration) -> String {
    let minutes = age.num_minutes().max(0);
    let (days, hours, minutes) = (minutes / (24 * 60), (minutes / 60) % 24, minutes % 60);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// One line per whitelisted identifier for the `status` command
pub fn format_status(statuses: &[EntryStatus], now: DateTime<Utc>) -> Vec<String> {
    statuses
        .iter()
        .map(|status| {
            let state = match (status.is_cached(), status.expired) {
                (false, _) => "missing".to_string(),
                (true, false) => "fresh".to_string(),
                (true, true) => "stale".to_string(),
            };
            let age = status
                .age(now)
                .map(format_age)
                .unwrap_or_else(|| "-".to_string());
            let size = status
                .size
                .map(|size| format!("{} B", size))
                .unwrap_or_else(|| "-".to_string());
            format!("{:<8} {:>8} {:>12}  {}", state, age, size, status.identifier)
        })
        .collect()
}
