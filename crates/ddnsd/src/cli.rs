//! Command-line interface
//!
//! Every flag can also come from the environment; an explicit flag wins.

use std::path::PathBuf;

use clap::Parser;
use ddns_core::Schedule;
use ddns_core::config::DdnsConfig;
use tracing::Level;

/// ddnsd: keep alidns records pointed at this host's address
#[derive(Debug, Parser)]
#[command(name = "ddnsd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file [default: ./settings.json]
    #[arg(short = 'f', long = "file", env = "DDNS_CONFIG")]
    pub file: Option<PathBuf>,

    /// Seconds between passes; 0 runs a single pass and exits
    #[arg(short = 'i', long = "interval", env = "DDNS_INTERVAL", default_value_t = 0)]
    pub interval: u64,

    /// List records but only log the updates that would be sent
    #[arg(long)]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "DDNS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Daemon settings after merging flags and environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config_path: PathBuf,
    pub schedule: Schedule,
    pub dry_run: bool,
    pub log_level: Level,
}

impl Settings {
    /// Resolve settings from parsed flags
    ///
    /// `env` looks up variables that have no flag counterpart
    /// (`DDNS_MODE=dry-run`).
    pub fn resolve<F>(cli: Cli, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = parse_log_level(&cli.log_level)?;
        let config_path = match cli.file {
            Some(path) => path,
            None => DdnsConfig::default_path()?,
        };
        let dry_run = cli.dry_run
            || env("DDNS_MODE").is_some_and(|mode| mode.eq_ignore_ascii_case("dry-run"));

        Ok(Self {
            config_path,
            schedule: Schedule::from_interval_secs(cli.interval),
            dry_run,
            log_level,
        })
    }
}

fn parse_log_level(raw: &str) -> anyhow::Result<Level> {
    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "Log level '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}
