// # ddnsd - DDNS Daemon
//
// This daemon is a THIN integration layer:
// - Parse flags and environment
// - Load and validate the JSON configuration
// - Build the IP source, the alidns provider and the engine
// - Hand the engine to the scheduler and map the outcome to an exit code
//
// All reconciliation logic lives in ddns-core.
//
// ## Configuration
//
// ### Flags (environment fallback)
// - `-f, --file <PATH>` (`DDNS_CONFIG`): configuration file, default `settings.json`
// - `-i, --interval <SECS>` (`DDNS_INTERVAL`): seconds between passes, 0 = single pass
// - `--dry-run` (`DDNS_MODE=dry-run`): list records, log updates without sending them
// - `--log-level <LEVEL>` (`DDNS_LOG_LEVEL`): trace, debug, info, warn, error
//
// ### Configuration File
//
// ```json
// {
//   "AccessKeyId": "LTAI...",
//   "AccessKeySecret": "...",
//   "Domain": "example.com",
//   "SubDomains": [
//     { "Name": "home", "Interval": 600 },
//     { "Name": "nas", "Interval": 300 }
//   ],
//   "IpSource": { "Type": "http", "Url": "https://api.ipify.org" }
// }
// ```
//
// ## Example
//
// ```bash
// # One pass, then exit
// ddnsd -f /etc/ddns/settings.json
//
// # Reconcile every 5 minutes until SIGTERM
// ddnsd -f /etc/ddns/settings.json -i 300
// ```

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use ddns_core::config::{DdnsConfig, IpSourceConfig};
use ddns_core::{DdnsEngine, EngineEvent, IpSource, RunSummary, Schedule, Scheduler};
use ddns_ip_http::HttpIpSource;
use ddns_ip_local::LocalIpSource;
use ddns_provider_alidns::AlidnsProvider;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::cli::{Cli, Settings};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// A single-shot pass did not reconcile cleanly
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::resolve(cli, |key| std::env::var(key).ok()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");

    let config = match DdnsConfig::from_file(&settings.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    info!(
        "Configuration loaded from {}: {} subdomain(s) of {}",
        settings.config_path.display(),
        config.sub_domains.len(),
        config.domain
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(config, &settings).await {
            Ok(summary) => exit_code_for(settings.schedule, &summary),
            Err(e) => {
                error!("Startup failed: {:#}", e);
                DdnsExitCode::ConfigError
            }
        }
    });

    code.into()
}

/// Wire the components together and run the schedule to completion
async fn run_daemon(config: DdnsConfig, settings: &Settings) -> Result<RunSummary> {
    let ip_source = build_ip_source(&config.ip_source)?;
    info!(
        "IP source: {} ({})",
        ip_source.source_name(),
        ip_source.version().record_type()
    );

    let provider = AlidnsProvider::from_config(&config)
        .context("Failed to create alidns provider")?
        .with_dry_run(settings.dry_run);
    if provider.is_dry_run() {
        warn!("alidns provider running in DRY-RUN mode - no changes will be made");
    }

    let (engine, event_rx) = DdnsEngine::new(ip_source, Box::new(provider), &config)
        .context("Failed to create engine")?;
    tokio::spawn(log_events(event_rx));

    for sub_domain in &config.sub_domains {
        info!(
            "Managing record: {}.{} (ttl {})",
            sub_domain.name, config.domain, sub_domain.interval
        );
    }

    let scheduler = Scheduler::new(engine, settings.schedule);
    Ok(scheduler.run().await)
}

/// Build the configured IP source
fn build_ip_source(config: &IpSourceConfig) -> Result<Box<dyn IpSource>> {
    let source: Box<dyn IpSource> = match config {
        IpSourceConfig::Local { .. } => Box::new(LocalIpSource::from_config(config)?),
        IpSourceConfig::Http { .. } => Box::new(HttpIpSource::from_config(config)?),
    };
    Ok(source)
}

/// Drain engine events into the debug log
async fn log_events(mut event_rx: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = event_rx.recv().await {
        debug!("Engine event: {:?}", event);
    }
}

/// Exit code for a finished run
///
/// A periodic run only ends on a shutdown signal, which is always clean.
/// A single-shot run is clean only if its pass completed without failures.
fn exit_code_for(schedule: Schedule, summary: &RunSummary) -> DdnsExitCode {
    match schedule {
        Schedule::Periodic(_) => DdnsExitCode::CleanShutdown,
        Schedule::SingleShot if summary.is_clean() => DdnsExitCode::CleanShutdown,
        Schedule::SingleShot => DdnsExitCode::RuntimeError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::config::IpVersion;
    use std::time::Duration;

    #[test]
    fn single_shot_exit_code_reflects_the_pass() {
        let clean = RunSummary {
            passes: 1,
            updated: 1,
            ..RunSummary::default()
        };
        let aborted = RunSummary {
            passes: 1,
            aborted: 1,
            ..RunSummary::default()
        };
        let partial = RunSummary {
            passes: 1,
            updated: 1,
            failed: 1,
            ..RunSummary::default()
        };

        assert_eq!(exit_code_for(Schedule::SingleShot, &clean), DdnsExitCode::CleanShutdown);
        assert_eq!(exit_code_for(Schedule::SingleShot, &aborted), DdnsExitCode::RuntimeError);
        assert_eq!(exit_code_for(Schedule::SingleShot, &partial), DdnsExitCode::RuntimeError);
    }

    #[test]
    fn single_shot_with_skipped_record_is_not_clean() {
        let skipped = RunSummary {
            passes: 1,
            updated: 1,
            skipped: 1,
            ..RunSummary::default()
        };
        assert_eq!(exit_code_for(Schedule::SingleShot, &skipped), DdnsExitCode::RuntimeError);
    }

    #[test]
    fn periodic_shutdown_is_clean() {
        let summary = RunSummary {
            passes: 12,
            aborted: 3,
            ..RunSummary::default()
        };
        assert_eq!(
            exit_code_for(Schedule::Periodic(Duration::from_secs(60)), &summary),
            DdnsExitCode::CleanShutdown
        );
    }

    #[test]
    fn exit_codes_follow_systemd_conventions() {
        assert_eq!(DdnsExitCode::CleanShutdown as u8, 0);
        assert_eq!(DdnsExitCode::ConfigError as u8, 1);
        assert_eq!(DdnsExitCode::RuntimeError as u8, 2);
    }

    #[test]
    fn ip_source_follows_configuration() {
        let local = build_ip_source(&IpSourceConfig::Local {
            version: IpVersion::V6,
        })
        .unwrap();
        assert_eq!(local.source_name(), "local");
        assert_eq!(local.version(), IpVersion::V6);

        let http = build_ip_source(&IpSourceConfig::Http {
            url: "https://api.ipify.org".to_string(),
            version: IpVersion::V4,
        })
        .unwrap();
        assert_eq!(http.source_name(), "http");
    }

    #[tokio::test]
    async fn invalid_config_fails_before_any_pass() {
        // No subdomains: rejected when the engine is built
        let config = DdnsConfig::new("id", "secret", "example.com");
        let settings = Settings {
            config_path: "settings.json".into(),
            schedule: Schedule::SingleShot,
            dry_run: true,
            log_level: tracing::Level::INFO,
        };

        let err = run_daemon(config, &settings).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to create engine"));
    }
}
