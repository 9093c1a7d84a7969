//! Core DDNS engine
//!
//! The DdnsEngine runs reconciliation passes. A pass is responsible for:
//! - Resolving the address to publish via IpSource
//! - Listing the domain's records via DnsProvider
//! - Keeping only the records of configured subdomains
//! - Updating the records whose value drifted from the address
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!                      │  Scheduler   │
//!                      └──────────────┘
//!                             │ reconcile()
//!                             ▼
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  IpSource   │◀────│  DdnsEngine  │────▶│ DnsProvider │
//! │ (current)   │     └──────────────┘     │ (list/upd.) │
//! └─────────────┘             │            └─────────────┘
//!                             ▼
//!                      ┌──────────────┐
//!                      │    Events    │
//!                      │   (notify)   │
//!                      └──────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Resolve the current address (failure aborts the pass)
//! 2. List the domain's records (failure aborts the pass)
//! 3. Filter by configured subdomain name and by the record type carrying
//!    the address family (A for IPv4, AAAA for IPv6)
//! 4. Leave records already pointing at the address untouched
//! 5. Stage value and TTL on the others and update them one by one
//! 6. Report counts
//!
//! No state survives a pass. An update that failed is attempted again by the
//! next pass, never within the same one.

use crate::config::{DdnsConfig, IpVersion, SubDomainConfig};
use crate::error::Result;
use crate::traits::{DnsProvider, IpSource, RemoteRecord};
use std::collections::HashMap;
use std::net::IpAddr;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Pass started with a freshly resolved address
    PassStarted {
        address: IpAddr,
    },

    /// Pass aborted before any update was attempted
    PassAborted {
        reason: String,
    },

    /// Record already points at the address (no update issued)
    RecordUnchanged {
        record_name: String,
        current_value: String,
    },

    /// Record has no configuration entry and was left alone
    RecordSkipped {
        record_name: String,
        reason: String,
    },

    /// DNS update succeeded
    UpdateSucceeded {
        record_name: String,
        previous_value: String,
        new_value: String,
        ttl: u32,
    },

    /// DNS update failed
    UpdateFailed {
        record_name: String,
        error: String,
    },

    /// Pass finished after every drifted record was attempted once
    PassCompleted {
        report: PassReport,
    },
}

/// Outcome of a completed pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Address the records were reconciled against
    pub address: Option<IpAddr>,
    /// Remote records of configured subdomains carrying the address family
    pub managed: usize,
    /// Records already pointing at the address
    pub unchanged: usize,
    /// Records updated successfully
    pub updated: usize,
    /// Records whose update failed
    pub failed: usize,
    /// Records skipped for lack of a configuration entry
    pub skipped: usize,
}

impl PassReport {
    /// Whether every drifted record was updated
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// Number of update calls issued during the pass
    pub fn attempted(&self) -> usize {
        self.updated + self.failed
    }
}

/// Core DDNS engine
///
/// The engine owns the IP source and provider and knows the configured
/// subdomains. Each call to [`DdnsEngine::reconcile()`] is one independent
/// pass; the engine keeps nothing between passes.
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Hand it to a [`crate::Scheduler`] or call [`DdnsEngine::reconcile()`] directly
/// 3. Drop to cleanup
///
/// ## Concurrency
///
/// Updates within a pass are issued sequentially. Each record is updated at
/// most once per pass and a failed update does not affect its siblings.
pub struct DdnsEngine {
    /// IP source for the address to publish
    ip_source: Box<dyn IpSource>,

    /// DNS provider for listing and updating records
    provider: Box<dyn DnsProvider>,

    /// Managed domain
    domain: String,

    /// Configured subdomains keyed by record name
    sub_domains: HashMap<String, SubDomainConfig>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Parameters
    ///
    /// - `ip_source`: IP source implementation
    /// - `provider`: DNS provider implementation
    /// - `config`: DDNS configuration (validated here)
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        config: &DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let sub_domains = config
            .sub_domains
            .iter()
            .map(|sub| (sub.name.clone(), sub.clone()))
            .collect();

        let engine = Self {
            ip_source,
            provider,
            domain: config.domain.clone(),
            sub_domains,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Managed domain
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(PassReport)`: The pass completed; per-record failures are counted in the report
    /// - `Err(Error)`: The pass was aborted (address resolution or listing failed)
    pub async fn reconcile(&self) -> Result<PassReport> {
        let address = match self.ip_source.current().await {
            Ok(ip) => ip,
            Err(e) => {
                error!(
                    "Failed to resolve address from {} source, skipping pass: {}",
                    self.ip_source.source_name(),
                    e
                );
                self.emit_event(EngineEvent::PassAborted {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };
        info!("Resolved address: {}", address);

        self.emit_event(EngineEvent::PassStarted { address });

        let records = match self.provider.list_records(&self.domain).await {
            Ok(records) => records,
            Err(e) => {
                error!(
                    "Failed to list records of {} via {}, skipping pass: {}",
                    self.domain,
                    self.provider.provider_name(),
                    e
                );
                self.emit_event(EngineEvent::PassAborted {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let managed = self.filter_managed(records, IpVersion::from(address).record_type());
        let mut report = PassReport {
            address: Some(address),
            managed: managed.len(),
            ..PassReport::default()
        };

        if managed.is_empty() {
            info!("No managed records found under {}", self.domain);
        }

        let value = address.to_string();
        for record in managed {
            if record.value == value {
                debug!("Record {} already points at {}, skipping update", record.name, value);
                report.unchanged += 1;
                self.emit_event(EngineEvent::RecordUnchanged {
                    record_name: record.name,
                    current_value: record.value,
                });
                continue;
            }

            let Some(sub_domain) = self.sub_domains.get(&record.name) else {
                warn!(
                    "Record {} has no matching subdomain entry, leaving it untouched",
                    record.name
                );
                report.skipped += 1;
                self.emit_event(EngineEvent::RecordSkipped {
                    record_name: record.name,
                    reason: "no matching subdomain configuration".to_string(),
                });
                continue;
            };

            match self.apply_update(record, &value, sub_domain.interval).await {
                Ok(()) => report.updated += 1,
                Err(_) => report.failed += 1,
            }
        }

        info!(
            "Pass complete for {}: {} managed, {} unchanged, {} updated, {} failed, {} skipped",
            self.domain,
            report.managed,
            report.unchanged,
            report.updated,
            report.failed,
            report.skipped
        );
        self.emit_event(EngineEvent::PassCompleted {
            report: report.clone(),
        });

        Ok(report)
    }

    /// Keep only records of configured subdomains that carry `record_type`
    ///
    /// This is narrower than matching on name alone: a dual-stack name keeps
    /// its record of the other family untouched, since the pass only resolved
    /// one address.
    fn filter_managed(&self, records: Vec<RemoteRecord>, record_type: &str) -> Vec<RemoteRecord> {
        records
            .into_iter()
            .filter(|record| self.sub_domains.contains_key(&record.name))
            .filter(|record| {
                let keep = record.record_type.eq_ignore_ascii_case(record_type);
                if !keep {
                    debug!(
                        "Ignoring {} record {}, resolved address needs {}",
                        record.record_type, record.name, record_type
                    );
                }
                keep
            })
            .collect()
    }

    /// Stage the new value and TTL on a record and send it to the provider
    ///
    /// Failures are logged and reported as events; they never abort the pass.
    async fn apply_update(&self, mut record: RemoteRecord, value: &str, ttl: u32) -> Result<()> {
        let previous_value = std::mem::replace(&mut record.value, value.to_string());
        record.ttl = ttl;

        match self.provider.update_record(&record).await {
            Ok(()) => {
                info!(
                    "Updated {} -> {} (previous: {}, ttl: {})",
                    record.name, record.value, previous_value, ttl
                );
                self.emit_event(EngineEvent::UpdateSucceeded {
                    record_name: record.name,
                    previous_value,
                    new_value: record.value,
                    ttl,
                });
                Ok(())
            }
            Err(e) => {
                error!("Failed to update record {}: {}", record.name, e);
                self.emit_event(EngineEvent::UpdateFailed {
                    record_name: record.name,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Emit an engine event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: EngineEvent) {
        // A closed channel only means nobody is listening.
        if let Err(TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
