//! Pass scheduling
//!
//! The [`Scheduler`] decides *when* the engine reconciles:
//!
//! - [`Schedule::SingleShot`]: one pass, then return
//! - [`Schedule::Periodic`]: one pass immediately, then one per period until shutdown
//!
//! ## Tick Sources
//!
//! Ticks come from a [`Ticker`]. Production uses [`IntervalTicker`], tests
//! can drive passes by hand with [`ChannelTicker`] or run
//! [`IntervalTicker`] under paused tokio time.
//!
//! ## Overrun Policy
//!
//! The period is measured from pass start to pass start. A pass that outlasts
//! the period is never interrupted and never overlaps the next one. When it
//! ends, one late tick fires immediately; any further missed ticks are dropped
//! and the schedule stays aligned with the original grid
//! (`MissedTickBehavior::Skip`).

use crate::engine::{DdnsEngine, PassReport};
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{IntervalStream, UnboundedReceiverStream};
use tracing::{debug, info, warn};

/// When to run reconciliation passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Run exactly one pass
    SingleShot,
    /// Run one pass immediately, then one every period
    Periodic(Duration),
}

impl Schedule {
    /// Build a schedule from an interval in seconds (0 means single-shot)
    pub fn from_interval_secs(secs: u64) -> Self {
        if secs == 0 {
            Schedule::SingleShot
        } else {
            Schedule::Periodic(Duration::from_secs(secs))
        }
    }
}

/// Source of pass triggers
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick
    ///
    /// Returns `false` once no further ticks will ever arrive.
    async fn tick(&mut self) -> bool;
}

/// Wall-clock ticker backed by `tokio::time::interval`
///
/// The first tick completes immediately. Missed ticks are skipped.
pub struct IntervalTicker {
    ticks: IntervalStream,
}

impl IntervalTicker {
    /// Create a ticker firing every `period`
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            ticks: IntervalStream::new(interval),
        }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.ticks.next().await.is_some()
    }
}

/// Ticker driven by hand through a channel
///
/// Every `()` sent on the paired sender triggers one pass. Dropping the
/// sender ends the schedule.
pub struct ChannelTicker {
    ticks: UnboundedReceiverStream<()>,
}

impl ChannelTicker {
    /// Create a ticker and the sender that drives it
    pub fn new() -> (Self, mpsc::UnboundedSender<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                ticks: UnboundedReceiverStream::new(rx),
            },
            tx,
        )
    }
}

#[async_trait]
impl Ticker for ChannelTicker {
    async fn tick(&mut self) -> bool {
        self.ticks.next().await.is_some()
    }
}

/// Totals over every pass a scheduler ran
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Passes started
    pub passes: usize,
    /// Passes aborted before updating (address or listing failure)
    pub aborted: usize,
    /// Records updated across all passes
    pub updated: usize,
    /// Record updates that failed across all passes
    pub failed: usize,
    /// Drifted records left untouched across all passes
    pub skipped: usize,
    /// Report of the last completed pass
    pub last_report: Option<PassReport>,
}

impl RunSummary {
    fn record(&mut self, outcome: &Result<PassReport>) {
        self.passes += 1;
        match outcome {
            Ok(report) => {
                self.updated += report.updated;
                self.failed += report.failed;
                self.skipped += report.skipped;
                self.last_report = Some(report.clone());
            }
            Err(_) => self.aborted += 1,
        }
    }

    /// Whether every pass completed and every drifted record was updated
    ///
    /// Agrees with [`PassReport::is_clean`] for a single pass.
    pub fn is_clean(&self) -> bool {
        self.aborted == 0 && self.failed == 0 && self.skipped == 0
    }
}

/// Runs the engine according to a [`Schedule`]
///
/// At most one pass executes at a time: the next tick is only awaited once
/// the current pass returned.
pub struct Scheduler {
    engine: DdnsEngine,
    schedule: Schedule,
}

impl Scheduler {
    /// Create a scheduler
    pub fn new(engine: DdnsEngine, schedule: Schedule) -> Self {
        Self { engine, schedule }
    }

    /// Run until the schedule ends or SIGINT/SIGTERM is received
    pub async fn run(&self) -> RunSummary {
        self.run_until(shutdown_signal()).await
    }

    /// Run with a controlled shutdown signal
    ///
    /// `None` means the run only ends with the schedule itself (single-shot)
    /// or with process termination (periodic).
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> RunSummary {
        match shutdown_rx {
            Some(rx) => {
                self.run_until(async move {
                    let _ = rx.await;
                })
                .await
            }
            None => self.run_until(std::future::pending()).await,
        }
    }

    /// Run until the schedule ends or `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()> + Send,
    {
        match self.schedule {
            Schedule::SingleShot => {
                let mut summary = RunSummary::default();
                self.run_pass(&mut summary).await;
                summary
            }
            Schedule::Periodic(period) => {
                info!("Reconciling every {:?}", period);
                let mut ticker = IntervalTicker::new(period);
                self.run_with_ticker(&mut ticker, shutdown).await
            }
        }
    }

    /// Run one pass per tick of `ticker` until it ends or `shutdown` resolves
    ///
    /// A pass in progress is always allowed to finish; shutdown is observed
    /// between passes.
    pub async fn run_with_ticker<T, F>(&self, ticker: &mut T, shutdown: F) -> RunSummary
    where
        T: Ticker + ?Sized,
        F: Future<Output = ()> + Send,
    {
        let mut summary = RunSummary::default();
        tokio::pin!(shutdown);

        loop {
            // Shutdown wins over a tick that is already due.
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                more = ticker.tick() => {
                    if !more {
                        debug!("Tick source exhausted");
                        break;
                    }
                    self.run_pass(&mut summary).await;
                }
            }
        }

        info!(
            "Scheduler stopped after {} pass(es): {} aborted, {} updated, {} failed, {} skipped",
            summary.passes, summary.aborted, summary.updated, summary.failed, summary.skipped
        );
        summary
    }

    async fn run_pass(&self, summary: &mut RunSummary) {
        debug!("Starting pass {} for {}", summary.passes + 1, self.engine.domain());
        let outcome = self.engine.reconcile().await;
        if let Err(e) = &outcome {
            warn!("Pass aborted: {}", e);
        }
        summary.record(&outcome);
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (Ok(mut sigterm), Ok(mut sigint)) = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) else {
        warn!("Failed to install signal handlers, falling back to CTRL-C");
        let _ = tokio::signal::ctrl_c().await;
        return;
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to wait for CTRL-C: {}", e);
        std::future::pending::<()>().await;
    }
}
