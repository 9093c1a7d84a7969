//! Contract Test: Scheduling
//!
//! Constraints verified:
//! - Single-shot mode runs exactly one pass and returns
//! - Periodic mode runs immediately, then once per period, until shutdown
//! - Aborted passes do not stop the schedule
//! - Passes never overlap; an overrunning pass skips missed ticks
//!
//! Wall-clock behaviour is tested under paused tokio time, so no test
//! actually waits.

mod common;

use common::*;
use ddns_core::error::Result;
use ddns_core::{ChannelTicker, DdnsEngine, IpSource, Schedule, Scheduler};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn scheduler_for(
    ip_source: StaticIpSource,
    provider: &MockDnsProvider,
    schedule: Schedule,
) -> Scheduler {
    let config = config_with(&[("home", 300), ("office", 600)]);
    let (engine, _event_rx) = DdnsEngine::new(
        Box::new(ip_source),
        Box::new(MockDnsProvider::sharing_state_with(provider)),
        &config,
    )
    .expect("engine construction succeeds");
    Scheduler::new(engine, schedule)
}

#[tokio::test]
async fn single_shot_runs_exactly_once() {
    let provider = MockDnsProvider::new(home_office_records());
    let ip_source = StaticIpSource::new(IpAddr::from([1, 2, 3, 4]));
    let probe = StaticIpSource::sharing_state_with(&ip_source);

    let scheduler = scheduler_for(ip_source, &provider, Schedule::from_interval_secs(0));

    // No shutdown signal needed: the run ends on its own
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        scheduler.run_with_shutdown(None),
    )
    .await
    .expect("single-shot run returns");

    assert_eq!(summary.passes, 1);
    assert_eq!(summary.updated, 1);
    assert!(summary.is_clean());
    assert_eq!(probe.current_call_count(), 1);
    assert_eq!(provider.list_call_count(), 1);
}

#[tokio::test]
async fn single_shot_reports_aborted_pass() {
    let provider = MockDnsProvider::new(home_office_records());
    let scheduler = scheduler_for(StaticIpSource::unavailable(), &provider, Schedule::SingleShot);

    let summary = scheduler.run_with_shutdown(None).await;

    assert_eq!(summary.passes, 1);
    assert_eq!(summary.aborted, 1);
    assert!(!summary.is_clean());
    assert_eq!(provider.total_call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn periodic_runs_immediately_then_every_interval() {
    let provider = MockDnsProvider::new(home_office_records());
    let ip_source = StaticIpSource::new(IpAddr::from([1, 2, 3, 4]));
    let probe = StaticIpSource::sharing_state_with(&ip_source);

    let scheduler = scheduler_for(ip_source, &provider, Schedule::from_interval_secs(60));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { scheduler.run_with_shutdown(Some(shutdown_rx)).await });

    // t = 0: first pass happens without waiting for the interval
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(probe.current_call_count(), 1);

    // t = 60 and t = 120
    tokio::time::sleep(Duration::from_secs(124)).await;
    assert_eq!(probe.current_call_count(), 3);

    shutdown_tx.send(()).unwrap();
    let summary = handle.await.unwrap();

    assert_eq!(summary.passes, 3);
    // Only the first pass found drift
    assert_eq!(summary.updated, 1);
    assert_eq!(provider.update_call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_periodic_schedule() {
    let provider = MockDnsProvider::new(home_office_records());
    let ip_source = StaticIpSource::new(IpAddr::from([1, 2, 3, 4]));
    let probe = StaticIpSource::sharing_state_with(&ip_source);

    let scheduler = scheduler_for(ip_source, &provider, Schedule::Periodic(Duration::from_secs(60)));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { scheduler.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(Duration::from_secs(30)).await;
    shutdown_tx.send(()).unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler stops promptly")
        .unwrap();
    assert_eq!(summary.passes, 1);

    // Nothing runs after shutdown
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(probe.current_call_count(), 1);
}

#[tokio::test]
async fn aborted_passes_do_not_stop_the_schedule() {
    let provider = MockDnsProvider::new(home_office_records());
    let ip_source = StaticIpSource::unavailable();
    let probe = StaticIpSource::sharing_state_with(&ip_source);
    let scheduler = scheduler_for(ip_source, &provider, Schedule::Periodic(Duration::from_secs(60)));

    let (mut ticker, tick_tx) = ChannelTicker::new();
    tick_tx.send(()).unwrap();
    tick_tx.send(()).unwrap();
    drop(tick_tx);

    let summary = scheduler
        .run_with_ticker(&mut ticker, std::future::pending())
        .await;
    assert_eq!(summary.passes, 2);
    assert_eq!(summary.aborted, 2);
    assert_eq!(provider.total_call_count(), 0);

    // The address comes back: the following pass reconciles normally
    probe.set_ip(Some(IpAddr::from([1, 2, 3, 4])));
    let (mut ticker, tick_tx) = ChannelTicker::new();
    tick_tx.send(()).unwrap();
    drop(tick_tx);

    let summary = scheduler
        .run_with_ticker(&mut ticker, std::future::pending())
        .await;
    assert_eq!(summary.passes, 1);
    assert_eq!(summary.aborted, 0);
    assert_eq!(provider.updated_names(), vec!["office".to_string()]);
}

/// An IP source whose resolution takes longer than the schedule period
struct SlowIpSource {
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    started_at: Arc<std::sync::Mutex<Vec<Duration>>>,
    origin: tokio::time::Instant,
}

#[async_trait::async_trait]
impl IpSource for SlowIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.started_at.lock().unwrap().push(self.origin.elapsed());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(IpAddr::from([1, 2, 3, 4]))
    }

    fn source_name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test(start_paused = true)]
async fn overrunning_pass_skips_missed_ticks_without_overlap() {
    let provider = MockDnsProvider::new(home_office_records());
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let started_at = Arc::new(std::sync::Mutex::new(Vec::new()));

    let ip_source = SlowIpSource {
        delay: Duration::from_secs(90),
        in_flight: Arc::new(AtomicUsize::new(0)),
        max_in_flight: Arc::clone(&max_in_flight),
        started_at: Arc::clone(&started_at),
        origin: tokio::time::Instant::now(),
    };

    let config = config_with(&[("home", 300), ("office", 600)]);
    let (engine, _event_rx) = DdnsEngine::new(
        Box::new(ip_source),
        Box::new(MockDnsProvider::sharing_state_with(&provider)),
        &config,
    )
    .unwrap();
    let scheduler = Scheduler::new(engine, Schedule::Periodic(Duration::from_secs(60)));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { scheduler.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(Duration::from_secs(200)).await;
    shutdown_tx.send(()).unwrap();
    let summary = handle.await.unwrap();

    // Pass 1 runs 0..90 and the tick due at 60 fires late, at 90. Pass 2
    // runs 90..180, the tick due at 120 fires late at 180. Pass 3 is still
    // running at 200 and completes before shutdown is observed.
    assert_eq!(
        *started_at.lock().unwrap(),
        vec![
            Duration::from_secs(0),
            Duration::from_secs(90),
            Duration::from_secs(180)
        ]
    );
    assert_eq!(summary.passes, 3);
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1, "passes never overlap");
}
