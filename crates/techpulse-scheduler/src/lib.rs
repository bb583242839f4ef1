//! C6 — Scheduler: two periodic triggers (catalog refresh, deep analytics
//! refresh) plus a manual refresh entry point, single-flight per kind
//! (§4.6). Modeled on the server binary's `tokio::select!` periodic-timer
//! and graceful-shutdown wiring.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use techpulse_orchestrator::CancellationToken;

/// What a caller of [`Scheduler::trigger_catalog_refresh`] or
/// [`Scheduler::trigger_deep_analytics_refresh`] learns back: either the
/// refresh was just kicked off, or one of that kind is already running
/// and this call is a no-op (§4.6, §8 testable property 9 — "no
/// queueing").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Started,
    AlreadyRunning,
}

/// The work a catalog refresh performs, implemented over
/// `techpulse_orchestrator::run_cycle` by the binary that wires the
/// Scheduler to real adapters and a real Catalog Store.
#[async_trait]
pub trait CatalogRefreshTask: Send + Sync {
    async fn run(&self, force: bool);
}

/// The work a deep-analytics refresh performs: recompute and cache the
/// Analytics Engine's outputs (§4.8).
#[async_trait]
pub trait AnalyticsRefreshTask: Send + Sync {
    async fn run(&self);
}

pub struct SchedulerConfig {
    pub catalog_refresh_interval: Duration,
    pub deep_analytics_refresh_interval: Duration,
}

impl SchedulerConfig {
    pub fn from_minutes_and_hours(refresh_interval_minutes: u64, deep_refresh_hours: u64) -> Self {
        Self {
            catalog_refresh_interval: Duration::from_secs(refresh_interval_minutes.max(1) * 60),
            deep_analytics_refresh_interval: Duration::from_secs(deep_refresh_hours.max(1) * 3600),
        }
    }
}

pub struct Scheduler {
    config: SchedulerConfig,
    catalog_task: Arc<dyn CatalogRefreshTask>,
    analytics_task: Arc<dyn AnalyticsRefreshTask>,
    catalog_in_flight: Arc<AtomicBool>,
    analytics_in_flight: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        catalog_task: Arc<dyn CatalogRefreshTask>,
        analytics_task: Arc<dyn AnalyticsRefreshTask>,
    ) -> Self {
        Self {
            config,
            catalog_task,
            analytics_task,
            catalog_in_flight: Arc::new(AtomicBool::new(false)),
            analytics_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn catalog_refresh_in_flight(&self) -> bool {
        self.catalog_in_flight.load(Ordering::SeqCst)
    }

    pub fn analytics_refresh_in_flight(&self) -> bool {
        self.analytics_in_flight.load(Ordering::SeqCst)
    }

    /// The manual refresh entry point (§4.6): `force=true` resets
    /// `dateThreshold` to 7 days ago. Returns immediately; a second call
    /// while a refresh is already running is a no-op, per §8 property 9.
    pub fn trigger_catalog_refresh(&self, force: bool) -> RefreshTrigger {
        if self.catalog_in_flight.swap(true, Ordering::AcqRel) {
            return RefreshTrigger::AlreadyRunning;
        }
        let task = Arc::clone(&self.catalog_task);
        let flag = Arc::clone(&self.catalog_in_flight);
        tokio::spawn(async move {
            task.run(force).await;
            flag.store(false, Ordering::Release);
        });
        RefreshTrigger::Started
    }

    pub fn trigger_deep_analytics_refresh(&self) -> RefreshTrigger {
        if self.analytics_in_flight.swap(true, Ordering::AcqRel) {
            return RefreshTrigger::AlreadyRunning;
        }
        let task = Arc::clone(&self.analytics_task);
        let flag = Arc::clone(&self.analytics_in_flight);
        tokio::spawn(async move {
            task.run().await;
            flag.store(false, Ordering::Release);
        });
        RefreshTrigger::Started
    }

    /// The Scheduler's own timer loop: ticks the two periodic triggers
    /// and exits once `cancellation` resolves (graceful shutdown, §B.7).
    pub async fn run(self: Arc<Self>, cancellation: CancellationToken) {
        let mut catalog_interval = tokio::time::interval(self.config.catalog_refresh_interval);
        let mut analytics_interval = tokio::time::interval(self.config.deep_analytics_refresh_interval);
        // The first tick fires immediately; skip it so startup doesn't
        // trigger a refresh before the caller has had a chance to run one
        // explicitly (e.g. to populate the catalog before serving).
        catalog_interval.tick().await;
        analytics_interval.tick().await;

        loop {
            tokio::select! {
                _ = catalog_interval.tick() => {
                    match self.trigger_catalog_refresh(false) {
                        RefreshTrigger::Started => info!("scheduled catalog refresh started"),
                        RefreshTrigger::AlreadyRunning => warn!("scheduled catalog refresh skipped: one is already running"),
                    }
                }
                _ = analytics_interval.tick() => {
                    match self.trigger_deep_analytics_refresh() {
                        RefreshTrigger::Started => info!("scheduled deep analytics refresh started"),
                        RefreshTrigger::AlreadyRunning => warn!("scheduled deep analytics refresh skipped: one is already running"),
                    }
                }
                _ = cancellation.cancelled() => {
                    info!("scheduler observed shutdown signal, stopping timer loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;

    struct CountingCatalogTask {
        calls: Arc<AtomicUsize>,
        delay: StdDuration,
    }

    #[async_trait]
    impl CatalogRefreshTask for CountingCatalogTask {
        async fn run(&self, _force: bool) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
        }
    }

    struct CountingAnalyticsTask {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AnalyticsRefreshTask for CountingAnalyticsTask {
        async fn run(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn scheduler_with_delay(delay: StdDuration) -> (Arc<Scheduler>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let catalog_calls = Arc::new(AtomicUsize::new(0));
        let analytics_calls = Arc::new(AtomicUsize::new(0));
        let scheduler = Arc::new(Scheduler::new(
            SchedulerConfig::from_minutes_and_hours(10, 6),
            Arc::new(CountingCatalogTask { calls: Arc::clone(&catalog_calls), delay }),
            Arc::new(CountingAnalyticsTask { calls: Arc::clone(&analytics_calls) }),
        ));
        (scheduler, catalog_calls, analytics_calls)
    }

    #[tokio::test]
    async fn second_trigger_while_running_is_already_running() {
        let (scheduler, calls, _) = scheduler_with_delay(StdDuration::from_millis(200));
        assert_eq!(scheduler.trigger_catalog_refresh(false), RefreshTrigger::Started);
        assert!(scheduler.catalog_refresh_in_flight());
        assert_eq!(scheduler.trigger_catalog_refresh(false), RefreshTrigger::AlreadyRunning);
        tokio::time::sleep(StdDuration::from_millis(300)).await;
        assert!(!scheduler.catalog_refresh_in_flight());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn catalog_and_analytics_flags_are_independent() {
        let (scheduler, _, analytics_calls) = scheduler_with_delay(StdDuration::from_millis(50));
        assert_eq!(scheduler.trigger_catalog_refresh(false), RefreshTrigger::Started);
        assert_eq!(scheduler.trigger_deep_analytics_refresh(), RefreshTrigger::Started);
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        assert_eq!(analytics_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_loop_exits_on_cancellation() {
        let (scheduler, _, _) = scheduler_with_delay(StdDuration::from_millis(1));
        let cancellation = CancellationToken::new();
        let cancel_clone = cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(StdDuration::from_millis(20)).await;
            cancel_clone.cancel();
        });
        tokio::time::timeout(StdDuration::from_secs(2), scheduler.run(cancellation))
            .await
            .expect("scheduler loop should exit promptly after cancellation");
    }
}
