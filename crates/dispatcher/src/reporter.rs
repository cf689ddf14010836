//! TelemetryReporter - periodic throughput and pool occupancy logging

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument};

use contracts::{CounterSnapshot, PoolStats, TelemetryConfig};

use crate::counters::CounterRegistry;
use crate::pool::PoolMonitor;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Callback invoked with every rate-tick sample
pub type SampleHook = Box<dyn Fn(&CounterSnapshot, &PoolStats) + Send + Sync>;

/// Result of a rate tick with traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateReport {
    /// Succeeded delta since the previous tick
    pub rate: u64,
    pub snapshot: CounterSnapshot,
}

pub struct TelemetryReporter {
    counters: Arc<CounterRegistry>,
    pool: PoolMonitor,
    rate_interval: Duration,
    pool_interval: Duration,
    last_succeeded: u64,
    hook: Option<SampleHook>,
}

impl TelemetryReporter {
    pub fn new(counters: Arc<CounterRegistry>, pool: PoolMonitor, config: &TelemetryConfig) -> Self {
        Self {
            counters,
            pool,
            rate_interval: config.rate_interval().max(MIN_INTERVAL),
            pool_interval: config.pool_interval().max(MIN_INTERVAL),
            last_succeeded: 0,
            hook: None,
        }
    }

    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CounterSnapshot, &PoolStats) + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Advance the rate window.
    ///
    /// Returns `None` when nothing succeeded since the previous tick, so
    /// idle periods stay silent.
    pub fn sample_rate(&mut self) -> Option<RateReport> {
        let snapshot = self.counters.snapshot();
        let rate = snapshot.succeeded.saturating_sub(self.last_succeeded);
        self.last_succeeded = snapshot.succeeded;

        if let Some(hook) = &self.hook {
            hook(&snapshot, &self.pool.stats());
        }

        (rate > 0).then_some(RateReport { rate, snapshot })
    }

    fn report_rate(&mut self) {
        let Some(report) = self.sample_rate() else {
            return;
        };
        let s = &report.snapshot;

        info!(inbound_received = s.inbound_received, "Inbound messages received");
        info!(attempted = s.attempted, rejected = s.rejected, "Batches attempted / rejected");
        info!(succeeded = s.succeeded, aborted = s.aborted, "Messages succeeded / batches aborted");
        info!(failed = s.failed, "Failed send calls");
        info!(retried = s.retried, "Retried send calls");
        info!(rate = report.rate, "rate [msgs/interval]");
    }

    /// Pool occupancy line, emitted regardless of traffic
    pub fn report_pool(&self) -> PoolStats {
        let stats = self.pool.stats();
        info!(
            workers = stats.workers,
            active = stats.active,
            queued = stats.queued,
            capacity = stats.capacity,
            "Execution pool status"
        );
        stats
    }

    /// Run both ticks until `shutdown` flips to true or its sender is dropped
    #[instrument(name = "telemetry_reporter_run", skip_all)]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let start = Instant::now();
        let mut rate_tick = interval_at(start + self.rate_interval, self.rate_interval);
        let mut pool_tick = interval_at(start + self.pool_interval, self.pool_interval);
        rate_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        pool_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(
            rate_interval_ms = self.rate_interval.as_millis() as u64,
            pool_interval_ms = self.pool_interval.as_millis() as u64,
            "Telemetry reporter started"
        );

        loop {
            tokio::select! {
                _ = rate_tick.tick() => self.report_rate(),
                _ = pool_tick.tick() => {
                    self.report_pool();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        // final sample so exporters see the drained totals
        self.report_rate();
        debug!("Telemetry reporter stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
