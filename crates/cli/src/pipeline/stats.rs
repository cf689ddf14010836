//! Bridge run statistics.

use std::time::Duration;

use contracts::CounterSnapshot;
use observability::DispatchStatsAggregator;

/// Statistics from a bridge run
#[derive(Debug, Clone, Default)]
pub struct BridgeStats {
    /// Non-blank lines read from the input
    pub lines_read: u64,

    /// Blank lines skipped
    pub blank_lines: u64,

    /// Lines skipped because they were not valid UTF-8
    pub invalid_lines: u64,

    /// Batches accepted by the execution pool
    pub batches_submitted: u64,

    /// Batches refused by a saturated pool
    pub batches_refused: u64,

    /// Total duration of the run, including the drain
    pub duration: Duration,

    /// Final dispatcher counters
    pub counters: CounterSnapshot,

    /// Per-tick samples gathered by the telemetry reporter
    pub dispatch_metrics: DispatchStatsAggregator,
}

impl BridgeStats {
    /// Accepted messages per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.counters.succeeded as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Bridge Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!(
            "   ├─ Lines read: {} ({} blank, {} invalid skipped)",
            self.lines_read, self.blank_lines, self.invalid_lines
        );
        println!("   ├─ Batches submitted: {}", self.batches_submitted);
        println!("   ├─ Batches refused: {}", self.batches_refused);
        println!("   └─ Throughput: {:.2} msgs/s", self.throughput());

        let c = &self.counters;
        println!("\n📤 Dispatch Counters");
        println!("   ├─ Inbound received: {}", c.inbound_received);
        println!("   ├─ Attempted: {}", c.attempted);
        println!("   ├─ Succeeded: {}", c.succeeded);
        println!("   ├─ Failed: {}", c.failed);
        println!("   ├─ Retried: {}", c.retried);
        println!("   ├─ Aborted: {}", c.aborted);
        println!("   └─ Rejected: {}", c.rejected);

        if self.dispatch_metrics.samples > 0 {
            let summary = self.dispatch_metrics.summary();
            println!("\n📈 Telemetry Samples");
            println!("   ├─ Rate (msgs/interval): {}", summary.rate);
            println!("   ├─ Backlog depth: {}", summary.backlog);
            println!("   └─ Active workers: {}", summary.active_workers);
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput() {
        let stats = BridgeStats {
            duration: Duration::from_secs(2),
            counters: CounterSnapshot {
                succeeded: 50,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!((stats.throughput() - 25.0).abs() < 1e-10);
        assert_eq!(BridgeStats::default().throughput(), 0.0);
    }
}
