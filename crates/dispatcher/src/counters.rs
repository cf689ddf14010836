//! Counter registry for dispatch observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{CounterName, CounterSnapshot};

/// Process-lifetime set of monotonic counters.
///
/// Shared by `Arc` between the sender, the pool tasks and the reporter.
/// Increments are lock-free and never lost under contention.
#[derive(Debug, Default)]
pub struct CounterRegistry {
    inbound_received: AtomicU64,
    attempted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    aborted: AtomicU64,
    retried: AtomicU64,
    rejected: AtomicU64,
}

impl CounterRegistry {
    /// Create a registry with every counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, name: CounterName) -> &AtomicU64 {
        match name {
            CounterName::InboundReceived => &self.inbound_received,
            CounterName::Attempted => &self.attempted,
            CounterName::Succeeded => &self.succeeded,
            CounterName::Failed => &self.failed,
            CounterName::Aborted => &self.aborted,
            CounterName::Retried => &self.retried,
            CounterName::Rejected => &self.rejected,
        }
    }

    /// Add one to a counter
    pub fn increment(&self, name: CounterName) {
        self.add(name, 1);
    }

    /// Add `delta` to a counter
    pub fn add(&self, name: CounterName, delta: u64) {
        if delta > 0 {
            self.slot(name).fetch_add(delta, Ordering::Relaxed);
        }
    }

    /// Current value of a counter
    pub fn value(&self, name: CounterName) -> u64 {
        self.slot(name).load(Ordering::Relaxed)
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            inbound_received: self.value(CounterName::InboundReceived),
            attempted: self.value(CounterName::Attempted),
            succeeded: self.value(CounterName::Succeeded),
            failed: self.value(CounterName::Failed),
            aborted: self.value(CounterName::Aborted),
            retried: self.value(CounterName::Retried),
            rejected: self.value(CounterName::Rejected),
        }
    }
}
