//! Counter names and point-in-time views read by reporters/exporters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named monotonic counters maintained by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterName {
    /// Messages handed over by ingestion
    InboundReceived,
    /// Batches accepted into the pool and started
    Attempted,
    /// Entries accepted by the queue
    Succeeded,
    /// Downstream calls that failed or were partially rejected
    Failed,
    /// Batches given up after exhausting retries
    Aborted,
    /// Re-attempts of a failed batch
    Retried,
    /// Batches refused by a saturated pool
    Rejected,
}

impl CounterName {
    pub const ALL: [CounterName; 7] = [
        CounterName::InboundReceived,
        CounterName::Attempted,
        CounterName::Succeeded,
        CounterName::Failed,
        CounterName::Aborted,
        CounterName::Retried,
        CounterName::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CounterName::InboundReceived => "inbound_received",
            CounterName::Attempted => "attempted",
            CounterName::Succeeded => "succeeded",
            CounterName::Failed => "failed",
            CounterName::Aborted => "aborted",
            CounterName::Retried => "retried",
            CounterName::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CounterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of every counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub inbound_received: u64,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub aborted: u64,
    pub retried: u64,
    pub rejected: u64,
}

impl CounterSnapshot {
    pub fn get(&self, name: CounterName) -> u64 {
        match name {
            CounterName::InboundReceived => self.inbound_received,
            CounterName::Attempted => self.attempted,
            CounterName::Succeeded => self.succeeded,
            CounterName::Failed => self.failed,
            CounterName::Aborted => self.aborted,
            CounterName::Retried => self.retried,
            CounterName::Rejected => self.rejected,
        }
    }
}

/// Execution pool occupancy (reporting only)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Live worker tasks
    pub workers: usize,
    /// Workers currently running a task
    pub active: usize,
    /// Tasks waiting in the backlog
    pub queued: usize,
    /// Backlog capacity
    pub capacity: usize,
}
