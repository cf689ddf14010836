//! # Dispatcher
//!
//! Batch dispatch to an at-least-once message queue.
//!
//! Responsibilities:
//! - Accept batches without blocking the caller
//! - Bound concurrency and backlog, rejecting overflow
//! - Classify each downstream call and count the results
//! - Periodically report throughput and pool occupancy

pub mod clients;
pub mod counters;
pub mod dispatcher;
pub mod error;
pub mod outcome;
pub mod pool;
pub mod reporter;
pub mod retry;
pub mod sender;

pub use contracts::{Batch, Message, QueueClient};
pub use clients::{FileQueueClient, LogQueueClient, MemoryQueueClient, MemoryReply};
pub use counters::CounterRegistry;
pub use dispatcher::{
    AnyQueueClient, Dispatcher, DispatcherBuilder, create_client, create_dispatcher,
};
pub use error::DispatcherError;
pub use outcome::SendOutcome;
pub use pool::{ExecutionPool, PoolMonitor};
pub use reporter::{RateReport, SampleHook, TelemetryReporter};
pub use retry::{NextStep, RetryPolicy};
pub use sender::{BatchSender, SendSettings};
