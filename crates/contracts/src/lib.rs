//! # Contracts
//!
//! Frozen interface contracts shared by the bridge crates: message and batch
//! types, the downstream `QueueClient` trait, counter names and the bridge
//! configuration. Business crates depend on this crate, never the reverse.
//!
//! ## Delivery Model
//! - At-least-once: the queue owns durability once a call succeeds
//! - Batches are fire-and-forget from the ingestion side

mod config;
mod error;
mod message;
mod queue;
mod telemetry;

pub use config::*;
pub use error::*;
pub use message::{Batch, BatchEntry, BatchFingerprint, Message};
pub use queue::*;
pub use telemetry::*;
