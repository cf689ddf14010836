//! Bridge orchestration module.

mod batcher;
mod orchestrator;
mod stats;

pub use batcher::LineBatcher;
pub use orchestrator::{Bridge, BridgeRunConfig};
pub use stats::BridgeStats;
