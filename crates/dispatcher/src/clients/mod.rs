//! Queue client implementations
//!
//! Contains LogQueueClient, FileQueueClient, and MemoryQueueClient.

mod file;
mod log;
mod memory;

pub use self::file::FileQueueClient;
pub use self::log::LogQueueClient;
pub use self::memory::{MemoryQueueClient, MemoryReply};
