//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Pool sizing rejected at construction
    #[error("invalid pool configuration: {message}")]
    InvalidPool { message: String },

    /// Queue client creation error
    #[error("failed to create queue client '{name}': {message}")]
    ClientCreation { name: String, message: String },

    /// Backlog full - submission refused
    #[error("execution pool saturated (backlog capacity {capacity})")]
    PoolSaturated { capacity: usize },

    /// Pool already shut down
    #[error("execution pool is shut down")]
    PoolClosed,

    /// Contract error (config, io)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a queue client creation error
    pub fn client_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ClientCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_pool(message: impl Into<String>) -> Self {
        Self::InvalidPool {
            message: message.into(),
        }
    }
}
