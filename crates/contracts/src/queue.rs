//! QueueClient trait - Dispatcher output interface
//!
//! Abstracts the managed message queue reached by one batch call per
//! accepted batch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::BatchEntry;

/// One downstream batch-send call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSendRequest {
    /// Destination queue identifier
    pub queue_url: String,
    /// Entries in message order
    pub entries: Vec<BatchEntry>,
}

/// Per-entry breakdown returned by the queue.
///
/// Acceptance is not all-or-nothing: a call may succeed for some entries
/// and fail for others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSendResponse {
    /// Ids of accepted entries
    pub successful: Vec<String>,
    /// Rejected entries
    pub failed: Vec<EntryFailure>,
}

impl BatchSendResponse {
    /// Response accepting every entry of `request`
    pub fn accept_all(request: &BatchSendRequest) -> Self {
        Self {
            successful: request.entries.iter().map(|e| e.id.clone()).collect(),
            failed: Vec::new(),
        }
    }

    pub fn accepted(&self) -> usize {
        self.successful.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Rejection of a single entry inside an otherwise answered call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    pub id: String,
    pub code: String,
    pub message: String,
    /// True when the service blames the request rather than itself
    pub sender_fault: bool,
}

/// Who the service blames for a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Client,
    Service,
    #[default]
    Unknown,
}

/// Diagnostic context of a request that reached the service and was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    pub message: String,
    pub status_code: u16,
    pub error_code: String,
    pub category: ErrorCategory,
    pub request_id: String,
}

const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestThrottled",
    "RequestThrottledException",
    "TooManyRequestsException",
    "SlowDown",
];

impl ServiceError {
    /// Whether the refusal is a throttling signal rather than a bad request
    pub fn is_throttling(&self) -> bool {
        matches!(self.status_code, 429 | 503) || THROTTLING_CODES.contains(&self.error_code.as_str())
    }
}

/// Failure before a usable response was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Transport failure (connection refused, reset, DNS, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// Request could not be encoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No response within the configured send timeout
    #[error("no response after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Local resource exhaustion or I/O failure
    #[error("local error: {0}")]
    Local(String),
}

/// Error returned by a downstream batch call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Request reached the service and was rejected
    #[error("service rejected request ({}/{}): {}", .0.status_code, .0.error_code, .0.message)]
    ServiceRejected(ServiceError),

    /// Request never reliably reached the service
    #[error("client error: {0}")]
    Client(#[from] ClientError),
}

/// Downstream queue trait
///
/// All queue client implementations must implement this trait.
#[trait_variant::make(QueueClient: Send)]
pub trait LocalQueueClient {
    /// Client name (used for logging)
    fn name(&self) -> &str;

    /// Send every entry of `request` in a single call
    ///
    /// # Errors
    /// `QueueError::ServiceRejected` when the service answered with an error,
    /// `QueueError::Client` when no usable answer was obtained.
    async fn send_batch(&self, request: &BatchSendRequest)
        -> Result<BatchSendResponse, QueueError>;
}
