//! MemoryQueueClient - in-process queue with scripted replies
//!
//! Records recent requests and answers from a reply script, falling back to
//! accepting everything once the script runs out. Used by `client = "memory"`
//! runs and throughout the tests.
//!
//! Only the last `history` requests are retained, so a long run stays bounded.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, instrument};

use contracts::{
    BatchSendRequest, BatchSendResponse, ClientError, EntryFailure, QueueClient, QueueError,
    ServiceError,
};

/// Scripted answer for one call
#[derive(Debug, Clone)]
pub enum MemoryReply {
    AcceptAll,
    /// Accept the first n entries, reject the rest
    AcceptFirst(usize),
    /// Report exactly these ids as accepted, whatever was sent
    AcceptIds(Vec<String>),
    Reject(ServiceError),
    Fail(ClientError),
}

/// Requests kept by default
pub const DEFAULT_HISTORY: usize = 1024;

#[derive(Debug)]
struct MemoryState {
    requests: Mutex<VecDeque<BatchSendRequest>>,
    history: AtomicUsize,
    received: AtomicU64,
    replies: Mutex<VecDeque<MemoryReply>>,
    /// true while calls are held
    gate: watch::Sender<bool>,
}

/// Cloneable handle; clones share requests, replies and gate
#[derive(Debug, Clone)]
pub struct MemoryQueueClient {
    name: String,
    delay: Option<Duration>,
    state: Arc<MemoryState>,
}

impl MemoryQueueClient {
    pub fn new(name: impl Into<String>) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            name: name.into(),
            delay: None,
            state: Arc::new(MemoryState {
                requests: Mutex::new(VecDeque::new()),
                history: AtomicUsize::new(DEFAULT_HISTORY),
                received: AtomicU64::new(0),
                replies: Mutex::new(VecDeque::new()),
                gate,
            }),
        }
    }

    /// Simulated call latency
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Retain at most `capacity` requests (at least one)
    pub fn with_history(self, capacity: usize) -> Self {
        self.state.history.store(capacity.max(1), Ordering::Relaxed);
        self
    }

    /// Queue a reply for the next unanswered call
    pub fn push_reply(&self, reply: MemoryReply) {
        self.state
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Block every call until `release`
    pub fn hold(&self) {
        self.state.gate.send_replace(true);
    }

    pub fn release(&self) {
        self.state.gate.send_replace(false);
    }

    /// Retained requests, oldest first
    pub fn requests(&self) -> Vec<BatchSendRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Calls received over the client's lifetime, retained or not
    pub fn request_count(&self) -> u64 {
        self.state.received.load(Ordering::Relaxed)
    }

    fn remember(&self, request: &BatchSendRequest) {
        self.state.received.fetch_add(1, Ordering::Relaxed);
        let history = self.state.history.load(Ordering::Relaxed);
        let mut requests = self
            .state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while requests.len() >= history {
            requests.pop_front();
        }
        requests.push_back(request.clone());
    }

    fn next_reply(&self) -> MemoryReply {
        self.state
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(MemoryReply::AcceptAll)
    }
}

fn answer(reply: MemoryReply, request: &BatchSendRequest) -> Result<BatchSendResponse, QueueError> {
    match reply {
        MemoryReply::AcceptAll => Ok(BatchSendResponse::accept_all(request)),
        MemoryReply::AcceptFirst(n) => {
            let (ok, rejected) = request.entries.split_at(n.min(request.entries.len()));
            Ok(BatchSendResponse {
                successful: ok.iter().map(|e| e.id.clone()).collect(),
                failed: rejected
                    .iter()
                    .map(|e| EntryFailure {
                        id: e.id.clone(),
                        code: "InternalError".to_string(),
                        message: "entry not stored".to_string(),
                        sender_fault: false,
                    })
                    .collect(),
            })
        }
        MemoryReply::AcceptIds(ids) => Ok(BatchSendResponse {
            successful: ids,
            failed: Vec::new(),
        }),
        MemoryReply::Reject(e) => Err(QueueError::ServiceRejected(e)),
        MemoryReply::Fail(e) => Err(QueueError::Client(e)),
    }
}

impl QueueClient for MemoryQueueClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "memory_client_send_batch",
        skip(self, request),
        fields(client = %self.name, entries = request.entries.len())
    )]
    async fn send_batch(&self, request: &BatchSendRequest) -> Result<BatchSendResponse, QueueError> {
        self.remember(request);

        let mut gate = self.state.gate.subscribe();
        let released = gate.wait_for(|held| !*held).await.is_ok();
        debug!(client = %self.name, released, "Gate passed");

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        answer(self.next_reply(), request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Batch;
    use tokio::time::timeout;

    fn request(n: usize) -> BatchSendRequest {
        let batch: Batch = (0..n).map(|i| format!("m{i}")).collect();
        BatchSendRequest {
            queue_url: "q".into(),
            entries: batch.to_entries("g", || "t".to_string()),
        }
    }

    #[tokio::test]
    async fn test_scripted_replies_then_accept_all() {
        let client = MemoryQueueClient::new("mem");
        client.push_reply(MemoryReply::AcceptFirst(1));
        client.push_reply(MemoryReply::Fail(ClientError::Transport("down".into())));

        let first = client.send_batch(&request(3)).await.unwrap();
        assert_eq!(first.successful, vec!["0"]);
        assert_eq!(first.failed.len(), 2);

        assert!(matches!(
            client.send_batch(&request(1)).await,
            Err(QueueError::Client(ClientError::Transport(_)))
        ));

        let third = client.send_batch(&request(2)).await.unwrap();
        assert_eq!(third.accepted(), 2);
        assert_eq!(client.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_history_keeps_latest_requests() {
        let client = MemoryQueueClient::new("mem").with_history(2);

        for n in 1..=5 {
            client.send_batch(&request(n)).await.unwrap();
        }

        let sizes: Vec<_> = client.requests().iter().map(|r| r.entries.len()).collect();
        assert_eq!(sizes, vec![4, 5]);
        assert_eq!(client.request_count(), 5);
    }

    #[tokio::test]
    async fn test_hold_blocks_until_release() {
        let client = MemoryQueueClient::new("mem");
        client.hold();

        let blocked = client.clone();
        let call = tokio::spawn(async move { blocked.send_batch(&request(1)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!call.is_finished());

        client.release();
        let result = timeout(Duration::from_secs(1), call).await.unwrap().unwrap();
        assert!(result.is_ok());
    }
}
