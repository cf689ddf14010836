//! BatchSender - from accepted batch to classified, counted outcome

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use contracts::{
    Batch, BatchFingerprint, BatchSendRequest, ClientError, CounterName, QueueClient, QueueConfig,
    QueueError,
};

use crate::counters::CounterRegistry;
use crate::error::DispatcherError;
use crate::outcome::SendOutcome;
use crate::pool::ExecutionPool;
use crate::retry::{NextStep, RetryPolicy};

/// Per-call settings fixed at startup
#[derive(Debug, Clone)]
pub struct SendSettings {
    /// Destination queue identifier
    pub queue_url: String,
    /// Group shared by every entry of a call
    pub message_group_id: String,
    /// Upper bound on one downstream call (None = unbounded)
    pub send_timeout: Option<Duration>,
}

impl From<&QueueConfig> for SendSettings {
    fn from(config: &QueueConfig) -> Self {
        Self {
            queue_url: config.queue_url.clone(),
            message_group_id: config.message_group_id.clone(),
            send_timeout: config.send_timeout(),
        }
    }
}

/// Fresh deduplication token, one per entry per attempt
fn dedup_token() -> String {
    format!("{:016x}", rand::random::<u64>())
}

struct SendContext<C> {
    client: C,
    settings: SendSettings,
    counters: Arc<CounterRegistry>,
    retry: RetryPolicy,
}

/// Fire-and-forget batch dispatch over an `ExecutionPool`.
pub struct BatchSender<C> {
    pool: ExecutionPool,
    ctx: Arc<SendContext<C>>,
}

impl<C> BatchSender<C>
where
    C: QueueClient + Sync + 'static,
{
    pub fn new(
        client: C,
        pool: ExecutionPool,
        settings: SendSettings,
        counters: Arc<CounterRegistry>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            pool,
            ctx: Arc::new(SendContext {
                client,
                settings,
                counters,
                retry,
            }),
        }
    }

    /// Hand a batch to the pool and return immediately.
    ///
    /// Returns true if the batch was accepted, false if it was dropped
    /// (saturated or closed pool). Rejections only touch the rejected counter.
    pub fn send(&self, batch: Batch) -> bool {
        let fingerprint = batch.fingerprint();
        let ctx = Arc::clone(&self.ctx);

        let submitted = self.pool.submit(async move {
            ctx.counters.increment(CounterName::Attempted);
            ctx.deliver(batch, fingerprint).await;
        });

        match submitted {
            Ok(()) => true,
            Err(DispatcherError::PoolSaturated { capacity }) => {
                self.ctx.counters.increment(CounterName::Rejected);
                error!(
                    batch = %fingerprint,
                    capacity,
                    "Too many batches in backlog, batch rejected"
                );
                false
            }
            Err(e) => {
                self.ctx.counters.increment(CounterName::Rejected);
                error!(batch = %fingerprint, error = %e, "Batch rejected");
                false
            }
        }
    }

    /// Execution pool occupancy
    pub fn pool(&self) -> &ExecutionPool {
        &self.pool
    }

    /// Drain queued batches and stop the workers
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}

impl<C> SendContext<C>
where
    C: QueueClient + Sync,
{
    /// Send-task body: attempt, record, then follow the retry decision
    #[instrument(
        name = "batch_sender_deliver",
        skip_all,
        fields(batch = %fingerprint, size = batch.len())
    )]
    async fn deliver(&self, batch: Batch, fingerprint: BatchFingerprint) {
        let mut attempt = 1;
        loop {
            let outcome = self.attempt(&batch).await;
            self.record(&outcome, fingerprint);

            match self.retry.decide(&outcome, attempt) {
                NextStep::Done => return,
                NextStep::Retry {
                    attempt: next,
                    delay,
                } => {
                    self.counters.increment(CounterName::Retried);
                    info!(
                        batch = %fingerprint,
                        attempt = next,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying batch send"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                NextStep::Abort => {
                    self.counters.increment(CounterName::Aborted);
                    warn!(batch = %fingerprint, attempts = attempt, "Batch aborted after retries");
                    return;
                }
            }
        }
    }

    /// One downstream call with fresh entries
    async fn attempt(&self, batch: &Batch) -> SendOutcome {
        let request = BatchSendRequest {
            queue_url: self.settings.queue_url.clone(),
            entries: batch.to_entries(&self.settings.message_group_id, dedup_token),
        };

        let result = match self.settings.send_timeout {
            Some(limit) => tokio::time::timeout(limit, self.client.send_batch(&request))
                .await
                .unwrap_or_else(|_| {
                    Err(QueueError::Client(ClientError::Timeout {
                        timeout_ms: limit.as_millis() as u64,
                    }))
                }),
            None => self.client.send_batch(&request).await,
        };

        SendOutcome::classify(result, &request)
    }

    /// Update counters and log for one attempt
    fn record(&self, outcome: &SendOutcome, fingerprint: BatchFingerprint) {
        self.counters
            .add(CounterName::Succeeded, outcome.accepted() as u64);

        match outcome {
            SendOutcome::Delivered { accepted } => {
                debug!(batch = %fingerprint, accepted, "Batch delivered");
            }
            SendOutcome::PartiallyDelivered { accepted, rejected } => {
                self.counters.increment(CounterName::Failed);
                warn!(
                    batch = %fingerprint,
                    accepted,
                    rejected = rejected.len(),
                    "Batch partially rejected by queue"
                );
                for entry in rejected {
                    warn!(
                        batch = %fingerprint,
                        entry_id = %entry.id,
                        code = %entry.code,
                        sender_fault = entry.sender_fault,
                        reason = %entry.message,
                        "Entry rejected"
                    );
                }
            }
            SendOutcome::ServiceRejected(e) => {
                self.counters.increment(CounterName::Failed);
                error!(
                    batch = %fingerprint,
                    error_message = %e.message,
                    status_code = e.status_code,
                    error_code = %e.error_code,
                    category = ?e.category,
                    request_id = %e.request_id,
                    "Request reached the queue service but was rejected"
                );
            }
            SendOutcome::ClientError(e) => {
                self.counters.increment(CounterName::Failed);
                error!(
                    batch = %fingerprint,
                    error = %e,
                    "Client failed to reach the queue service"
                );
            }
        }
    }
}
