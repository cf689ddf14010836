//! LogQueueClient - logs batch summaries via tracing and accepts everything

use contracts::{BatchSendRequest, BatchSendResponse, QueueClient, QueueError};
use tracing::{info, instrument};

/// Client that logs call summaries instead of reaching a queue
pub struct LogQueueClient {
    name: String,
}

impl LogQueueClient {
    /// Create a new LogQueueClient with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_request_summary(&self, request: &BatchSendRequest) {
        let bytes: usize = request.entries.iter().map(|e| e.body.len()).sum();
        let group = request
            .entries
            .first()
            .map(|e| e.group_id.as_str())
            .unwrap_or_default();

        info!(
            client = %self.name,
            queue_url = %request.queue_url,
            group_id = group,
            entries = request.entries.len(),
            bytes,
            "Batch send request"
        );
    }
}

impl QueueClient for LogQueueClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_client_send_batch",
        skip(self, request),
        fields(client = %self.name, entries = request.entries.len())
    )]
    async fn send_batch(&self, request: &BatchSendRequest) -> Result<BatchSendResponse, QueueError> {
        self.log_request_summary(request);
        Ok(BatchSendResponse::accept_all(request))
    }
}
