//! Dispatcher - wires counters, pool, sender and reporter from config

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use contracts::{
    Batch, BatchSendRequest, BatchSendResponse, BridgeConfig, ClientType, CounterName,
    CounterSnapshot, PoolStats, QueueClient, QueueConfig, QueueError,
};

use crate::clients::{FileQueueClient, LogQueueClient, MemoryQueueClient};
use crate::counters::CounterRegistry;
use crate::error::DispatcherError;
use crate::pool::ExecutionPool;
use crate::reporter::{SampleHook, TelemetryReporter};
use crate::retry::RetryPolicy;
use crate::sender::{BatchSender, SendSettings};

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder<C> {
    config: BridgeConfig,
    client: C,
    hook: Option<SampleHook>,
}

impl<C> DispatcherBuilder<C>
where
    C: QueueClient + Sync + 'static,
{
    pub fn new(config: BridgeConfig, client: C) -> Self {
        Self {
            config,
            client,
            hook: None,
        }
    }

    /// Receive every rate-tick sample (e.g. for metrics export)
    pub fn on_sample<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CounterSnapshot, &PoolStats) + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Build and start the dispatcher. Must be called within a tokio runtime.
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(client = %self.client.name(), workers = self.config.pool.workers)
    )]
    pub fn build(self) -> Result<Dispatcher<C>, DispatcherError> {
        let counters = Arc::new(CounterRegistry::new());
        let pool = ExecutionPool::new(self.config.pool)?;

        let mut reporter =
            TelemetryReporter::new(Arc::clone(&counters), pool.monitor(), &self.config.telemetry);
        if let Some(hook) = self.hook {
            reporter = reporter.with_hook(hook);
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reporter_handle = reporter.spawn(shutdown_rx);

        let client_name = self.client.name().to_string();
        let sender = BatchSender::new(
            self.client,
            pool,
            SendSettings::from(&self.config.queue),
            Arc::clone(&counters),
            RetryPolicy::from_config(&self.config.retry),
        );

        info!(
            client = %client_name,
            queue_url = %self.config.queue.queue_url,
            workers = self.config.pool.workers,
            backlog_capacity = self.config.pool.backlog_capacity,
            retry = ?self.config.retry.policy,
            "Dispatcher started"
        );

        Ok(Dispatcher {
            client_name,
            sender,
            counters,
            reporter: reporter_handle,
            shutdown_tx,
        })
    }
}

/// Running dispatcher: accepts batches until `shutdown`
pub struct Dispatcher<C> {
    client_name: String,
    sender: BatchSender<C>,
    counters: Arc<CounterRegistry>,
    reporter: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl<C> Dispatcher<C>
where
    C: QueueClient + Sync + 'static,
{
    /// Fire-and-forget a batch; false when the pool refused it
    pub fn send(&self, batch: Batch) -> bool {
        self.sender.send(batch)
    }

    /// Count messages handed over by the upstream source
    pub fn record_inbound(&self, messages: u64) {
        self.counters.add(CounterName::InboundReceived, messages);
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Shared registry, for callers that sample on their own schedule
    pub fn registry(&self) -> Arc<CounterRegistry> {
        Arc::clone(&self.counters)
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.sender.pool().stats()
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Stop accepting batches, drain the backlog, stop the reporter.
    ///
    /// Returns the final counter values.
    #[instrument(name = "dispatcher_shutdown", skip(self), fields(client = %self.client_name))]
    pub async fn shutdown(self) -> CounterSnapshot {
        self.sender.shutdown().await;

        self.shutdown_tx.send_replace(true);
        if let Err(e) = self.reporter.await {
            error!(error = ?e, "Telemetry reporter panicked");
        }

        let snapshot = self.counters.snapshot();
        info!(
            attempted = snapshot.attempted,
            succeeded = snapshot.succeeded,
            failed = snapshot.failed,
            rejected = snapshot.rejected,
            "Dispatcher shutdown complete"
        );
        snapshot
    }
}

/// Queue client selected by `queue.client`
pub enum AnyQueueClient {
    Log(LogQueueClient),
    File(FileQueueClient),
    Memory(MemoryQueueClient),
}

impl QueueClient for AnyQueueClient {
    fn name(&self) -> &str {
        match self {
            AnyQueueClient::Log(c) => c.name(),
            AnyQueueClient::File(c) => c.name(),
            AnyQueueClient::Memory(c) => c.name(),
        }
    }

    async fn send_batch(&self, request: &BatchSendRequest) -> Result<BatchSendResponse, QueueError> {
        match self {
            AnyQueueClient::Log(c) => c.send_batch(request).await,
            AnyQueueClient::File(c) => c.send_batch(request).await,
            AnyQueueClient::Memory(c) => c.send_batch(request).await,
        }
    }
}

/// Create the queue client named by configuration
#[instrument(name = "dispatcher_create_client", skip(config), fields(client = ?config.client))]
pub fn create_client(config: &QueueConfig) -> Result<AnyQueueClient, DispatcherError> {
    let client = match config.client {
        ClientType::Log => AnyQueueClient::Log(LogQueueClient::new("log")),
        ClientType::File => AnyQueueClient::File(
            FileQueueClient::from_params("file", &config.params)
                .map_err(|e| DispatcherError::client_creation("file", e.to_string()))?,
        ),
        ClientType::Memory => AnyQueueClient::Memory(MemoryQueueClient::new("memory")),
    };
    debug!(client = client.name(), "Queue client created");
    Ok(client)
}

/// Convenience function to create a dispatcher from a full config
#[instrument(name = "dispatcher_create", skip(config))]
pub fn create_dispatcher(config: BridgeConfig) -> Result<Dispatcher<AnyQueueClient>, DispatcherError> {
    let client = create_client(&config.queue)?;
    DispatcherBuilder::new(config, client).build()
}
