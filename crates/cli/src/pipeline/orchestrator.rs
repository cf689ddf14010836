//! Bridge orchestrator - reads lines, batches them and feeds the dispatcher.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use contracts::{Batch, BridgeConfig};
use dispatcher::{Dispatcher, DispatcherBuilder, QueueClient};
use observability::{record_counters, record_pool_stats, record_rate, DispatchStatsAggregator};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

use super::{BridgeStats, LineBatcher};
use crate::error::Result;

/// Bridge run configuration
#[derive(Debug, Clone)]
pub struct BridgeRunConfig {
    /// Validated bridge configuration (CLI overrides applied)
    pub config: BridgeConfig,

    /// Stop reading after this long (None = until end of input)
    pub timeout: Option<Duration>,
}

/// Main bridge orchestrator
pub struct Bridge {
    run_config: BridgeRunConfig,
}

impl Bridge {
    pub fn new(run_config: BridgeRunConfig) -> Self {
        Self { run_config }
    }

    /// Dispatch every line of `reader` until end of input, timeout or
    /// `shutdown`, then drain the pool.
    pub async fn run<R, S>(self, reader: R, shutdown: S) -> Result<BridgeStats>
    where
        R: AsyncRead + Unpin,
        S: Future<Output = ()>,
    {
        let client = dispatcher::create_client(&self.run_config.config.queue)?;
        self.run_with_client(client, reader, shutdown).await
    }

    /// Same as `run` with an explicit queue client
    pub async fn run_with_client<C, R, S>(
        self,
        client: C,
        reader: R,
        shutdown: S,
    ) -> Result<BridgeStats>
    where
        C: QueueClient + Sync + 'static,
        R: AsyncRead + Unpin,
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let config = self.run_config.config;
        let timeout = self.run_config.timeout;
        let max_batch_size = config.ingest.max_batch_size;

        let aggregator = Arc::new(Mutex::new(DispatchStatsAggregator::new()));
        let sampler = Arc::clone(&aggregator);

        info!(client = client.name(), "Setting up dispatcher...");
        let dispatcher = DispatcherBuilder::new(config, client)
            .on_sample(move |snapshot, pool| {
                record_counters(snapshot);
                record_pool_stats(pool);
                let rate = sampler
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .update(snapshot, pool);
                record_rate(rate);
            })
            .build()?;

        let mut stats = BridgeStats::default();
        let mut batcher = LineBatcher::new(max_batch_size);
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        info!(max_batch_size, "Reading messages");

        loop {
            buf.clear();
            let read = tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => read,
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping input");
                    break;
                }
                _ = &mut deadline => {
                    warn!(timeout = ?timeout, "Run timed out, stopping input");
                    break;
                }
            };

            match read {
                Ok(0) => {
                    debug!(pending = batcher.pending(), "End of input");
                    break;
                }
                Ok(_) => {
                    let Some(line) = decode_line(&buf) else {
                        stats.invalid_lines += 1;
                        warn!(bytes = buf.len(), "Skipping line that is not valid UTF-8");
                        continue;
                    };
                    if line.trim().is_empty() {
                        stats.blank_lines += 1;
                        continue;
                    }
                    stats.lines_read += 1;
                    if let Some(batch) = batcher.push(line) {
                        submit(&dispatcher, batch, &mut stats);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Input read failed, stopping input");
                    break;
                }
            }
        }

        if let Some(batch) = batcher.flush() {
            submit(&dispatcher, batch, &mut stats);
        }

        info!(
            pending = dispatcher.pool_stats().queued,
            "Input closed, draining dispatcher..."
        );
        stats.counters = dispatcher.shutdown().await;
        stats.dispatch_metrics = aggregator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            throughput = format!("{:.2}", stats.throughput()),
            "Bridge shutdown complete"
        );

        Ok(stats)
    }
}

/// Strip the line terminator; None when the bytes are not UTF-8
fn decode_line(bytes: &[u8]) -> Option<String> {
    let line = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    std::str::from_utf8(line).ok().map(str::to_owned)
}

fn submit<C>(dispatcher: &Dispatcher<C>, batch: Batch, stats: &mut BridgeStats)
where
    C: QueueClient + Sync + 'static,
{
    dispatcher.record_inbound(batch.len() as u64);
    if dispatcher.send(batch) {
        stats.batches_submitted += 1;
    } else {
        stats.batches_refused += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ClientType, IngestConfig, PoolConfig, QueueConfig};
    use dispatcher::MemoryQueueClient;
    use std::collections::HashMap;

    fn config(max_batch_size: usize) -> BridgeConfig {
        BridgeConfig {
            version: Default::default(),
            queue: QueueConfig {
                queue_url: "https://queue.example/1/cli.fifo".into(),
                message_group_id: "cli".into(),
                client: ClientType::Memory,
                send_timeout_ms: 1000,
                params: HashMap::new(),
            },
            pool: PoolConfig {
                workers: 2,
                backlog_capacity: 64,
            },
            telemetry: Default::default(),
            retry: Default::default(),
            ingest: IngestConfig { max_batch_size },
        }
    }

    fn bridge(max_batch_size: usize) -> Bridge {
        Bridge::new(BridgeRunConfig {
            config: config(max_batch_size),
            timeout: None,
        })
    }

    #[tokio::test]
    async fn test_lines_chunked_into_batches() {
        let client = MemoryQueueClient::new("mem");
        let input = b"one\ntwo\n\nthree\nfour\nfive\n";

        let stats = bridge(2)
            .run_with_client(client.clone(), &input[..], std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.lines_read, 5);
        assert_eq!(stats.blank_lines, 1);
        assert_eq!(stats.batches_submitted, 3);
        assert_eq!(stats.batches_refused, 0);
        assert_eq!(stats.counters.inbound_received, 5);
        assert_eq!(stats.counters.succeeded, 5);

        let mut sizes: Vec<_> = client.requests().iter().map(|r| r.entries.len()).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let client = MemoryQueueClient::new("mem");
        let input = b"one\n\xff\xfe\ntwo\r\nthree";

        let stats = bridge(10)
            .run_with_client(client.clone(), &input[..], std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.invalid_lines, 1);
        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.counters.succeeded, 3);

        let requests = client.requests();
        let bodies: Vec<_> = requests[0].entries.iter().map(|e| e.body.as_str()).collect();
        assert_eq!(bodies, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_decode_line_strips_terminators() {
        assert_eq!(decode_line(b"abc\r\n").as_deref(), Some("abc"));
        assert_eq!(decode_line(b"abc").as_deref(), Some("abc"));
        assert_eq!(decode_line(b"\xc3\n"), None);
    }

    #[tokio::test]
    async fn test_run_from_config_client() {
        let stats = bridge(10)
            .run(&b"a\nb\nc"[..], std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.batches_submitted, 1);
        assert_eq!(stats.counters.attempted, 1);
        assert_eq!(stats.counters.succeeded, 3);
    }

    #[tokio::test]
    async fn test_shutdown_stops_reading() {
        let client = MemoryQueueClient::new("mem");
        let (_tx, rx) = tokio::io::duplex(64);

        let stats = bridge(10)
            .run_with_client(client, rx, async {})
            .await
            .unwrap();

        assert_eq!(stats.lines_read, 0);
        assert_eq!(stats.counters.attempted, 0);
    }
}
