//! ExecutionPool - fixed worker set draining a bounded backlog

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use contracts::{PoolConfig, PoolStats};

use crate::error::DispatcherError;

/// Queued unit of work
pub type PoolTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug)]
struct PoolState {
    workers: AtomicUsize,
    active: AtomicUsize,
    capacity: usize,
}

/// Bounded-concurrency, bounded-backlog worker pool.
///
/// `workers` tokio tasks pull from a shared MPMC backlog. Submission never
/// waits: a full backlog fails immediately with `PoolSaturated`.
pub struct ExecutionPool {
    tx: Sender<PoolTask>,
    state: Arc<PoolState>,
    monitor: PoolMonitor,
    worker_handles: Vec<JoinHandle<()>>,
}

impl ExecutionPool {
    /// Spawn the workers. Must be called from within a tokio runtime.
    #[instrument(name = "execution_pool_new", skip(config), fields(workers = config.workers, capacity = config.backlog_capacity))]
    pub fn new(config: PoolConfig) -> Result<Self, DispatcherError> {
        if config.workers == 0 {
            return Err(DispatcherError::invalid_pool("workers must be >= 1"));
        }
        if config.backlog_capacity == 0 {
            return Err(DispatcherError::invalid_pool("backlog_capacity must be >= 1"));
        }

        let (tx, rx) = bounded::<PoolTask>(config.backlog_capacity);
        let state = Arc::new(PoolState {
            workers: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            capacity: config.backlog_capacity,
        });

        let worker_handles = (0..config.workers)
            .map(|id| {
                state.workers.fetch_add(1, Ordering::Relaxed);
                let worker_rx = rx.clone();
                let worker_state = Arc::clone(&state);
                tokio::spawn(async move {
                    pool_worker(id, worker_rx, worker_state).await;
                })
            })
            .collect();

        debug!("Execution pool started");

        Ok(Self {
            tx,
            monitor: PoolMonitor {
                rx,
                state: Arc::clone(&state),
            },
            state,
            worker_handles,
        })
    }

    /// Enqueue a task without blocking.
    ///
    /// # Errors
    /// `PoolSaturated` when the backlog is full, `PoolClosed` after shutdown.
    pub fn submit<F>(&self, task: F) -> Result<(), DispatcherError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.tx.try_send(Box::pin(task)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DispatcherError::PoolSaturated {
                capacity: self.state.capacity,
            }),
            Err(TrySendError::Closed(_)) => Err(DispatcherError::PoolClosed),
        }
    }

    /// Current occupancy
    pub fn stats(&self) -> PoolStats {
        self.monitor.stats()
    }

    /// Read-only handle for reporters
    pub fn monitor(&self) -> PoolMonitor {
        self.monitor.clone()
    }

    /// Stop accepting work, drain the backlog and wait for every worker
    #[instrument(name = "execution_pool_shutdown", skip(self))]
    pub async fn shutdown(self) {
        self.tx.close();
        for handle in self.worker_handles {
            if let Err(e) = handle.await {
                error!(error = ?e, "Pool worker panicked");
            }
        }
        debug!("Execution pool shutdown complete");
    }
}

/// Cheap, cloneable view of pool occupancy.
///
/// Holds a receiver only to read the backlog length; it never receives.
#[derive(Clone)]
pub struct PoolMonitor {
    rx: Receiver<PoolTask>,
    state: Arc<PoolState>,
}

impl PoolMonitor {
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.state.workers.load(Ordering::Relaxed),
            active: self.state.active.load(Ordering::Relaxed),
            queued: self.rx.len(),
            capacity: self.state.capacity,
        }
    }
}

/// Worker task: Queued -> Running -> Completed, one task at a time
async fn pool_worker(id: usize, rx: Receiver<PoolTask>, state: Arc<PoolState>) {
    debug!(worker = id, "Pool worker started");

    while let Ok(task) = rx.recv().await {
        state.active.fetch_add(1, Ordering::Relaxed);
        // A panicking task must not take the worker down with it
        if let Err(e) = tokio::spawn(task).await {
            error!(worker = id, error = ?e, "Pool task panicked");
        }
        state.active.fetch_sub(1, Ordering::Relaxed);
    }

    state.workers.fetch_sub(1, Ordering::Relaxed);
    debug!(worker = id, "Pool worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};
    use tokio::time::{sleep, timeout, Instant};

    fn config(workers: usize, backlog_capacity: usize) -> PoolConfig {
        PoolConfig {
            workers,
            backlog_capacity,
        }
    }

    async fn wait_for_active(pool: &ExecutionPool, active: usize) {
        timeout(Duration::from_secs(2), async {
            while pool.stats().active != active {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("pool never reached expected active count");
    }

    #[tokio::test]
    async fn test_pool_runs_tasks() {
        let pool = ExecutionPool::new(config(4, 16)).unwrap();
        let done = Arc::new(AtomicU64::new(0));

        for _ in 0..10 {
            let done = Arc::clone(&done);
            pool.submit(async move {
                done.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        }

        pool.shutdown().await;
        assert_eq!(done.load(Ordering::Relaxed), 10);
    }

    #[tokio::test]
    async fn test_pool_rejects_when_backlog_full() {
        let pool = ExecutionPool::new(config(1, 1)).unwrap();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        // occupies the single worker
        pool.submit(async move {
            let _ = release_rx.await;
        })
        .unwrap();
        wait_for_active(&pool, 1).await;

        // fills the backlog
        pool.submit(async {}).unwrap();
        assert_eq!(pool.stats().queued, 1);

        let started = Instant::now();
        let result = pool.submit(async {});
        assert!(started.elapsed() < Duration::from_millis(50));
        assert!(matches!(
            result,
            Err(DispatcherError::PoolSaturated { capacity: 1 })
        ));

        release_tx.send(()).unwrap();
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_pool_stats() {
        let pool = ExecutionPool::new(config(3, 5)).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.workers, 3);
        assert_eq!(stats.active, 0);
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.capacity, 5);

        let monitor = pool.monitor();
        pool.shutdown().await;
        assert_eq!(monitor.stats().workers, 0);
    }

    #[tokio::test]
    async fn test_pool_bounded_parallelism() {
        let pool = ExecutionPool::new(config(2, 10)).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_pool_survives_panicking_task() {
        let pool = ExecutionPool::new(config(1, 4)).unwrap();
        let (tx, mut rx) = mpsc::channel(1);

        pool.submit(async { panic!("boom") }).unwrap();
        pool.submit(async move {
            tx.send(()).await.unwrap();
        })
        .unwrap();

        let got = timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(matches!(got, Ok(Some(()))));
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_pool_rejects_invalid_config() {
        assert!(matches!(
            ExecutionPool::new(config(0, 1)),
            Err(DispatcherError::InvalidPool { .. })
        ));
        assert!(matches!(
            ExecutionPool::new(config(1, 0)),
            Err(DispatcherError::InvalidPool { .. })
        ));
    }

    #[tokio::test]
    async fn test_submit_after_close_fails() {
        let pool = ExecutionPool::new(config(1, 1)).unwrap();
        pool.tx.close();
        assert!(matches!(
            pool.submit(async {}),
            Err(DispatcherError::PoolClosed)
        ));
        pool.shutdown().await;
    }
}
