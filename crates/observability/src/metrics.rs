//! Dispatch 指标收集模块
//!
//! 基于 CounterSnapshot / PoolStats 导出和统计分发器的运行指标。

use contracts::{CounterName, CounterSnapshot, PoolStats};
use metrics::{counter, gauge, histogram};

/// Prometheus 指标名
pub fn counter_metric_name(name: CounterName) -> &'static str {
    match name {
        CounterName::InboundReceived => "queue_bridge_inbound_received_total",
        CounterName::Attempted => "queue_bridge_batches_attempted_total",
        CounterName::Succeeded => "queue_bridge_messages_succeeded_total",
        CounterName::Failed => "queue_bridge_send_failed_total",
        CounterName::Aborted => "queue_bridge_batches_aborted_total",
        CounterName::Retried => "queue_bridge_send_retried_total",
        CounterName::Rejected => "queue_bridge_batches_rejected_total",
    }
}

/// 从 CounterSnapshot 记录指标
///
/// 计数器单调递增，直接以绝对值写入。每个 rate tick 调用一次。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::{record_counters, record_pool_stats};
///
/// DispatcherBuilder::new(config, client)
///     .on_sample(|snapshot, pool| {
///         record_counters(snapshot);
///         record_pool_stats(pool);
///     })
///     .build()?;
/// ```
pub fn record_counters(snapshot: &CounterSnapshot) {
    for name in CounterName::ALL {
        counter!(counter_metric_name(name)).absolute(snapshot.get(name));
    }
}

/// 记录执行池占用
pub fn record_pool_stats(stats: &PoolStats) {
    gauge!("queue_bridge_pool_workers").set(stats.workers as f64);
    gauge!("queue_bridge_pool_active").set(stats.active as f64);
    gauge!("queue_bridge_pool_queued").set(stats.queued as f64);
    gauge!("queue_bridge_pool_capacity").set(stats.capacity as f64);
}

/// 记录单个 tick 的吞吐 (消息数 / 间隔)
pub fn record_rate(rate: u64) {
    histogram!("queue_bridge_rate_per_interval").record(rate as f64);
}

/// 分发指标聚合器
///
/// 在内存中聚合每个 tick 的采样，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// 采样次数
    pub samples: u64,

    /// 最近一次计数器快照
    pub last: CounterSnapshot,

    /// 每个间隔成功消息数统计
    pub rate_stats: RunningStats,

    /// 积压深度统计
    pub backlog_stats: RunningStats,

    /// 活跃 worker 统计
    pub active_stats: RunningStats,
}

impl DispatchStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计，返回本次间隔的成功数
    pub fn update(&mut self, snapshot: &CounterSnapshot, pool: &PoolStats) -> u64 {
        let rate = snapshot.succeeded.saturating_sub(self.last.succeeded);
        self.samples += 1;
        self.last = *snapshot;

        self.rate_stats.push(rate as f64);
        self.backlog_stats.push(pool.queued as f64);
        self.active_stats.push(pool.active as f64);
        rate
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let last = &self.last;
        let batches = last.attempted + last.rejected;
        MetricsSummary {
            counters: *last,
            rejection_rate: if batches > 0 {
                last.rejected as f64 / batches as f64 * 100.0
            } else {
                0.0
            },
            failure_rate: if last.attempted > 0 {
                last.failed as f64 / last.attempted as f64 * 100.0
            } else {
                0.0
            },
            rate: StatsSummary::from(&self.rate_stats),
            backlog: StatsSummary::from(&self.backlog_stats),
            active_workers: StatsSummary::from(&self.active_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub counters: CounterSnapshot,
    /// 被拒绝批次占提交批次的百分比
    pub rejection_rate: f64,
    /// 失败调用占已执行批次的百分比
    pub failure_rate: f64,
    pub rate: StatsSummary,
    pub backlog: StatsSummary,
    pub active_workers: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = &self.counters;
        writeln!(f, "=== Dispatch Metrics Summary ===")?;
        writeln!(f, "Inbound messages: {}", c.inbound_received)?;
        writeln!(
            f,
            "Batches attempted: {}, rejected: {} ({:.2}%)",
            c.attempted, c.rejected, self.rejection_rate
        )?;
        writeln!(f, "Messages succeeded: {}", c.succeeded)?;
        writeln!(
            f,
            "Failed calls: {} ({:.2}%)",
            c.failed, self.failure_rate
        )?;
        writeln!(f, "Retried: {}, aborted: {}", c.retried, c.aborted)?;
        writeln!(f, "Rate (msgs/interval): {}", self.rate)?;
        writeln!(f, "Backlog depth: {}", self.backlog)?;
        writeln!(f, "Active workers: {}", self.active_workers)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
