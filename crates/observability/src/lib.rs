//! # Observability
//!
//! 可观测性模块：Tracing 日志 + Prometheus 指标。
//!
//! ## 功能
//!
//! - 日志订阅者构建 (JSON/Pretty/Compact 格式，可指定输出目标)
//! - 按 `[telemetry] metrics_port` 启动 Prometheus 导出 (`queue_bridge_*`)
//! - 计数器快照与执行池占用的统计
//!
//! ## 使用示例
//!
//! ```ignore
//! observability::init_logging(&LogConfig::default())?;
//! observability::init_metrics(&config.telemetry)?;
//!
//! // 每个 rate tick 导出一次
//! observability::record_counters(&dispatcher.counters());
//! observability::record_pool_stats(&dispatcher.pool_stats());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use contracts::TelemetryConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

// Re-exports
pub use crate::metrics::{
    counter_metric_name, record_counters, record_pool_stats, record_rate, DispatchStatsAggregator,
    MetricsSummary, RunningStats, StatsSummary,
};

/// 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志格式
    pub format: LogFormat,
    /// 未设置 RUST_LOG 时使用的日志级别
    pub default_level: String,
    /// 是否输出 ANSI 颜色 (JSON 格式忽略)
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            default_level: "info".to_string(),
            ansi: true,
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 构建日志订阅者，输出到 `writer`。
///
/// 过滤规则优先取 RUST_LOG，否则使用 `default_level`。
pub fn subscriber<W>(config: &LogConfig, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_ansi(config.ansi)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_ansi(config.ansi)
            .with_writer(writer)
            .boxed(),
    };

    Box::new(tracing_subscriber::registry().with(filter).with(layer))
}

/// 安装全局日志订阅者 (stdout)
pub fn init_logging(config: &LogConfig) -> Result<()> {
    subscriber(config, std::io::stdout)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(
        log_format = ?config.format,
        default_level = %config.default_level,
        "Logging initialized"
    );
    Ok(())
}

/// 按遥测配置启动 Prometheus 导出。
///
/// 未配置 `metrics_port` 时不做任何事，返回 `None`。
pub fn init_metrics(telemetry: &TelemetryConfig) -> Result<Option<u16>> {
    let Some(port) = telemetry.metrics_port else {
        return Ok(None);
    };

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(Some(port))
}
