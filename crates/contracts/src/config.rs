//! BridgeConfig - Config Loader 输出
//!
//! 描述完整的桥接配置：目标队列、执行池、遥测、重试策略、输入批次。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的桥接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 目标队列
    pub queue: QueueConfig,

    /// 执行池
    #[serde(default)]
    pub pool: PoolConfig,

    /// 遥测上报
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// 重试策略
    #[serde(default)]
    pub retry: RetryConfig,

    /// 输入批次
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// 目标队列配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// 队列标识 (e.g., SQS queue URL)
    pub queue_url: String,

    /// 消息组 ID，同一次调用的所有条目共享
    pub message_group_id: String,

    /// 客户端类型
    #[serde(default)]
    pub client: ClientType,

    /// 单次发送超时 (毫秒)，0 = 不限
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl QueueConfig {
    /// Send timeout, `None` when disabled
    pub fn send_timeout(&self) -> Option<Duration> {
        (self.send_timeout_ms > 0).then(|| Duration::from_millis(self.send_timeout_ms))
    }
}

fn default_send_timeout_ms() -> u64 {
    30_000
}

/// 队列客户端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    /// 日志输出
    #[default]
    Log,
    /// JSON Lines 文件输出
    File,
    /// 进程内记录
    Memory,
}

/// 执行池配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// 工作协程数量
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// 积压队列容量
    #[serde(default = "default_backlog_capacity")]
    pub backlog_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            backlog_capacity: default_backlog_capacity(),
        }
    }
}

fn default_workers() -> usize {
    10
}

fn default_backlog_capacity() -> usize {
    1000
}

/// 遥测配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// 速率采样周期 (毫秒)
    #[serde(default = "default_rate_interval_ms")]
    pub rate_interval_ms: u64,

    /// 执行池占用上报周期 (毫秒)
    #[serde(default = "default_pool_interval_ms")]
    pub pool_interval_ms: u64,

    /// Prometheus 端口 (None = 禁用)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl TelemetryConfig {
    pub fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }

    pub fn pool_interval(&self) -> Duration {
        Duration::from_millis(self.pool_interval_ms)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            rate_interval_ms: default_rate_interval_ms(),
            pool_interval_ms: default_pool_interval_ms(),
            metrics_port: None,
        }
    }
}

fn default_rate_interval_ms() -> u64 {
    1_000
}

fn default_pool_interval_ms() -> u64 {
    30_000
}

/// 重试策略类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicyKind {
    /// 不重试 (失败即计数)
    #[default]
    Never,
    /// 指数退避重试
    Backoff,
}

/// 重试配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub policy: RetryPolicyKind,

    /// 最大尝试次数 (含首次)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// 首次重试延迟 (毫秒)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// 重试延迟上限 (毫秒)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            policy: RetryPolicyKind::default(),
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5_000
}

/// Largest batch a single downstream call accepts
pub const MAX_BATCH_ENTRIES: usize = 10;

/// 输入批次配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// 单批最大消息数
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
        }
    }
}

fn default_max_batch_size() -> usize {
    MAX_BATCH_ENTRIES
}
