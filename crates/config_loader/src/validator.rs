//! 配置校验模块
//!
//! 校验规则：
//! - queue_url / message_group_id 非空
//! - file 客户端必须提供 params.path
//! - workers >= 1, backlog_capacity >= 1
//! - 遥测周期 > 0
//! - max_batch_size 在 1..=10
//! - backoff: max_attempts >= 1, initial_delay_ms <= max_delay_ms

use contracts::{BridgeConfig, ClientType, ContractError, RetryPolicyKind, MAX_BATCH_ENTRIES};

/// 校验 BridgeConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &BridgeConfig) -> Result<(), ContractError> {
    validate_queue(config)?;
    validate_pool(config)?;
    validate_telemetry(config)?;
    validate_retry(config)?;
    validate_ingest(config)?;
    Ok(())
}

/// 校验目标队列
fn validate_queue(config: &BridgeConfig) -> Result<(), ContractError> {
    let queue = &config.queue;

    if queue.queue_url.trim().is_empty() {
        return Err(ContractError::config_validation(
            "queue.queue_url",
            "queue_url cannot be empty",
        ));
    }
    if queue.message_group_id.trim().is_empty() {
        return Err(ContractError::config_validation(
            "queue.message_group_id",
            "message_group_id cannot be empty",
        ));
    }
    if queue.client == ClientType::File && !queue.params.contains_key("path") {
        return Err(ContractError::config_validation(
            "queue.params.path",
            "file client requires a 'path' parameter",
        ));
    }
    Ok(())
}

/// 校验执行池
fn validate_pool(config: &BridgeConfig) -> Result<(), ContractError> {
    let pool = &config.pool;

    if pool.workers == 0 {
        return Err(ContractError::config_validation(
            "pool.workers",
            "workers must be >= 1",
        ));
    }
    if pool.backlog_capacity == 0 {
        return Err(ContractError::config_validation(
            "pool.backlog_capacity",
            "backlog_capacity must be >= 1",
        ));
    }
    Ok(())
}

/// 校验遥测周期
fn validate_telemetry(config: &BridgeConfig) -> Result<(), ContractError> {
    let telemetry = &config.telemetry;

    if telemetry.rate_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "telemetry.rate_interval_ms",
            "rate_interval_ms must be > 0",
        ));
    }
    if telemetry.pool_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "telemetry.pool_interval_ms",
            "pool_interval_ms must be > 0",
        ));
    }
    Ok(())
}

/// 校验重试策略 (仅 backoff 生效)
fn validate_retry(config: &BridgeConfig) -> Result<(), ContractError> {
    let retry = &config.retry;
    if retry.policy == RetryPolicyKind::Never {
        return Ok(());
    }

    if retry.max_attempts == 0 {
        return Err(ContractError::config_validation(
            "retry.max_attempts",
            "max_attempts must be >= 1",
        ));
    }
    if retry.initial_delay_ms > retry.max_delay_ms {
        return Err(ContractError::config_validation(
            "retry.initial_delay_ms / retry.max_delay_ms",
            format!(
                "initial_delay_ms ({}) must be <= max_delay_ms ({})",
                retry.initial_delay_ms, retry.max_delay_ms
            ),
        ));
    }
    Ok(())
}

/// 校验输入批次大小
fn validate_ingest(config: &BridgeConfig) -> Result<(), ContractError> {
    let size = config.ingest.max_batch_size;
    if size == 0 || size > MAX_BATCH_ENTRIES {
        return Err(ContractError::config_validation(
            "ingest.max_batch_size",
            format!("max_batch_size must be in 1..={MAX_BATCH_ENTRIES}, got {size}"),
        ));
    }
    Ok(())
}
