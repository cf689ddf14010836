//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::BridgeConfig;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    queue: QueueInfo,
    pool: PoolInfo,
    telemetry: TelemetryInfo,
    retry: RetryInfo,
    max_batch_size: usize,
}

#[derive(Serialize)]
struct QueueInfo {
    queue_url: String,
    message_group_id: String,
    client: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    send_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct PoolInfo {
    workers: usize,
    backlog_capacity: usize,
}

#[derive(Serialize)]
struct TelemetryInfo {
    rate_interval_ms: u64,
    pool_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

#[derive(Serialize)]
struct RetryInfo {
    policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_attempts: Option<u32>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &BridgeConfig, args: &InfoArgs) -> ConfigInfo {
    let params = if args.params {
        config.queue.params.clone().into_iter().collect()
    } else {
        BTreeMap::new()
    };

    let retry = &config.retry;
    ConfigInfo {
        version: format!("{:?}", config.version),
        queue: QueueInfo {
            queue_url: config.queue.queue_url.clone(),
            message_group_id: config.queue.message_group_id.clone(),
            client: format!("{:?}", config.queue.client),
            send_timeout_ms: config.queue.send_timeout().map(|t| t.as_millis() as u64),
            params,
        },
        pool: PoolInfo {
            workers: config.pool.workers,
            backlog_capacity: config.pool.backlog_capacity,
        },
        telemetry: TelemetryInfo {
            rate_interval_ms: config.telemetry.rate_interval_ms,
            pool_interval_ms: config.telemetry.pool_interval_ms,
            metrics_port: config.telemetry.metrics_port,
        },
        retry: RetryInfo {
            policy: format!("{:?}", retry.policy),
            max_attempts: (retry.policy == contracts::RetryPolicyKind::Backoff)
                .then_some(retry.max_attempts),
        },
        max_batch_size: config.ingest.max_batch_size,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                Queue Bridge Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📤 Queue");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ URL: {}", info.queue.queue_url);
    println!("   ├─ Message group: {}", info.queue.message_group_id);
    println!("   ├─ Client: {}", info.queue.client);
    match info.queue.send_timeout_ms {
        Some(ms) => println!("   └─ Send timeout: {}ms", ms),
        None => println!("   └─ Send timeout: none"),
    }
    if !info.queue.params.is_empty() {
        println!("      Params:");
        for (key, value) in &info.queue.params {
            println!("        {} = {}", key, value);
        }
    }

    println!("\n⚙️  Pool");
    println!("   ├─ Workers: {}", info.pool.workers);
    println!("   └─ Backlog capacity: {}", info.pool.backlog_capacity);

    println!("\n📈 Telemetry");
    println!("   ├─ Rate interval: {}ms", info.telemetry.rate_interval_ms);
    println!("   ├─ Pool interval: {}ms", info.telemetry.pool_interval_ms);
    match info.telemetry.metrics_port {
        Some(port) => println!("   └─ Prometheus port: {}", port),
        None => println!("   └─ Prometheus: disabled"),
    }

    println!("\n🔁 Retry");
    match info.retry.max_attempts {
        Some(max) => println!("   └─ {} (max {} attempts)", info.retry.policy, max),
        None => println!("   └─ {}", info.retry.policy),
    }

    println!("\nBatch size: {}", info.max_batch_size);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BridgeConfig {
        config_loader::ConfigLoader::load_from_str(
            r#"
[queue]
queue_url = "https://queue.example/1/a.fifo"
message_group_id = "g"
client = "file"
send_timeout_ms = 0

[queue.params]
path = "/tmp/out.jsonl"

[retry]
policy = "backoff"
max_attempts = 5
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap()
    }

    #[test]
    fn test_info_hides_params_by_default() {
        let args = InfoArgs {
            config: "bridge.toml".into(),
            json: true,
            params: false,
        };
        let info = build_config_info(&config(), &args);
        let json = serde_json::to_value(&info).unwrap();

        assert!(json["queue"].get("params").is_none());
        assert!(json["queue"].get("send_timeout_ms").is_none());
        assert_eq!(json["retry"]["max_attempts"], 5);
    }

    #[test]
    fn test_info_shows_params() {
        let args = InfoArgs {
            config: "bridge.toml".into(),
            json: true,
            params: true,
        };
        let info = build_config_info(&config(), &args);
        assert_eq!(info.queue.params.get("path").map(String::as_str), Some("/tmp/out.jsonl"));
    }
}
