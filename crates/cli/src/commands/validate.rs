//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{BridgeConfig, ClientType, RetryPolicyKind};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    queue_url: String,
    client: String,
    workers: usize,
    backlog_capacity: usize,
    max_batch_size: usize,
    retry: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    queue_url: config.queue.queue_url.clone(),
                    client: format!("{:?}", config.queue.client),
                    workers: config.pool.workers,
                    backlog_capacity: config.pool.backlog_capacity,
                    max_batch_size: config.ingest.max_batch_size,
                    retry: format!("{:?}", config.retry.policy),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BridgeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.queue.client != ClientType::File && !config.queue.params.is_empty() {
        warnings.push(format!(
            "queue.params is ignored by the {:?} client",
            config.queue.client
        ));
    }

    if config.queue.send_timeout().is_none() {
        warnings.push("queue.send_timeout_ms = 0 - a hung call occupies a worker forever".to_string());
    }

    if config.pool.backlog_capacity < config.pool.workers {
        warnings.push(format!(
            "pool.backlog_capacity ({}) is smaller than pool.workers ({}) - bursts will be rejected",
            config.pool.backlog_capacity, config.pool.workers
        ));
    }

    if config.retry.policy == RetryPolicyKind::Never {
        warnings.push("retry.policy = never - throttled or failed batches are lost".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Queue: {}", summary.queue_url);
            println!("  Client: {}", summary.client);
            println!(
                "  Pool: {} workers, backlog {}",
                summary.workers, summary.backlog_capacity
            );
            println!("  Batch size: {}", summary.max_batch_size);
            println!("  Retry: {}", summary.retry);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
