//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info, warn};

use contracts::BridgeConfig;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Bridge, BridgeRunConfig};

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        queue_url = %config.queue.queue_url,
        group_id = %config.queue.message_group_id,
        client = ?config.queue.client,
        workers = config.pool.workers,
        backlog_capacity = config.pool.backlog_capacity,
        max_batch_size = config.ingest.max_batch_size,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    if let Some(port) = observability::init_metrics(&config.telemetry)
        .map_err(|e| CliError::metrics(format!("{e:#}")))?
    {
        info!("Metrics endpoint available on port {}", port);
    }

    let run_config = BridgeRunConfig {
        config,
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
    };
    let bridge = Bridge::new(run_config);

    info!("Starting bridge...");

    let stats = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| CliError::input_open(path, e))?;
            bridge.run(file, shutdown_signal()).await
        }
        None => bridge.run(tokio::io::stdin(), shutdown_signal()).await,
    }
    .context("Bridge execution failed")?;

    info!(
        lines = stats.lines_read,
        succeeded = stats.counters.succeeded,
        refused = stats.batches_refused,
        duration_secs = stats.duration.as_secs_f64(),
        "Bridge completed"
    );
    stats.print_summary();

    Ok(())
}

fn apply_overrides(config: &mut BridgeConfig, args: &RunArgs) {
    if let Some(ref url) = args.queue_url {
        info!(queue_url = %url, "Overriding queue URL from CLI");
        config.queue.queue_url = url.clone();
    }
    if let Some(workers) = args.workers {
        info!(workers, "Overriding worker count from CLI");
        config.pool.workers = workers;
    }
    if let Some(capacity) = args.backlog_capacity {
        info!(capacity, "Overriding backlog capacity from CLI");
        config.pool.backlog_capacity = capacity;
    }
    if let Some(size) = args.batch_size {
        info!(size, "Overriding batch size from CLI");
        config.ingest.max_batch_size = size;
    }
    if let Some(port) = args.metrics_port {
        config.telemetry.metrics_port = (port != 0).then_some(port);
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Shutdown signal received");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &BridgeConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Queue:");
    println!("  URL: {}", config.queue.queue_url);
    println!("  Message group: {}", config.queue.message_group_id);
    println!("  Client: {:?}", config.queue.client);
    match config.queue.send_timeout() {
        Some(timeout) => println!("  Send timeout: {}ms", timeout.as_millis()),
        None => println!("  Send timeout: none"),
    }
    println!("\nPool:");
    println!("  Workers: {}", config.pool.workers);
    println!("  Backlog capacity: {}", config.pool.backlog_capacity);
    println!("\nRetry: {:?}", config.retry.policy);
    println!("Batch size: {}", config.ingest.max_batch_size);
    println!();
}
