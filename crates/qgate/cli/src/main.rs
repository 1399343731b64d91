//! qgate - flow-control gate host
//!
//! Runs one gate over newline-delimited JSON:
//! - messages are read from stdin, one object per line
//! - emissions are written to stdout, one JSON value per line
//! - status changes and diagnostics go to the log on stderr

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use qgate_engine::GateBuilder;
use qgate_store::{InMemoryStore, JsonFileStore, KeyValueStore};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod host;

use config::{HostConfig, StorageConfig};

/// qgate CLI
#[derive(Parser)]
#[command(name = "qgate")]
#[command(about = "qgate - flow-control gate over JSON lines", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "QGATE_CONFIG")]
    config: Option<String>,

    /// Gate name, overriding the configuration
    #[arg(short, long, env = "QGATE_NAME")]
    name: Option<String>,

    /// Persist gate state as JSON files in this directory
    #[arg(long, env = "QGATE_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "QGATE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "QGATE_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries emissions only.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Load configuration
    let mut config =
        HostConfig::load(cli.config.as_deref()).context("loading configuration")?;

    // Override with CLI args
    if let Some(name) = cli.name {
        config.gate.name = name;
    }
    if let Some(dir) = cli.store_dir {
        config.storage = StorageConfig::File { dir };
        config.gate.persistence.enabled = true;
    }

    let store: Arc<dyn KeyValueStore> = match &config.storage {
        StorageConfig::Memory => Arc::new(InMemoryStore::new()),
        StorageConfig::File { dir } => Arc::new(JsonFileStore::new(dir.clone())),
    };

    let gate = GateBuilder::new(config.gate.clone())
        .with_store(store)
        .with_mailbox_capacity(config.mailbox_capacity)
        .spawn()
        .await
        .context("starting gate")?;

    let watcher = tokio::spawn(host::watch_status(
        gate.name().to_string(),
        gate.status(),
    ));

    let input = BufReader::new(tokio::io::stdin());
    // None when interrupted; the pump's counters are dropped with it.
    let stats = tokio::select! {
        result = host::pump(&gate, input, tokio::io::stdout()) => Some(result?),
        _ = tokio::signal::ctrl_c() => None,
    };

    gate.shutdown().await?;
    watcher.abort();

    match stats {
        Some(stats) => info!(
            gate = %gate.name(),
            received = stats.received,
            emitted = stats.emitted,
            rejected = stats.rejected,
            "Input finished"
        ),
        None => info!(gate = %gate.name(), "Interrupted"),
    }
    Ok(())
}
