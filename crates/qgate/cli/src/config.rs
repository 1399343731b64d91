//! Configuration for the qgate host

use std::path::PathBuf;

use qgate_engine::DEFAULT_MAILBOX_CAPACITY;
use qgate_types::GateConfig;
use serde::{Deserialize, Serialize};

/// Main host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// The hosted gate
    #[serde(default)]
    pub gate: GateConfig,

    /// Backend for persisted gate state
    #[serde(default)]
    pub storage: StorageConfig,

    /// Events buffered per gate mailbox
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            storage: StorageConfig::default(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Process memory; state is lost on exit
    Memory,

    /// One JSON document per store name under `dir`
    File { dir: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory
    }
}

// Default value helpers
fn default_mailbox_capacity() -> usize {
    DEFAULT_MAILBOX_CAPACITY
}

impl HostConfig {
    /// Load configuration: built-in defaults, then the optional file, then
    /// `QGATE_` environment variables (`QGATE_GATE__TTL_MS=500`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&HostConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("QGATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
