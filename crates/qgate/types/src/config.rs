//! Configuration surface of one gate instance.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::CommandVocabulary;
use crate::error::{TypesError, TypesResult};
use crate::mode::{Mode, ToggleMode};

/// Configuration for a single gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Gate identity; also the key prefix for persisted state.
    #[serde(default = "default_name")]
    pub name: String,

    /// Value of the control field that marks a message as a command.
    #[serde(default = "default_control_topic")]
    pub control_topic: String,

    /// Names of the message fields the gate reads.
    #[serde(default)]
    pub fields: FieldNames,

    /// Command tokens.
    #[serde(default)]
    pub commands: CommandVocabulary,

    /// Mode at first start and after the `default` command.
    #[serde(default = "default_mode")]
    pub default_mode: Mode,

    /// Behavior of the `toggle` command.
    #[serde(default)]
    pub toggle: ToggleMode,

    /// Maximum queue length; zero or negative means unbounded.
    #[serde(default = "default_max_queue_length")]
    pub max_queue_length: i64,

    /// At capacity, evict the oldest message to admit the newest.
    #[serde(default)]
    pub keep_newest: bool,

    /// Persistence of mode and queue across restarts.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Time-to-live of queued messages in milliseconds; zero disables expiry.
    #[serde(default)]
    pub ttl_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            control_topic: default_control_topic(),
            fields: FieldNames::default(),
            commands: CommandVocabulary::default(),
            default_mode: default_mode(),
            toggle: ToggleMode::default(),
            max_queue_length: default_max_queue_length(),
            keep_newest: false,
            persistence: PersistenceConfig::default(),
            ttl_ms: 0,
        }
    }
}

impl GateConfig {
    /// Normalize tokens and check required values.
    pub fn validate(mut self) -> TypesResult<Self> {
        if self.name.trim().is_empty() {
            return Err(TypesError::InvalidConfig("gate name is empty".into()));
        }
        self.control_topic = self.control_topic.trim().to_lowercase();
        if self.control_topic.is_empty() {
            return Err(TypesError::InvalidConfig("control topic is empty".into()));
        }
        self.fields.check()?;
        self.commands.normalize()?;
        if self.persistence.enabled && self.persistence.store_name.trim().is_empty() {
            return Err(TypesError::InvalidConfig(
                "persistence is enabled but the store name is empty".into(),
            ));
        }
        Ok(self)
    }

    pub fn capacity(&self) -> Capacity {
        Capacity::from_limit(self.max_queue_length)
    }

    /// Message time-to-live, if expiry is enabled.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_ms > 0).then(|| Duration::from_millis(self.ttl_ms))
    }
}

/// Names of the message fields consumed by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    #[serde(default = "default_control_field")]
    pub control: String,

    #[serde(default = "default_payload_field")]
    pub payload: String,

    #[serde(default = "default_id_field")]
    pub id: String,

    /// Field of a renege command holding the filter object.
    #[serde(default = "default_filter_field")]
    pub filter: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            control: default_control_field(),
            payload: default_payload_field(),
            id: default_id_field(),
            filter: default_filter_field(),
        }
    }
}

impl FieldNames {
    fn check(&self) -> TypesResult<()> {
        for (role, name) in [
            ("control", &self.control),
            ("payload", &self.payload),
            ("id", &self.id),
            ("filter", &self.filter),
        ] {
            if name.is_empty() {
                return Err(TypesError::InvalidConfig(format!(
                    "{} field name is empty",
                    role
                )));
            }
        }
        Ok(())
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Name of the store the record lives in.
    #[serde(default = "default_store_name")]
    pub store_name: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            store_name: default_store_name(),
        }
    }
}

/// Queue capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Bounded(usize),
    Unbounded,
}

impl Capacity {
    /// Interpret a configured limit; zero or negative is unbounded.
    pub fn from_limit(limit: i64) -> Self {
        if limit <= 0 {
            Capacity::Unbounded
        } else {
            Capacity::Bounded(usize::try_from(limit).unwrap_or(usize::MAX))
        }
    }

    pub fn has_headroom(&self, len: usize) -> bool {
        match self {
            Capacity::Bounded(max) => len < *max,
            Capacity::Unbounded => true,
        }
    }
}

// Default value helpers
fn default_name() -> String {
    "gate".to_string()
}

fn default_control_topic() -> String {
    "control".to_string()
}

fn default_mode() -> Mode {
    Mode::Open
}

fn default_max_queue_length() -> i64 {
    100
}

fn default_control_field() -> String {
    "topic".to_string()
}

fn default_payload_field() -> String {
    "payload".to_string()
}

fn default_id_field() -> String {
    "_msgid".to_string()
}

fn default_filter_field() -> String {
    "filter".to_string()
}

fn default_store_name() -> String {
    "default".to_string()
}
