//! Persisted gate record and its key-value encoding.
//!
//! A record is stored under three keys prefixed by the gate name:
//! `<gate>.mode`, `<gate>.queue` and `<gate>.expiry`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use qgate_store::KeyValueStore;
use qgate_types::Mode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GateError, GateResult};
use crate::queue::{Queued, Ticket};

/// Pending expiry of the message admitted under `ticket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryJob {
    pub ticket: Ticket,
    pub due_at: DateTime<Utc>,
}

/// Unit of persisted gate state.
#[derive(Debug, Clone, PartialEq)]
pub struct GateRecord {
    pub mode: Mode,
    pub queue: Vec<Queued>,
    pub expiry: Vec<ExpiryJob>,
}

impl GateRecord {
    fn keys(gate: &str) -> [String; 3] {
        [
            format!("{}.mode", gate),
            format!("{}.queue", gate),
            format!("{}.expiry", gate),
        ]
    }

    fn encode(&self, gate: &str) -> GateResult<Vec<(String, Value)>> {
        let [mode_key, queue_key, expiry_key] = Self::keys(gate);
        let queue = serde_json::to_value(&self.queue)
            .map_err(|e| GateError::Corrupt(format!("queue: {}", e)))?;
        let expiry = serde_json::to_value(&self.expiry)
            .map_err(|e| GateError::Corrupt(format!("expiry jobs: {}", e)))?;
        Ok(vec![
            (mode_key, Value::String(self.mode.to_string())),
            (queue_key, queue),
            (expiry_key, expiry),
        ])
    }

    /// Decode the values read for [`GateRecord::keys`]. A missing mode means
    /// no record has been written yet.
    fn decode(values: Vec<Option<Value>>) -> GateResult<Option<Self>> {
        let mut values = values.into_iter();
        let mode = values.next().flatten();
        let queue = values.next().flatten();
        let expiry = values.next().flatten();

        let mode = match mode {
            None => return Ok(None),
            Some(Value::String(text)) => text.parse::<Mode>().map_err(|_| {
                GateError::Config(format!("persisted mode {:?} is not a valid mode", text))
            })?,
            Some(other) => {
                return Err(GateError::Config(format!(
                    "persisted mode {} is not a valid mode",
                    other
                )))
            }
        };

        let queue = match queue {
            None | Some(Value::Null) => Vec::new(),
            Some(value @ Value::Array(_)) => serde_json::from_value(value)
                .map_err(|e| GateError::Corrupt(format!("queue: {}", e)))?,
            Some(other) => {
                return Err(GateError::Corrupt(format!(
                    "queue must be an array, got {}",
                    other
                )))
            }
        };

        let expiry = match expiry {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| GateError::Corrupt(format!("expiry jobs: {}", e)))?,
        };

        Ok(Some(Self {
            mode,
            queue,
            expiry,
        }))
    }
}

/// Reads and writes the record of one gate through a shared store.
#[derive(Clone)]
pub struct RecordStore {
    store: Arc<dyn KeyValueStore>,
    store_name: String,
    gate: String,
}

impl RecordStore {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        store_name: impl Into<String>,
        gate: impl Into<String>,
    ) -> Self {
        Self {
            store,
            store_name: store_name.into(),
            gate: gate.into(),
        }
    }

    /// Load the record, `None` if the gate has never persisted one.
    pub async fn load(&self) -> GateResult<Option<GateRecord>> {
        let keys = GateRecord::keys(&self.gate);
        let values = self.store.get(&self.store_name, &keys).await?;
        GateRecord::decode(values)
    }

    pub async fn save(&self, record: &GateRecord) -> GateResult<()> {
        let entries = record.encode(&self.gate)?;
        self.store.set(&self.store_name, entries).await?;
        Ok(())
    }
}
