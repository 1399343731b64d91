//! In-memory key-value store for development and testing.
//!
//! Entries live for the lifetime of the process. Cloning the store shares the
//! underlying map, which lets a test "restart" a gate against the same data.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::traits::KeyValueStore;
use crate::StoreResult;

/// In-memory store implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    /// Values indexed by (store, key).
    entries: Arc<DashMap<(String, String), Value>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all stores.
    pub fn total_count(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, store: &str, keys: &[String]) -> StoreResult<Vec<Option<Value>>> {
        Ok(keys
            .iter()
            .map(|key| {
                self.entries
                    .get(&(store.to_string(), key.clone()))
                    .map(|entry| entry.value().clone())
            })
            .collect())
    }

    async fn set(&self, store: &str, entries: Vec<(String, Value)>) -> StoreResult<()> {
        for (key, value) in entries {
            self.entries.insert((store.to_string(), key), value);
        }
        Ok(())
    }

    async fn delete(&self, store: &str, keys: &[String]) -> StoreResult<()> {
        for key in keys {
            self.entries.remove(&(store.to_string(), key.clone()));
        }
        Ok(())
    }
}
