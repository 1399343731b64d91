use async_trait::async_trait;
use serde_json::Value;

use crate::StoreResult;

/// External key-value persistence keyed by `(store, key)`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read several keys at once. The result has one slot per key, `None`
    /// where the key is absent.
    async fn get(&self, store: &str, keys: &[String]) -> StoreResult<Vec<Option<Value>>>;

    /// Write several entries at once.
    async fn set(&self, store: &str, entries: Vec<(String, Value)>) -> StoreResult<()>;

    /// Remove keys; absent keys are ignored.
    async fn delete(&self, store: &str, keys: &[String]) -> StoreResult<()>;
}
