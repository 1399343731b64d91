//! JSON-file key-value store.
//!
//! Each store name maps to one JSON object document `<root>/<store>.json`.
//! Writes are atomic (write to `.tmp`, then rename) so an interrupted write
//! never leaves a truncated document behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::traits::KeyValueStore;
use crate::{StoreError, StoreResult};

/// File-backed store rooted at a directory.
pub struct JsonFileStore {
    root: PathBuf,
    /// One lock per store document, serializing read-modify-write cycles.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl JsonFileStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: DashMap::new(),
        }
    }

    fn document_path(&self, store: &str) -> StoreResult<PathBuf> {
        let valid = !store.is_empty()
            && store
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !store.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidStoreName(store.to_string()));
        }
        Ok(self.root.join(format!("{}.json", store)))
    }

    fn lock_for(&self, store: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(store.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn read_document(path: &Path) -> StoreResult<Map<String, Value>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => match serde_json::from_str(&contents)? {
                Value::Object(map) => Ok(map),
                _ => Err(StoreError::Serialization(format!(
                    "{} does not hold a JSON object",
                    path.display()
                ))),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document(&self, path: &Path, document: &Map<String, Value>) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let json = serde_json::to_string_pretty(document)?;

        // Atomic write: write to .tmp then rename
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        debug!(path = %path.display(), entries = document.len(), "store document written");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, store: &str, keys: &[String]) -> StoreResult<Vec<Option<Value>>> {
        let path = self.document_path(store)?;
        let lock = self.lock_for(store);
        let _guard = lock.lock().await;

        let document = Self::read_document(&path).await?;
        Ok(keys.iter().map(|key| document.get(key).cloned()).collect())
    }

    async fn set(&self, store: &str, entries: Vec<(String, Value)>) -> StoreResult<()> {
        let path = self.document_path(store)?;
        let lock = self.lock_for(store);
        let _guard = lock.lock().await;

        let mut document = Self::read_document(&path).await?;
        for (key, value) in entries {
            document.insert(key, value);
        }
        self.write_document(&path, &document).await
    }

    async fn delete(&self, store: &str, keys: &[String]) -> StoreResult<()> {
        let path = self.document_path(store)?;
        let lock = self.lock_for(store);
        let _guard = lock.lock().await;

        let mut document = Self::read_document(&path).await?;
        let before = document.len();
        for key in keys {
            document.remove(key);
        }
        if document.len() == before {
            return Ok(());
        }
        self.write_document(&path, &document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn missing_document_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let values = store.get("default", &keys(&["a"])).await.unwrap();
        assert_eq!(values, vec![None]);
    }

    #[tokio::test]
    async fn values_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileStore::new(dir.path());
            store
                .set(
                    "gates",
                    vec![
                        ("line.mode".into(), json!("queueing")),
                        ("line.queue".into(), json!([{"payload": 1}])),
                    ],
                )
                .await
                .unwrap();
        }

        let store = JsonFileStore::new(dir.path());
        let values = store
            .get("gates", &keys(&["line.mode", "line.queue"]))
            .await
            .unwrap();
        assert_eq!(values[0], Some(json!("queueing")));
        assert_eq!(values[1], Some(json!([{"payload": 1}])));
        assert!(!dir.path().join("gates.json.tmp").exists());
    }

    #[tokio::test]
    async fn set_merges_with_existing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.set("s", vec![("a".into(), json!(1))]).await.unwrap();
        store.set("s", vec![("b".into(), json!(2))]).await.unwrap();
        store.delete("s", &keys(&["a"])).await.unwrap();

        let values = store.get("s", &keys(&["a", "b"])).await.unwrap();
        assert_eq!(values, vec![None, Some(json!(2))]);
    }

    #[tokio::test]
    async fn path_like_store_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let err = store.get("../escape", &keys(&["a"])).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidStoreName(_)));
    }

    #[tokio::test]
    async fn corrupt_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "[1, 2").unwrap();
        let store = JsonFileStore::new(dir.path());
        let err = store.get("bad", &keys(&["a"])).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
