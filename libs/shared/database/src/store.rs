use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid document key '{0}'")]
    InvalidKey(String),

    #[error("I/O error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Document '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },

    #[error("Document '{key}' has version {found}, newer than supported version {latest}")]
    FutureVersion { key: String, found: u32, latest: u32 },

    #[error("Migrating '{key}' from version {from} failed: {message}")]
    Migration { key: String, from: u32, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Keyed JSON documents. Keys are plain identifiers so that every backend can
/// map them onto its own namespace without escaping.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        validate_key(key)?;
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        validate_key(key)?;
        self.documents.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        Ok(self.documents.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.documents.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// One `<key>.json` file per document. Writes go through a temp file and a
/// rename so a reader never observes a partially written document.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| StoreError::Io {
                key: root.display().to_string(),
                source,
            })?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        validate_key(key)?;
        let path = self.document_path(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };

        let value = serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Document {} at {} failed to parse", key, path.display());
            StoreError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Some(value))
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        validate_key(key)?;
        let bytes = serde_json::to_vec_pretty(&value)?;
        let path = self.document_path(key);
        let tmp = self.root.join(format!("{}.json.tmp", key));

        let _guard = self.write_lock.lock().await;
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err)?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.document_path(key)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let io_err = |source| StoreError::Io {
            key: self.root.display().to_string(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(io_err)?;
        let mut keys = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(key) = name.strip_suffix(".json") {
                if validate_key(key).is_ok() {
                    keys.push(key.to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_round_trips_documents() {
        let store = MemoryStore::new();
        assert!(store.get("appointments").await.unwrap().is_none());

        store.put("appointments", json!([1, 2])).await.unwrap();
        assert_eq!(store.get("appointments").await.unwrap(), Some(json!([1, 2])));
        assert_eq!(store.keys().await.unwrap(), vec!["appointments".to_string()]);

        assert!(store.delete("appointments").await.unwrap());
        assert!(!store.delete("appointments").await.unwrap());
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_namespace() {
        let store = MemoryStore::new();
        assert_matches!(
            store.put("../etc/passwd", json!(null)).await,
            Err(StoreError::InvalidKey(_))
        );
        assert_matches!(store.get("").await, Err(StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        store
            .put("inventory", json!({"items": ["gauze"]}))
            .await
            .unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.get("inventory").await.unwrap(),
            Some(json!({"items": ["gauze"]}))
        );
        assert_eq!(reopened.keys().await.unwrap(), vec!["inventory".to_string()]);
        assert!(!dir.path().join("inventory.json.tmp").exists());
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("reviews.json"), b"{not json").unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        assert_matches!(
            store.get("reviews").await,
            Err(StoreError::Corrupt { key, .. }) if key == "reviews"
        );
    }
}
