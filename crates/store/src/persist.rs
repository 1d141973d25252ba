//! Key-value persistence for the form defaults and remix stores.
//!
//! Each store owns one named slot. The slot value is a JSON envelope
//! `{"state": ..., "version": ...}`; a slot whose version does not match
//! the store's current schema version is ignored on hydration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid slot name: {0}")]
    InvalidSlot(String),
}

/// String-valued storage addressed by slot name.
#[async_trait]
pub trait PersistStorage: Send + Sync {
    async fn get_item(&self, name: &str) -> Result<Option<String>, PersistError>;
    async fn set_item(&self, name: &str, value: String) -> Result<(), PersistError>;
    async fn remove_item(&self, name: &str) -> Result<(), PersistError>;
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// On-disk shape of a persisted slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSlot<T> {
    pub state: T,
    pub version: f64,
}

/// Read and decode a slot.
///
/// Returns `Ok(None)` when the slot is empty, was written under another
/// schema version, or no longer decodes. Only storage errors are returned.
pub async fn hydrate<T: DeserializeOwned>(
    storage: &dyn PersistStorage,
    name: &str,
    version: f64,
) -> Result<Option<T>, PersistError> {
    let Some(raw) = storage.get_item(name).await? else {
        return Ok(None);
    };

    let slot: PersistedSlot<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(slot) => slot,
        Err(e) => {
            tracing::warn!(slot = name, error = %e, "Discarding unreadable persisted state");
            return Ok(None);
        }
    };
    if slot.version != version {
        tracing::warn!(
            slot = name,
            stored_version = slot.version,
            expected_version = version,
            "Discarding persisted state with mismatched version",
        );
        return Ok(None);
    }

    match serde_json::from_value(slot.state) {
        Ok(state) => Ok(Some(state)),
        Err(e) => {
            tracing::warn!(slot = name, error = %e, "Discarding undecodable persisted state");
            Ok(None)
        }
    }
}

/// Encode and write a slot.
pub async fn persist<T: Serialize>(
    storage: &dyn PersistStorage,
    name: &str,
    version: f64,
    state: &T,
) -> Result<(), PersistError> {
    let raw = serde_json::to_string(&PersistedSlot { state, version })?;
    storage.set_item(name, raw).await
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Process-local storage; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistStorage for MemoryStorage {
    async fn get_item(&self, name: &str) -> Result<Option<String>, PersistError> {
        Ok(self.items.read().await.get(name).cloned())
    }

    async fn set_item(&self, name: &str, value: String) -> Result<(), PersistError> {
        self.items.write().await.insert(name.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, name: &str) -> Result<(), PersistError> {
        self.items.write().await.remove(name);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// One `<slot>.json` file per slot under a root directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(PersistError::InvalidSlot(
                "storage root is empty".to_string(),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, name: &str) -> Result<PathBuf, PersistError> {
        if name.trim().is_empty() || name.contains('/') || name.contains('\\') || name.contains("..")
        {
            return Err(PersistError::InvalidSlot(name.to_string()));
        }
        Ok(self.root.join(format!("{name}.json")))
    }
}

#[async_trait]
impl PersistStorage for FileStorage {
    async fn get_item(&self, name: &str) -> Result<Option<String>, PersistError> {
        let path = self.slot_path(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, name: &str, value: String) -> Result<(), PersistError> {
        let target = self.slot_path(name)?;
        let temp = target.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.root).await?;

        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(value.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&temp, &target).await?;
        Ok(())
    }

    async fn remove_item(&self, name: &str) -> Result<(), PersistError> {
        let path = self.slot_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        storage.set_item("slot", "value".into()).await.unwrap();
        assert_eq!(storage.get_item("slot").await.unwrap().as_deref(), Some("value"));
        storage.remove_item("slot").await.unwrap();
        assert!(storage.get_item("slot").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_storage_writes_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state")).unwrap();

        storage.set_item("generation-form", "{}".into()).await.unwrap();

        assert!(dir.path().join("state/generation-form.json").exists());
        assert_eq!(
            storage.get_item("generation-form").await.unwrap().as_deref(),
            Some("{}")
        );
    }

    #[tokio::test]
    async fn file_storage_missing_slot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert!(storage.get_item("nothing").await.unwrap().is_none());
        storage.remove_item("nothing").await.unwrap();
    }

    #[tokio::test]
    async fn file_storage_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert_matches!(
            storage.get_item("../etc/passwd").await,
            Err(PersistError::InvalidSlot(_))
        );
        assert_matches!(
            storage.set_item("a/b", String::new()).await,
            Err(PersistError::InvalidSlot(_))
        );
    }

    #[tokio::test]
    async fn envelope_carries_version() {
        let storage = MemoryStorage::new();
        persist(&storage, "slot", 1.2, &json!({"type": "video"}))
            .await
            .unwrap();

        let raw = storage.get_item("slot").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!({"state": {"type": "video"}, "version": 1.2}));

        let state: Option<serde_json::Value> = hydrate(&storage, "slot", 1.2).await.unwrap();
        assert_eq!(state, Some(json!({"type": "video"})));
    }

    #[tokio::test]
    async fn version_mismatch_is_discarded() {
        let storage = MemoryStorage::new();
        persist(&storage, "slot", 1.1, &json!({"type": "video"}))
            .await
            .unwrap();

        let state: Option<serde_json::Value> = hydrate(&storage, "slot", 1.2).await.unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn corrupt_slot_is_discarded() {
        let storage = MemoryStorage::new();
        storage.set_item("slot", "{not json".into()).await.unwrap();

        let state: Option<serde_json::Value> = hydrate(&storage, "slot", 0.0).await.unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn mismatched_state_shape_is_discarded() {
        let storage = MemoryStorage::new();
        storage
            .set_item("slot", r#"{"state": "not a number", "version": 1.0}"#.into())
            .await
            .unwrap();

        let state: Option<u32> = hydrate(&storage, "slot", 1.0).await.unwrap();
        assert!(state.is_none());
    }
}
