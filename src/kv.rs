/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::kv
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Durable key-value collaborator: one serialized blob per
    key, exclusive read-modify-write, change publication.

  Security / Safety Notes:
    Keys are restricted to a safe filename alphabet. File
    writes go through a temp file and rename so readers never
    observe a partial document.

  Dependencies:
    async-trait for the object-safe trait, tokio for locks,
    watch channels and async filesystem access.

  Operational Scope:
    Backs the error log store; the in-memory variant serves
    tests and embedders without a filesystem.

  Revision History:
    2026-10-19 COD  Introduced memory and file stores.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Updates on one key are linearized
    - Publication happens after the commit
============================================================*/

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{watch, Mutex as AsyncMutex};

use crate::error::{Result, SynnetError};

/// Result of an update closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Keep,
    Put(String),
    Remove,
}

/// Closure run inside the exclusive section of [`KeyValueStore::update`].
pub type UpdateFn = Box<dyn FnOnce(Option<String>) -> Mutation + Send>;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Read-modify-write `key`. Calls on the same key never interleave.
    async fn update(&self, key: &str, mutate: UpdateFn) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()> {
        self.update(key, Box::new(|_: Option<String>| Mutation::Remove)).await
    }

    /// Receiver holding the committed value, refreshed after every change.
    async fn subscribe(&self, key: &str) -> Result<watch::Receiver<Option<String>>>;
}

struct Slot {
    value: AsyncMutex<Option<String>>,
    publisher: watch::Sender<Option<String>>,
}

impl Slot {
    fn new(initial: Option<String>) -> Arc<Self> {
        let (publisher, _) = watch::channel(initial.clone());
        Arc::new(Self {
            value: AsyncMutex::new(initial),
            publisher,
        })
    }
}

fn slot_entry(
    slots: &Mutex<HashMap<String, Arc<Slot>>>,
    key: &str,
    initial: impl FnOnce() -> Option<String>,
) -> Arc<Slot> {
    let mut guard = slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard
        .entry(key.to_string())
        .or_insert_with(|| Slot::new(initial()))
        .clone()
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<Slot> {
        slot_entry(&self.slots, key, || None)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let slot = self.slot(key);
        let value = slot.value.lock().await.clone();
        Ok(value)
    }

    async fn update(&self, key: &str, mutate: UpdateFn) -> Result<()> {
        let slot = self.slot(key);
        let mut value = slot.value.lock().await;
        match mutate(value.clone()) {
            Mutation::Keep => {}
            Mutation::Put(next) => {
                *value = Some(next.clone());
                slot.publisher.send_replace(Some(next));
            }
            Mutation::Remove => {
                *value = None;
                slot.publisher.send_replace(None);
            }
        }
        Ok(())
    }

    async fn subscribe(&self, key: &str) -> Result<watch::Receiver<Option<String>>> {
        Ok(self.slot(key).publisher.subscribe())
    }
}

/// Store keeping one `<key>.json` document per key inside a directory.
pub struct FileKeyValueStore {
    dir: PathBuf,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn document_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }

    async fn slot(&self, key: &str) -> Result<Arc<Slot>> {
        let existing = {
            let guard = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.get(key).cloned()
        };
        if let Some(slot) = existing {
            return Ok(slot);
        }
        let initial = read_document(&self.document_path(key)?).await?;
        Ok(slot_entry(&self.slots, key, move || initial))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let slot = self.slot(key).await?;
        let _guard = slot.value.lock().await;
        read_document(&self.document_path(key)?).await
    }

    async fn update(&self, key: &str, mutate: UpdateFn) -> Result<()> {
        let path = self.document_path(key)?;
        let slot = self.slot(key).await?;
        let mut cached = slot.value.lock().await;
        let current = read_document(&path).await?;

        match mutate(current) {
            Mutation::Keep => {}
            Mutation::Put(next) => {
                write_document(&self.dir, &path, &next).await?;
                *cached = Some(next.clone());
                slot.publisher.send_replace(Some(next));
            }
            Mutation::Remove => {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => {
                        return Err(SynnetError::Storage(format!(
                            "Failed to remove {}: {err}",
                            path.display()
                        )))
                    }
                }
                *cached = None;
                slot.publisher.send_replace(None);
            }
        }
        Ok(())
    }

    async fn subscribe(&self, key: &str) -> Result<watch::Receiver<Option<String>>> {
        Ok(self.slot(key).await?.publisher.subscribe())
    }
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(SynnetError::Storage(format!("Invalid store key `{key}`")))
    }
}

/// Invalid UTF-8 is decoded lossily so a damaged document can still be
/// replaced by the next update.
async fn read_document(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(match String::from_utf8(bytes) {
            Ok(body) => body,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        })),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SynnetError::Storage(format!(
            "Failed to read {}: {err}",
            path.display()
        ))),
    }
}

async fn write_document(dir: &Path, path: &Path, body: &str) -> Result<()> {
    tokio::fs::create_dir_all(dir).await.map_err(|err| {
        SynnetError::Storage(format!(
            "Failed to create store directory {}: {err}",
            dir.display()
        ))
    })?;

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    tokio::fs::write(&tmp, body).await.map_err(|err| {
        SynnetError::Storage(format!("Failed to write {}: {err}", tmp.display()))
    })?;
    tokio::fs::rename(&tmp, path).await.map_err(|err| {
        SynnetError::Storage(format!(
            "Failed to replace {}: {err}",
            path.display()
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_update_get_remove() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store
            .update("k", Box::new(|current: Option<String>| {
                assert_eq!(current, None);
                Mutation::Put("one".into())
            }))
            .await
            .unwrap();
        store
            .update("k", Box::new(|current: Option<String>| {
                assert_eq!(current.as_deref(), Some("one"));
                Mutation::Keep
            }))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("one"));

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn subscribers_see_committed_values() {
        let store = MemoryKeyValueStore::new();
        let mut rx = store.subscribe("k").await.unwrap();
        assert_eq!(*rx.borrow_and_update(), None);

        store
            .update("k", Box::new(|_: Option<String>| Mutation::Put("v1".into())))
            .await
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_deref(), Some("v1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_do_not_lose_writes() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let mut tasks = Vec::new();
        for _ in 0..64 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .update("counter", Box::new(|current: Option<String>| {
                        let n: u32 = current.and_then(|v| v.parse().ok()).unwrap_or(0);
                        Mutation::Put((n + 1).to_string())
                    }))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(store.get("counter").await.unwrap().as_deref(), Some("64"));
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        {
            let store = FileKeyValueStore::new(&root);
            store
                .update("logs", Box::new(|_: Option<String>| Mutation::Put("[1,2]".into())))
                .await
                .unwrap();
        }
        let reopened = FileKeyValueStore::new(&root);
        assert_eq!(reopened.get("logs").await.unwrap().as_deref(), Some("[1,2]"));
        let rx = reopened.subscribe("logs").await.unwrap();
        assert_eq!(rx.borrow().as_deref(), Some("[1,2]"));
        assert!(!root.join("logs.json.tmp").exists());

        reopened.remove("logs").await.unwrap();
        assert!(!root.join("logs.json").exists());
        assert_eq!(rx.borrow().as_deref(), None);
        reopened.remove("logs").await.unwrap();
    }

    #[tokio::test]
    async fn file_store_replaces_non_utf8_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logs.json"), [0xff, 0xfe, b'[', 0x80]).unwrap();

        let store = FileKeyValueStore::new(dir.path());
        let damaged = store.get("logs").await.unwrap().unwrap();
        assert!(damaged.contains('\u{FFFD}'));

        store
            .update("logs", Box::new(|current: Option<String>| {
                assert!(current.is_some());
                Mutation::Put("[]".into())
            }))
            .await
            .unwrap();
        assert_eq!(store.get("logs").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn file_store_rejects_unsafe_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        assert!(store.get("../escape").await.is_err());
        assert!(store.get("").await.is_err());
        assert!(store.get(".hidden").await.is_err());
    }
}
