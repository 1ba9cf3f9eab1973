use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::PendingTransaction;

/// Key under which the pending queue is stored.
pub const PENDING_KEY: &str = "pendingRegistryTxs";

/// Persistence for registrations made while the wallet was on the wrong chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PendingStore: Send + Sync {
    async fn get(&self) -> Result<Vec<PendingTransaction>>;

    async fn set(&self, entries: Vec<PendingTransaction>) -> Result<()>;

    async fn append(&self, entry: PendingTransaction) -> Result<()>;

    /// Removes the first entry equal to `entry`. Missing entries are not an error.
    async fn remove(&self, entry: &PendingTransaction) -> Result<()>;
}

#[async_trait]
impl<T: PendingStore + ?Sized> PendingStore for std::sync::Arc<T> {
    async fn get(&self) -> Result<Vec<PendingTransaction>> {
        (**self).get().await
    }

    async fn set(&self, entries: Vec<PendingTransaction>) -> Result<()> {
        (**self).set(entries).await
    }

    async fn append(&self, entry: PendingTransaction) -> Result<()> {
        (**self).append(entry).await
    }

    async fn remove(&self, entry: &PendingTransaction) -> Result<()> {
        (**self).remove(entry).await
    }
}

fn without(
    mut entries: Vec<PendingTransaction>,
    entry: &PendingTransaction,
) -> Vec<PendingTransaction> {
    if let Some(pos) = entries.iter().position(|e| e == entry) {
        entries.remove(pos);
    }
    entries
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<PendingTransaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingStore for MemoryStore {
    async fn get(&self) -> Result<Vec<PendingTransaction>> {
        Ok(self.entries.lock().await.clone())
    }

    async fn set(&self, entries: Vec<PendingTransaction>) -> Result<()> {
        *self.entries.lock().await = entries;
        Ok(())
    }

    async fn append(&self, entry: PendingTransaction) -> Result<()> {
        self.entries.lock().await.push(entry);
        Ok(())
    }

    async fn remove(&self, entry: &PendingTransaction) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let current = std::mem::take(&mut *entries);
        *entries = without(current, entry);
        Ok(())
    }
}

/// JSON object file of key/value pairs; the queue lives under [`PENDING_KEY`].
/// Other keys in the file are preserved on write.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_map(&self) -> Result<Map<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Err(Error::StorageError(format!(
                    "{:?} is not a JSON object",
                    self.path
                ))),
                Err(e) => Err(Error::StorageError(format!(
                    "Corrupt storage file {:?}: {}",
                    self.path, e
                ))),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_map(&self, map: Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| Error::StorageError(e.to_string()))?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    async fn read_entries(&self) -> Result<Vec<PendingTransaction>> {
        let map = self.read_map().await?;
        match map.get(PENDING_KEY) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::StorageError(format!("Corrupt pending queue: {}", e))),
            None => Ok(Vec::new()),
        }
    }

    async fn write_entries(&self, entries: Vec<PendingTransaction>) -> Result<()> {
        let mut map = self.read_map().await?;
        debug!("Writing {} pending registrations to {:?}", entries.len(), self.path);
        let value = serde_json::to_value(entries).map_err(|e| Error::StorageError(e.to_string()))?;
        map.insert(PENDING_KEY.to_string(), value);
        self.write_map(map).await
    }
}

#[async_trait]
impl PendingStore for FileStore {
    async fn get(&self) -> Result<Vec<PendingTransaction>> {
        let _guard = self.lock.lock().await;
        self.read_entries().await
    }

    async fn set(&self, entries: Vec<PendingTransaction>) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write_entries(entries).await
    }

    async fn append(&self, entry: PendingTransaction) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.push(entry);
        self.write_entries(entries).await
    }

    async fn remove(&self, entry: &PendingTransaction) -> Result<()> {
        let _guard = self.lock.lock().await;
        let entries = self.read_entries().await?;
        self.write_entries(without(entries, entry)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistrationParams;

    fn pending(hash: &str, timestamp: i64) -> PendingTransaction {
        PendingTransaction {
            params: RegistrationParams {
                source_chain: "Ethereum".to_string(),
                target_chain: "Arbitrum".to_string(),
                source_token: "ETH".to_string(),
                target_token: "ETH".to_string(),
                amount_in: "0.5".to_string(),
                amount_out: "0.49".to_string(),
                transaction_hash: hash.to_string(),
            },
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_memory_store_remove_first_match_only() {
        let store = MemoryStore::new();
        store.append(pending("0x1", 1)).await.unwrap();
        store.append(pending("0x1", 1)).await.unwrap();
        store.append(pending("0x2", 2)).await.unwrap();

        store.remove(&pending("0x1", 1)).await.unwrap();
        store.remove(&pending("0x9", 9)).await.unwrap();

        let left = store.get().await.unwrap();
        assert_eq!(left, vec![pending("0x1", 1), pending("0x2", 2)]);
    }

    #[test]
    fn test_memory_store_set_replaces_queue() {
        let store = MemoryStore::new();
        tokio_test::block_on(async {
            store.append(pending("0x1", 1)).await.unwrap();
            store.set(vec![pending("0x3", 3)]).await.unwrap();
            assert_eq!(store.get().await.unwrap(), vec![pending("0x3", 3)]);
        });
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("storage.json"));
        assert!(store.get().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let store = FileStore::new(&path);
        store.append(pending("0xaa", 10)).await.unwrap();
        store.append(pending("0xbb", 11)).await.unwrap();
        store.remove(&pending("0xaa", 10)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw[PENDING_KEY][0]["transactionHash"], "0xbb");
        assert_eq!(raw[PENDING_KEY][0]["timestamp"], 11);

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get().await.unwrap(), vec![pending("0xbb", 11)]);
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get().await, Err(Error::StorageError(_))));

        std::fs::write(&path, "{\"pendingRegistryTxs\": [").unwrap();
        assert!(matches!(store.get().await, Err(Error::StorageError(_))));
        assert!(matches!(store.append(pending("0x1", 1)).await, Err(Error::StorageError(_))));
    }
}
