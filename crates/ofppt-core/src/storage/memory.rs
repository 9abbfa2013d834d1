use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use super::KeyValueStore;
use crate::error::{OfpptError, Result};

/// In-process key-value store.
///
/// Reads and writes can be switched to fail, which is how callers exercise
/// their storage-fault paths.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key, e.g. to simulate data left by a previous run.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.get_mut().insert(key.into(), value.into());
        self
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(OfpptError::storage(format!("read of '{}' failed", key)));
        }
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OfpptError::storage(format!("write of '{}' failed", key)));
        }
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OfpptError::storage(format!("remove of '{}' failed", key)));
        }
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_with_entry_prepopulates() {
        let store = MemoryStore::new().with_entry("k", "v");
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(matches!(
            store.set("k", "v").await,
            Err(OfpptError::Storage(_))
        ));

        store.set_fail_writes(false);
        store.set("k", "v").await.unwrap();

        store.set_fail_reads(true);
        assert!(store.get("k").await.is_err());
    }
}
