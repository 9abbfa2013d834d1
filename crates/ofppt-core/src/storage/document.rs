//! Remote document store abstraction (collections of JSON documents keyed by id).

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde_json::Value;
use tokio::sync::RwLock;

use super::file::write_atomic;
use super::{sanitize_key, unsanitize_key};
use crate::error::{OfpptError, Result};

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Create or overwrite a document.
    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<()>;

    /// Merge the top-level fields of `patch` into an existing document.
    /// Fails when the document does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()>;

    /// All documents of a collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>>;
}

fn merge_fields(target: &mut Value, patch: Value) -> Result<()> {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                target.insert(key, value);
            }
            Ok(())
        }
        _ => Err(OfpptError::storage("update requires JSON objects")),
    }
}

fn missing(collection: &str, id: &str) -> OfpptError {
    OfpptError::storage(format!("No document {}/{}", collection, id))
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| missing(collection, id))?;
        merge_fields(doc, patch)
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Document store laid out on disk as `<root>/<collection>/<id>.json`.
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    pub fn with_dir(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(sanitize_key(collection))
    }

    fn document_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.json", sanitize_key(id)))
    }

    async fn write(&self, collection: &str, id: &str, document: &Value) -> Result<()> {
        tokio::fs::create_dir_all(self.collection_dir(collection)).await?;
        let contents = serde_json::to_string_pretty(document)?;
        write_atomic(&self.document_path(collection, id), &contents).await
    }
}

#[async_trait::async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        match tokio::fs::read_to_string(self.document_path(collection, id)).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        self.write(collection, id, &document).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        let mut doc = self
            .get(collection, id)
            .await?
            .ok_or_else(|| missing(collection, id))?;
        merge_fields(&mut doc, patch)?;
        self.write(collection, id, &doc).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let mut entries = match tokio::fs::read_dir(self.collection_dir(collection)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut docs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(unsanitize_key)
            else {
                tracing::warn!(path = %path.display(), "Skipping document with unexpected name");
                continue;
            };
            let contents = tokio::fs::read_to_string(&path).await?;
            docs.push((id, serde_json::from_str(&contents)?));
        }
        docs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn exercise(store: &dyn DocumentStore) {
        assert!(store.get("users", "u1").await.unwrap().is_none());

        store
            .set("users", "u1", json!({"firstName": "Amine", "niveau": "TS"}))
            .await
            .unwrap();
        store
            .update("users", "u1", json!({"niveau": "T"}))
            .await
            .unwrap();

        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc["firstName"], "Amine");
        assert_eq!(doc["niveau"], "T");

        assert!(store.update("users", "nobody", json!({})).await.is_err());

        store.set("users", "u0", json!({"firstName": "Sara"})).await.unwrap();
        let ids: Vec<String> = store
            .list("users")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["u0", "u1"]);
        assert!(store.list("news").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_document_store() {
        exercise(&MemoryDocumentStore::new()).await;
    }

    #[tokio::test]
    async fn test_file_document_store() {
        let dir = TempDir::new().unwrap();
        let store = FileDocumentStore::with_dir(dir.path()).unwrap();
        exercise(&store).await;
        assert!(dir.path().join("users").join("u1.json").exists());
    }

    #[tokio::test]
    async fn test_file_list_returns_original_ids() {
        let dir = TempDir::new().unwrap();
        let store = FileDocumentStore::with_dir(dir.path()).unwrap();
        store.set("news", "a/b", json!({"n": 1})).await.unwrap();
        store.set("news", "a_b", json!({"n": 2})).await.unwrap();
        store.set("news", "v1.2", json!({"n": 3})).await.unwrap();

        let docs = store.list("news").await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a/b", "a_b", "v1.2"]);
        assert_eq!(docs[0].1["n"], 1);
    }

    #[tokio::test]
    async fn test_update_rejects_non_object_patch() {
        let store = MemoryDocumentStore::new();
        store.set("users", "u1", json!({"a": 1})).await.unwrap();
        assert!(store.update("users", "u1", json!([1, 2])).await.is_err());
    }
}
