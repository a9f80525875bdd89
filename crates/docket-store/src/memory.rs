//! In-memory implementation of the DocumentStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use docket_core::{DocPath, Filter};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::traits::{Document, DocumentStore, Precondition, WriteOutcome};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; each
/// operation holds the lock for its whole duration, which makes `write_if`
/// atomic.
pub struct MemoryStore {
    /// Documents ordered by path so `query` returns them sorted by id.
    inner: RwLock<BTreeMap<DocPath, StoredDocument>>,
}

struct StoredDocument {
    body: Value,
    version: u64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<DocPath, StoredDocument>>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<DocPath, StoredDocument>>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn to_document(path: &DocPath, stored: &StoredDocument) -> Document {
    Document {
        path: path.clone(),
        body: stored.body.clone(),
        version: stored.version,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        let docs = self.read()?;
        Ok(docs.get(path).map(|stored| to_document(path, stored)))
    }

    async fn get_many(&self, paths: &[DocPath]) -> Result<HashMap<DocPath, Document>> {
        let docs = self.read()?;
        Ok(paths
            .iter()
            .filter_map(|path| {
                docs.get(path)
                    .map(|stored| (path.clone(), to_document(path, stored)))
            })
            .collect())
    }

    async fn set(&self, path: &DocPath, body: &Value) -> Result<u64> {
        let mut docs = self.write()?;
        let version = docs.get(path).map_or(1, |stored| stored.version + 1);
        docs.insert(
            path.clone(),
            StoredDocument {
                body: body.clone(),
                version,
            },
        );
        Ok(version)
    }

    async fn write_if(
        &self,
        path: &DocPath,
        precondition: Precondition,
        body: &Value,
    ) -> Result<WriteOutcome> {
        let mut docs = self.write()?;

        let current = docs.get(path).map(|stored| stored.version);
        let version = match (precondition, current) {
            (Precondition::Absent, None) => 1,
            (Precondition::Version(expected), Some(actual)) if expected == actual => actual + 1,
            _ => return Ok(WriteOutcome::Conflict),
        };

        docs.insert(
            path.clone(),
            StoredDocument {
                body: body.clone(),
                version,
            },
        );
        Ok(WriteOutcome::Committed(version))
    }

    async fn delete(&self, path: &DocPath) -> Result<bool> {
        let mut docs = self.write()?;
        Ok(docs.remove(path).is_some())
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let docs = self.read()?;
        Ok(docs
            .iter()
            .filter(|(path, stored)| {
                path.collection() == collection && filter.matches(&stored.body)
            })
            .map(|(path, stored)| to_document(path, stored))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreExt;
    use docket_core::Operator;
    use serde_json::json;

    fn path(collection: &str, id: &str) -> DocPath {
        DocPath::new(collection, id).unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let p = path("users", "1");

        assert!(store.get(&p).await.unwrap().is_none());

        let v1 = store.set(&p, &json!({"name": "ada"})).await.unwrap();
        assert_eq!(v1, 1);
        let v2 = store.set(&p, &json!({"name": "grace"})).await.unwrap();
        assert_eq!(v2, 2);

        let doc = store.get(&p).await.unwrap().unwrap();
        assert_eq!(doc.body["name"], "grace");
        assert_eq!(doc.version, 2);
    }

    #[tokio::test]
    async fn test_write_if_absent() {
        let store = MemoryStore::new();
        let p = path("serials", "accountID");

        let first = store
            .write_if(&p, Precondition::Absent, &json!({"next_value": 1}))
            .await
            .unwrap();
        assert_eq!(first, WriteOutcome::Committed(1));

        let second = store
            .write_if(&p, Precondition::Absent, &json!({"next_value": 99}))
            .await
            .unwrap();
        assert_eq!(second, WriteOutcome::Conflict);

        let doc = store.get(&p).await.unwrap().unwrap();
        assert_eq!(doc.body["next_value"], 1);
    }

    #[tokio::test]
    async fn test_write_if_version() {
        let store = MemoryStore::new();
        let p = path("counters", "hits_0");
        store.set(&p, &json!({"value": 1})).await.unwrap();

        let stale = store
            .write_if(&p, Precondition::Version(7), &json!({"value": 2}))
            .await
            .unwrap();
        assert_eq!(stale, WriteOutcome::Conflict);

        let ok = store
            .write_if(&p, Precondition::Version(1), &json!({"value": 2}))
            .await
            .unwrap();
        assert_eq!(ok, WriteOutcome::Committed(2));

        // Version precondition on a missing document never holds.
        let missing = store
            .write_if(&path("counters", "hits_1"), Precondition::Version(1), &json!({}))
            .await
            .unwrap();
        assert_eq!(missing, WriteOutcome::Conflict);
    }

    #[tokio::test]
    async fn test_transaction_conflict() {
        let store = MemoryStore::new();
        let p = path("serials", "s");
        store.set(&p, &json!({"next_value": 1})).await.unwrap();

        let tx_a = store.begin(p.clone()).await.unwrap();
        let tx_b = store.begin(p.clone()).await.unwrap();
        assert_eq!(tx_a.precondition(), Precondition::Version(1));

        assert!(tx_a.commit(&json!({"next_value": 2})).await.unwrap().is_committed());
        assert_eq!(
            tx_b.commit(&json!({"next_value": 2})).await.unwrap(),
            WriteOutcome::Conflict
        );
    }

    #[tokio::test]
    async fn test_get_many_omits_absent() {
        let store = MemoryStore::new();
        let a = path("counters", "c_0");
        let b = path("counters", "c_1");
        store.set(&a, &json!({"value": 3})).await.unwrap();

        let found = store.get_many(&[a.clone(), b.clone()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&a));
        assert!(!found.contains_key(&b));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        let p = path("users", "1");
        store.set(&p, &json!({})).await.unwrap();

        assert!(store.delete(&p).await.unwrap());
        assert!(!store.delete(&p).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_query_scoped_to_collection() {
        let store = MemoryStore::new();
        store.set(&path("users", "2"), &json!({"plan": "pro"})).await.unwrap();
        store.set(&path("users", "1"), &json!({"plan": "pro"})).await.unwrap();
        store.set(&path("users", "3"), &json!({"plan": "free"})).await.unwrap();
        store.set(&path("teams", "1"), &json!({"plan": "pro"})).await.unwrap();

        let filter = Filter::new("plan", Operator::Eq, "pro");
        let hits = store.query("users", &filter).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|d| d.path.id().to_string()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
