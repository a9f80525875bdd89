//! SQLite implementation of the DocumentStore trait.
//!
//! This is the persistent backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking. Conditional writes are single
//! `UPDATE ... WHERE version = ?` / `INSERT ... ON CONFLICT DO NOTHING`
//! statements, so they stay atomic even when several processes share the
//! database file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use docket_core::{now_millis, DocPath, Filter};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Document, DocumentStore, Precondition, WriteOutcome};

/// How long a statement waits on another process holding the write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist. The
    /// database is switched to WAL mode so readers in other processes do not
    /// block writers.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StoreError::Unavailable(format!("connection mutex poisoned: {}", e))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

fn parse_body(path: &DocPath, raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::InvalidData(format!("{}: body is not JSON: {}", path, e)))
}

fn read_document(conn: &Connection, path: &DocPath) -> Result<Option<Document>> {
    let row: Option<(String, i64)> = conn
        .prepare_cached(
            "SELECT body, version FROM documents WHERE collection = ?1 AND doc_id = ?2",
        )?
        .query_row(params![path.collection(), path.id()], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()?;

    match row {
        Some((raw, version)) => Ok(Some(Document {
            path: path.clone(),
            body: parse_body(path, &raw)?,
            version: version as u64,
        })),
        None => Ok(None),
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        let path = path.clone();
        self.blocking(move |conn| read_document(conn, &path)).await
    }

    async fn get_many(&self, paths: &[DocPath]) -> Result<HashMap<DocPath, Document>> {
        let paths = paths.to_vec();

        self.blocking(move |conn| {
            let mut found = HashMap::with_capacity(paths.len());
            for path in paths {
                if let Some(doc) = read_document(conn, &path)? {
                    found.insert(path, doc);
                }
            }
            Ok(found)
        })
        .await
    }

    async fn set(&self, path: &DocPath, body: &Value) -> Result<u64> {
        let path = path.clone();
        let body = serde_json::to_string(body)?;

        self.blocking(move |conn| {
            let version: i64 = conn.query_row(
                "INSERT INTO documents (collection, doc_id, body, version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 1, ?4, ?4)
                 ON CONFLICT(collection, doc_id) DO UPDATE SET
                    body = excluded.body,
                    version = documents.version + 1,
                    updated_at = excluded.updated_at
                 RETURNING version",
                params![path.collection(), path.id(), body, now_millis()],
                |row| row.get(0),
            )?;
            Ok(version as u64)
        })
        .await
    }

    async fn write_if(
        &self,
        path: &DocPath,
        precondition: Precondition,
        body: &Value,
    ) -> Result<WriteOutcome> {
        let path = path.clone();
        let body = serde_json::to_string(body)?;

        self.blocking(move |conn| {
            let now = now_millis();
            let (changed, version) = match precondition {
                Precondition::Absent => {
                    let changed = conn.execute(
                        "INSERT INTO documents (collection, doc_id, body, version, created_at, updated_at)
                         VALUES (?1, ?2, ?3, 1, ?4, ?4)
                         ON CONFLICT(collection, doc_id) DO NOTHING",
                        params![path.collection(), path.id(), body, now],
                    )?;
                    (changed, 1)
                }
                Precondition::Version(expected) => {
                    let changed = conn.execute(
                        "UPDATE documents SET body = ?3, version = version + 1, updated_at = ?4
                         WHERE collection = ?1 AND doc_id = ?2 AND version = ?5",
                        params![path.collection(), path.id(), body, now, expected as i64],
                    )?;
                    (changed, expected + 1)
                }
            };

            if changed == 1 {
                Ok(WriteOutcome::Committed(version))
            } else {
                Ok(WriteOutcome::Conflict)
            }
        })
        .await
    }

    async fn delete(&self, path: &DocPath) -> Result<bool> {
        let path = path.clone();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![path.collection(), path.id()],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collection = collection.to_string();
        let filter = filter.clone();

        self.blocking(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT doc_id, body, version FROM documents
                 WHERE collection = ?1
                 ORDER BY doc_id",
            )?;

            let rows = stmt
                .query_map(params![collection], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut docs = Vec::new();
            for (doc_id, raw, version) in rows {
                let path = DocPath::new(collection.as_str(), doc_id)
                    .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                let body = parse_body(&path, &raw)?;
                if filter.matches(&body) {
                    docs.push(Document {
                        path,
                        body,
                        version: version as u64,
                    });
                }
            }
            Ok(docs)
        })
        .await
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
    async fn test_set_and_get() {
        let store = SqliteStore::open_memory().unwrap();
        let p = path("users", "1");

        assert!(store.get(&p).await.unwrap().is_none());
        assert_eq!(store.set(&p, &json!({"name": "ada"})).await.unwrap(), 1);
        assert_eq!(store.set(&p, &json!({"name": "grace"})).await.unwrap(), 2);

        let doc = store.get(&p).await.unwrap().unwrap();
        assert_eq!(doc.body, json!({"name": "grace"}));
        assert_eq!(doc.version, 2);
    }

    #[tokio::test]
    async fn test_write_if() {
        let store = SqliteStore::open_memory().unwrap();
        let p = path("serials", "accountID");

        let created = store
            .write_if(&p, Precondition::Absent, &json!({"next_value": 1}))
            .await
            .unwrap();
        assert_eq!(created, WriteOutcome::Committed(1));

        let again = store
            .write_if(&p, Precondition::Absent, &json!({"next_value": 5}))
            .await
            .unwrap();
        assert_eq!(again, WriteOutcome::Conflict);

        let stale = store
            .write_if(&p, Precondition::Version(2), &json!({"next_value": 5}))
            .await
            .unwrap();
        assert_eq!(stale, WriteOutcome::Conflict);

        let bumped = store
            .write_if(&p, Precondition::Version(1), &json!({"next_value": 2}))
            .await
            .unwrap();
        assert_eq!(bumped, WriteOutcome::Committed(2));

        let doc = store.get(&p).await.unwrap().unwrap();
        assert_eq!(doc.body["next_value"], 2);
    }

    #[tokio::test]
    async fn test_transaction_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let p = path("counters", "c_0");

        let tx = store.begin(p.clone()).await.unwrap();
        assert!(tx.current().is_none());
        assert!(tx.commit(&json!({"value": 1})).await.unwrap().is_committed());

        let tx = store.begin(p.clone()).await.unwrap();
        assert_eq!(tx.current().unwrap().body["value"], 1);
        assert_eq!(tx.precondition(), Precondition::Version(1));
    }

    #[tokio::test]
    async fn test_get_many_and_delete() {
        let store = SqliteStore::open_memory().unwrap();
        let a = path("counters", "c_0");
        let b = path("counters", "c_1");
        store.set(&a, &json!({"value": 4})).await.unwrap();

        let found = store.get_many(&[a.clone(), b.clone()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[&a].body["value"], 4);

        assert!(store.delete(&a).await.unwrap());
        assert!(!store.delete(&a).await.unwrap());
        assert!(store.get_many(&[a, b]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query() {
        let store = SqliteStore::open_memory().unwrap();
        store.set(&path("users", "b"), &json!({"age": 40})).await.unwrap();
        store.set(&path("users", "a"), &json!({"age": 30})).await.unwrap();
        store.set(&path("users", "c"), &json!({"name": "no age"})).await.unwrap();
        store.set(&path("teams", "a"), &json!({"age": 99})).await.unwrap();

        let hits = store
            .query("users", &Filter::new("age", Operator::Ge, 30))
            .await
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|d| d.path.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("docket.db");
        let p = path("serials", "s");

        {
            let store = SqliteStore::open(&file).unwrap();
            store.set(&p, &json!({"next_value": 7})).await.unwrap();
        }

        let store = SqliteStore::open(&file).unwrap();
        let doc = store.get(&p).await.unwrap().unwrap();
        assert_eq!(doc.body["next_value"], 7);
        assert_eq!(doc.version, 1);
    }

    #[tokio::test]
    async fn test_two_handles_share_cas() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("docket.db");
        let first = SqliteStore::open(&file).unwrap();
        let second = SqliteStore::open(&file).unwrap();
        let p = path("serials", "s");

        let tx_a = first.begin(p.clone()).await.unwrap();
        let tx_b = second.begin(p.clone()).await.unwrap();

        let a = tx_a.commit(&json!({"next_value": 2})).await.unwrap();
        let b = tx_b.commit(&json!({"next_value": 2})).await.unwrap();
        assert!(a.is_committed());
        assert_eq!(b, WriteOutcome::Conflict);
    }
}
