//! Store wrappers that inject faults.
//!
//! [`FaultyStore`] delegates to any [`DocumentStore`] and can be told to
//! report write conflicts, add latency to every call, or go offline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use docket_core::{DocPath, Filter};
use docket_store::{Document, DocumentStore, Precondition, Result, StoreError, WriteOutcome};
use serde_json::Value;

/// A store that misbehaves on request.
pub struct FaultyStore<S> {
    inner: S,
    latency: Duration,
    /// Conditional writes still to be answered with `Conflict`.
    conflicts: AtomicU32,
    /// Answer every conditional write with `Conflict`.
    always_conflict: AtomicBool,
    offline: AtomicBool,
    write_attempts: AtomicU64,
}

impl<S: DocumentStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            latency: Duration::ZERO,
            conflicts: AtomicU32::new(0),
            always_conflict: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            write_attempts: AtomicU64::new(0),
        }
    }

    /// Sleep this long before every call reaches the inner store.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Report a conflict for the next `n` conditional writes.
    pub fn with_conflicts(self, n: u32) -> Self {
        self.conflicts.store(n, Ordering::SeqCst);
        self
    }

    pub fn inject_conflicts(&self, n: u32) {
        self.conflicts.fetch_add(n, Ordering::SeqCst);
    }

    pub fn set_always_conflict(&self, on: bool) {
        self.always_conflict.store(on, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of conditional writes received, including rejected ones.
    pub fn write_attempts(&self) -> u64 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn enter(&self, op: &str) -> Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{op}: store offline")));
        }
        Ok(())
    }

    fn take_conflict(&self) -> bool {
        if self.always_conflict.load(Ordering::SeqCst) {
            return true;
        }
        self.conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for FaultyStore<S> {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        self.enter("get").await?;
        self.inner.get(path).await
    }

    async fn get_many(&self, paths: &[DocPath]) -> Result<HashMap<DocPath, Document>> {
        self.enter("get_many").await?;
        self.inner.get_many(paths).await
    }

    async fn set(&self, path: &DocPath, body: &Value) -> Result<u64> {
        self.enter("set").await?;
        self.inner.set(path, body).await
    }

    async fn write_if(
        &self,
        path: &DocPath,
        precondition: Precondition,
        body: &Value,
    ) -> Result<WriteOutcome> {
        self.enter("write_if").await?;
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.take_conflict() {
            return Ok(WriteOutcome::Conflict);
        }
        self.inner.write_if(path, precondition, body).await
    }

    async fn delete(&self, path: &DocPath) -> Result<bool> {
        self.enter("delete").await?;
        self.inner.delete(path).await
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        self.enter("query").await?;
        self.inner.query(collection, filter).await
    }
}

#[cfg(test)]
mod tests {
    use docket_store::MemoryStore;
    use serde_json::json;

    use super::*;

    fn path() -> DocPath {
        DocPath::new("things", "a").unwrap()
    }

    #[tokio::test]
    async fn test_injected_conflicts_run_out() {
        let store = FaultyStore::new(MemoryStore::new()).with_conflicts(2);
        let body = json!({ "n": 1 });

        for _ in 0..2 {
            let outcome = store.write_if(&path(), Precondition::Absent, &body).await.unwrap();
            assert_eq!(outcome, WriteOutcome::Conflict);
        }
        let outcome = store.write_if(&path(), Precondition::Absent, &body).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Committed(1));
        assert_eq!(store.write_attempts(), 3);
    }

    #[tokio::test]
    async fn test_offline() {
        let store = FaultyStore::new(MemoryStore::new());
        store.set_offline(true);
        assert!(matches!(
            store.get(&path()).await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_offline(false);
        assert!(store.get(&path()).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency() {
        let store = FaultyStore::new(MemoryStore::new()).with_latency(Duration::from_secs(1));
        let started = tokio::time::Instant::now();
        store.get(&path()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(1));
    }
}
