//! DocumentStore trait: the abstract interface over the backing document
//! database.
//!
//! Documents are JSON bodies addressed by [`DocPath`]. Every committed write
//! bumps the document's version; conditional writes compare against that
//! version, which is the only atomic primitive the layers above rely on.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use docket_core::{DocPath, Filter};
use serde_json::Value;

use crate::error::Result;

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub body: Value,
    /// Starts at 1 when the document is created, +1 per committed write.
    pub version: u64,
}

/// Guard of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The document must not exist.
    Absent,
    /// The document must exist at exactly this version.
    Version(u64),
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write was applied; the document is now at this version.
    Committed(u64),
    /// The precondition did not hold; nothing was written.
    Conflict,
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, WriteOutcome::Committed(_))
    }
}

/// The DocumentStore trait: async interface for document persistence.
///
/// All methods are async to support both in-process and remote backends.
/// For SQLite, `spawn_blocking` is used internally to avoid blocking the
/// runtime.
///
/// # Design Notes
///
/// - **Atomic conditional writes**: `write_if` either fully applies or
///   returns `Conflict`; there is no partially applied write.
/// - **No cross-document isolation**: `get_many` may observe documents at
///   different points in time.
/// - **Shared handle**: implementations are `Send + Sync` and used through
///   shared references; callers never need their own locking.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document.
    async fn get(&self, path: &DocPath) -> Result<Option<Document>>;

    /// Read several documents. Absent paths are omitted from the map.
    async fn get_many(&self, paths: &[DocPath]) -> Result<HashMap<DocPath, Document>>;

    /// Unconditionally create or replace a document. Returns the new version.
    async fn set(&self, path: &DocPath, body: &Value) -> Result<u64>;

    /// Write `body` only if `precondition` holds (compare-and-swap).
    async fn write_if(
        &self,
        path: &DocPath,
        precondition: Precondition,
        body: &Value,
    ) -> Result<WriteOutcome>;

    /// Remove a document. Returns whether it existed.
    async fn delete(&self, path: &DocPath) -> Result<bool>;

    /// All documents of `collection` whose body matches `filter`, ordered by id.
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        (**self).get(path).await
    }

    async fn get_many(&self, paths: &[DocPath]) -> Result<HashMap<DocPath, Document>> {
        (**self).get_many(paths).await
    }

    async fn set(&self, path: &DocPath, body: &Value) -> Result<u64> {
        (**self).set(path, body).await
    }

    async fn write_if(
        &self,
        path: &DocPath,
        precondition: Precondition,
        body: &Value,
    ) -> Result<WriteOutcome> {
        (**self).write_if(path, precondition, body).await
    }

    async fn delete(&self, path: &DocPath) -> Result<bool> {
        (**self).delete(path).await
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        (**self).query(collection, filter).await
    }
}

/// A read-modify-write transaction on a single document.
///
/// Holds the snapshot taken by [`StoreExt::begin`]; [`commit`](Self::commit)
/// writes only if the document is still at that snapshot. On `Conflict`
/// the caller begins a fresh transaction and retries.
pub struct Transaction<'a, S: ?Sized> {
    store: &'a S,
    path: DocPath,
    snapshot: Option<Document>,
}

impl<'a, S: DocumentStore + ?Sized> Transaction<'a, S> {
    pub fn path(&self) -> &DocPath {
        &self.path
    }

    /// The document as read when the transaction began.
    pub fn current(&self) -> Option<&Document> {
        self.snapshot.as_ref()
    }

    /// The precondition `commit` will write under.
    pub fn precondition(&self) -> Precondition {
        match &self.snapshot {
            Some(doc) => Precondition::Version(doc.version),
            None => Precondition::Absent,
        }
    }

    pub async fn commit(self, body: &Value) -> Result<WriteOutcome> {
        let precondition = self.precondition();
        self.store.write_if(&self.path, precondition, body).await
    }
}

/// Extension trait for common store patterns.
pub trait StoreExt: DocumentStore {
    /// Start a read-modify-write transaction on `path`.
    fn begin(
        &self,
        path: DocPath,
    ) -> impl std::future::Future<Output = Result<Transaction<'_, Self>>> + Send;
}

impl<S: DocumentStore + ?Sized> StoreExt for S {
    async fn begin(&self, path: DocPath) -> Result<Transaction<'_, Self>> {
        let snapshot = self.get(&path).await?;
        Ok(Transaction {
            store: self,
            path,
            snapshot,
        })
    }
}
