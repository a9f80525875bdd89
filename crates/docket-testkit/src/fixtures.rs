//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use docket::{Context, DocketConfig, RetryPolicy};
use docket_store::{DocumentStore, MemoryStore, SqliteStore};
use tempfile::TempDir;

use crate::faults::FaultyStore;

/// Configuration with short backoff and generous retry budgets, for tests
/// that hammer a handful of documents from many tasks.
pub fn fast_config() -> DocketConfig {
    let retry = RetryPolicy::new(50, Duration::from_micros(100), Duration::from_millis(5));
    let mut config = DocketConfig::default();
    config.counter.retry = retry.clone();
    config.serial.retry = retry.clone();
    config.table.retry = retry;
    config
}

/// A test fixture: a context over a shared store.
pub struct TestFixture<S: DocumentStore> {
    pub store: Arc<S>,
    pub ctx: Context<S>,
}

impl TestFixture<MemoryStore> {
    /// In-memory store with [`fast_config`].
    pub fn memory() -> Self {
        Self::with_store(MemoryStore::new(), fast_config())
    }
}

impl TestFixture<SqliteStore> {
    /// In-memory SQLite database with [`fast_config`].
    pub fn sqlite() -> Self {
        let store = SqliteStore::open_memory().expect("open in-memory sqlite");
        Self::with_store(store, fast_config())
    }
}

impl TestFixture<FaultyStore<MemoryStore>> {
    /// In-memory store behind a [`FaultyStore`].
    pub fn faulty(config: DocketConfig) -> Self {
        Self::with_store(FaultyStore::new(MemoryStore::new()), config)
    }
}

impl<S: DocumentStore> TestFixture<S> {
    pub fn with_store(store: S, config: DocketConfig) -> Self {
        let store = Arc::new(store);
        let ctx = Context::from_arc(Arc::clone(&store), config);
        Self { store, ctx }
    }
}

/// A SQLite database file in a temporary directory, opened by as many
/// independent handles as a test needs.
pub struct TempDatabase {
    _dir: TempDir,
    path: PathBuf,
}

impl TempDatabase {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("docket.db");
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// A new connection to the database.
    pub fn open(&self) -> SqliteStore {
        SqliteStore::open(&self.path).expect("open sqlite file")
    }

    /// A context over a new connection.
    pub fn context(&self, config: DocketConfig) -> Context<SqliteStore> {
        Context::new(self.open(), config)
    }
}

impl Default for TempDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a `tracing` subscriber honoring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
