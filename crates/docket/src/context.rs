//! The Context: explicit, shared entry point to a document store.
//!
//! A `Context` owns the store handle, the configuration, and a shutdown
//! token. Tables, counters and serials are cheap handles created from it;
//! there are no process-wide caches. Closing the context cancels every
//! operation still in flight.

use std::sync::Arc;
use std::time::Duration;

use docket_core::Object;
use docket_store::DocumentStore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::DocketConfig;
use crate::counter::ShardedCounter;
use crate::error::Result;
use crate::scope::Scope;
use crate::serial::Serial;
use crate::table::Table;

/// Store handle plus the context-wide bounds every operation runs under.
pub(crate) struct Env<S: ?Sized> {
    pub(crate) store: Arc<S>,
    shutdown: CancellationToken,
    op_timeout: Option<Duration>,
}

impl<S: ?Sized> Env<S> {
    /// The caller's scope, further bounded by shutdown and the op timeout.
    pub(crate) fn scope(&self, caller: &Scope) -> Scope {
        caller.bounded(&self.shutdown, self.op_timeout)
    }
}

impl<S: ?Sized> Clone for Env<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            shutdown: self.shutdown.clone(),
            op_timeout: self.op_timeout,
        }
    }
}

/// The main Context struct.
///
/// Clones share the same store, configuration and shutdown token.
pub struct Context<S: DocumentStore + ?Sized> {
    env: Env<S>,
    config: Arc<DocketConfig>,
}

impl<S: DocumentStore> Context<S> {
    /// Create a context over `store`.
    pub fn new(store: S, config: DocketConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }
}

impl<S: DocumentStore + ?Sized> Context<S> {
    /// Create a context over an already shared store.
    pub fn from_arc(store: Arc<S>, config: DocketConfig) -> Self {
        Self {
            env: Env {
                store,
                shutdown: CancellationToken::new(),
                op_timeout: config.op_timeout,
            },
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.env.store
    }

    pub fn config(&self) -> &DocketConfig {
        &self.config
    }

    /// Sharded counters over this context's store.
    pub fn counter(&self) -> ShardedCounter<S> {
        ShardedCounter::new(self.env.clone(), self.config.counter.clone())
    }

    /// Serial issuance over this context's store.
    pub fn serial(&self) -> Serial<S> {
        Serial::new(self.env.clone(), self.config.serial.clone())
    }

    /// A table over `collection`, allocating ids from the serial of the
    /// same name.
    pub fn table<R: Object>(&self, collection: &str) -> Result<Table<S, R>> {
        Table::new(
            self.env.clone(),
            collection,
            self.config.table.retry.clone(),
            self.serial(),
            self.counter(),
        )
    }

    /// A fresh scope that ends when the context is closed.
    pub fn scope(&self) -> Scope {
        Scope::from_token(self.env.shutdown.child_token())
    }

    /// Cancel all in-flight and future operations.
    pub fn close(&self) {
        debug!("closing context");
        self.env.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.env.shutdown.is_cancelled()
    }
}

impl<S: DocumentStore + ?Sized> Clone for Context<S> {
    fn clone(&self) -> Self {
        Self {
            env: self.env.clone(),
            config: Arc::clone(&self.config),
        }
    }
}
