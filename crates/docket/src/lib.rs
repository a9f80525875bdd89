//! # Docket
//!
//! The object/data-access layer over a document store.
//!
//! ## Overview
//!
//! - **Tables**: typed CRUD and single-field search over one collection
//! - **Sharded counters**: high-write-rate counters split across documents,
//!   incremented on a random shard and read by summing
//! - **Serials**: unique, increasing integers per name, and short codes
//!   derived from them for use as record ids
//!
//! All coordination goes through the store's conditional writes. There are
//! no in-process locks; any number of processes may share one store.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docket::{Context, DocketConfig, Scope};
//! use docket::store::SqliteStore;
//!
//! async fn example() -> docket::Result<()> {
//!     let store = SqliteStore::open("docket.db").unwrap();
//!     let ctx = Context::new(store, DocketConfig::default());
//!     let scope = Scope::new();
//!
//!     let order_no = ctx.serial().next(&scope, "orders").await?;
//!     ctx.counter().increment(&scope, "orders_today", 1, 16).await?;
//!     let total = ctx.counter().read(&scope, "orders_today", 16).await?;
//!     println!("order #{order_no}, {total} today");
//!
//!     ctx.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `docket::core` - paths, object model, coders, filters
//! - `docket::store` - the `DocumentStore` trait and its backends
//! - `docket::seal` - sealed tokens

pub mod config;
pub mod context;
pub mod counter;
pub mod error;
mod retry;
pub mod scope;
pub mod serial;
pub mod table;

pub use docket_core as core;
pub use docket_seal as seal;
pub use docket_store as store;

pub use config::{CounterConfig, DocketConfig, RetryPolicy, SerialConfig, TableConfig};
pub use context::Context;
pub use counter::{CounterShard, ShardedCounter};
pub use error::{DocketError, Result};
pub use scope::Scope;
pub use serial::{Serial, SerialState};
pub use table::Table;

pub use docket_core::{
    Alphabet, Coder, DocPath, Filter, GlobalRecord, Identify, Object, ObjectMeta, Operator, Own,
    OwnedRecord, Owner, Timestamp,
};
