//! # Docket Store
//!
//! Storage abstraction for Docket. Provides a trait-based interface for
//! document persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts the backing document database behind the
//! [`DocumentStore`] trait, allowing the data-access layer to be
//! storage-agnostic. The persistent implementation is [`SqliteStore`], with
//! [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`DocumentStore`] - The async trait for all storage operations
//! - [`Transaction`] - Read-modify-write handle over one document
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`Precondition`] / [`WriteOutcome`] - compare-and-swap guard and result
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docket_core::DocPath;
//! use docket_store::{DocumentStore, SqliteStore, StoreExt, WriteOutcome};
//! use serde_json::json;
//!
//! async fn example() {
//!     let store = SqliteStore::open("docket.db").unwrap();
//!     let path = DocPath::serial("accountID").unwrap();
//!
//!     // Read, then write only if nobody else wrote in between
//!     let tx = store.begin(path).await.unwrap();
//!     match tx.commit(&json!({"next_value": 2})).await.unwrap() {
//!         WriteOutcome::Committed(version) => println!("now at v{}", version),
//!         WriteOutcome::Conflict => println!("lost the race, retry"),
//!     }
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Versioned documents**: every committed write bumps the version
//! - **Conditional writes**: `write_if` is the only atomic primitive
//! - **No cross-document isolation**: multi-document reads may be torn

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Document, DocumentStore, Precondition, StoreExt, Transaction, WriteOutcome};
