//! # Docket Testkit
//!
//! Testing utilities for Docket.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: contexts over in-memory, SQLite and fault-injecting stores
//! - **Generators**: Proptest strategies for names, deltas, coders and filters
//! - **Faults**: a store wrapper that forces conflicts, adds latency, or goes
//!   offline
//!
//! ## Test Fixtures
//!
//! ```rust
//! use docket_testkit::TestFixture;
//!
//! let fixture = TestFixture::memory();
//! let counter = fixture.ctx.counter();
//! ```
//!
//! ## Fault Injection
//!
//! ```rust
//! use docket::DocketConfig;
//! use docket_testkit::TestFixture;
//!
//! let fixture = TestFixture::faulty(DocketConfig::default());
//! fixture.store.inject_conflicts(3);
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;

pub use faults::FaultyStore;
pub use fixtures::{fast_config, init_tracing, TempDatabase, TestFixture};
