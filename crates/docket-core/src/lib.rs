//! # Docket Core
//!
//! Pure primitives for Docket: document paths, the object model, coders and
//! query filters.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! deterministic computation over in-memory values.
//!
//! ## Key Types
//!
//! - [`DocPath`] - `{collection}/{id}` address of a document
//! - [`Identify`], [`Own`], [`Timestamp`] - capabilities every stored record has
//! - [`OwnedRecord`] / [`GlobalRecord`] - the two ready-made record variants
//! - [`Coder`] - deterministic integer to short-string encoding
//! - [`Filter`] - a single `field op value` predicate over a JSON body

pub mod coder;
pub mod error;
pub mod filter;
pub mod object;
pub mod path;
pub mod record;
pub mod time;

pub use coder::{Alphabet, Coder, MAX_PAD_WIDTH};
pub use error::{CoderError, CoreError, ObjectError};
pub use filter::{Filter, Operator};
pub use object::{Identify, Object, ObjectMeta, Own, Owner, Timestamp};
pub use path::{DocPath, COUNTERS_COLLECTION, SERIALS_COLLECTION};
pub use record::{GlobalRecord, OwnedRecord};
pub use time::now_millis;
