//! # Docket Seal
//!
//! Sealed values for token-like use cases: invitation links, session
//! cookies, signed-in-URL state. A value is serialized to CBOR and encrypted
//! with ChaCha20-Poly1305; the result travels as bytes or as a hex token.
//!
//! ```rust
//! use docket_seal::{open_token, seal_token, SealKey};
//!
//! let key = SealKey::derive(b"service secret", "invites");
//! let token = seal_token(&("A7", 42u32), &key).unwrap();
//! let (account, seats): (String, u32) = open_token(&token, &key).unwrap();
//! assert_eq!((account.as_str(), seats), ("A7", 42));
//! ```

pub mod envelope;
pub mod error;
pub mod key;

pub use envelope::{open_token, seal_token, SealFormat, Sealed};
pub use error::{Result, SealError};
pub use key::{SealKey, SealNonce};
