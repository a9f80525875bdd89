//! Error types for Docket Core.

use thiserror::Error;

/// Errors raised by the object model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    /// The record has already been persisted under another id.
    #[error("cannot reassign id of persisted {collection} record {current:?} to {requested:?}")]
    IdReassigned {
        collection: String,
        current: String,
        requested: String,
    },

    #[error("empty id is not allowed")]
    EmptyId,
}

/// Errors raised by [`Coder`](crate::Coder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoderError {
    #[error("cannot encode negative value {0}")]
    Negative(i64),

    #[error("invalid character {byte:#04x} at index {index}")]
    InvalidChar { byte: u8, index: usize },

    #[error("encoded value overflows i64")]
    Overflow,

    #[error("empty input")]
    Empty,

    #[error("pad width {width} exceeds the maximum of {max}")]
    PadWidth { width: usize, max: usize },
}

/// Errors raised while parsing core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("malformed document path: {0:?}")]
    MalformedPath(String),

    #[error("unknown filter operator: {0:?}")]
    UnknownOperator(String),

    #[error("invalid name {0:?}: must be non-empty and must not contain '/'")]
    InvalidName(String),

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Coder(#[from] CoderError),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
