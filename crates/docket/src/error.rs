//! Error types for Docket.

use docket_core::{CoderError, CoreError, ObjectError};
use docket_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Docket operations.
///
/// Store failures are always wrapped with the logical operation name and
/// the target path. Only [`ContentionExceeded`](Self::ContentionExceeded)
/// and [`StoreUnavailable`](Self::StoreUnavailable) are worth retrying; see
/// [`is_retryable`](Self::is_retryable).
#[derive(Debug, Error)]
pub enum DocketError {
    /// Read of an absent record that is not lazily creatable.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// The retry budget of an atomic write ran out.
    #[error("{op} on {path}: contention exceeded after {attempts} attempts")]
    ContentionExceeded {
        op: &'static str,
        path: String,
        attempts: u32,
    },

    /// The caller's cancellation token fired or its deadline passed before
    /// anything was written.
    #[error("{op} on {path}: canceled")]
    Canceled { op: &'static str, path: String },

    /// Programming or data error, e.g. re-assigning a persisted id.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Transport-level failure from the store.
    #[error("{op} on {path}: store unavailable: {source}")]
    StoreUnavailable {
        op: &'static str,
        path: String,
        #[source]
        source: StoreError,
    },

    /// A stored body could not be decoded into the expected shape.
    #[error("corrupt document {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

impl DocketError {
    /// Whether a caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DocketError::ContentionExceeded { .. } | DocketError::StoreUnavailable { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DocketError::NotFound { .. })
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, DocketError::Canceled { .. })
    }

    /// Wrap a store error with operation context.
    pub(crate) fn store(op: &'static str, path: impl ToString, source: StoreError) -> Self {
        let path = path.to_string();
        match source {
            StoreError::InvalidData(reason) => DocketError::Corrupt { path, reason },
            source => DocketError::StoreUnavailable { op, path, source },
        }
    }

    pub(crate) fn corrupt(path: impl ToString, reason: impl ToString) -> Self {
        DocketError::Corrupt {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn canceled(op: &'static str, path: impl ToString) -> Self {
        DocketError::Canceled {
            op,
            path: path.to_string(),
        }
    }
}

impl From<ObjectError> for DocketError {
    fn from(e: ObjectError) -> Self {
        DocketError::InvalidState(e.to_string())
    }
}

impl From<CoreError> for DocketError {
    fn from(e: CoreError) -> Self {
        DocketError::InvalidState(e.to_string())
    }
}

impl From<CoderError> for DocketError {
    fn from(e: CoderError) -> Self {
        DocketError::InvalidState(e.to_string())
    }
}

/// Result type for Docket operations.
pub type Result<T> = std::result::Result<T, DocketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        let contention = DocketError::ContentionExceeded {
            op: "serial.next",
            path: "serials/a".into(),
            attempts: 5,
        };
        let unavailable =
            DocketError::store("serial.next", "serials/a", StoreError::Unavailable("down".into()));
        assert!(contention.is_retryable());
        assert!(unavailable.is_retryable());

        assert!(!DocketError::NotFound { path: "users/1".into() }.is_retryable());
        assert!(!DocketError::InvalidState("x".into()).is_retryable());
        assert!(!DocketError::canceled("counter.read", "counters/c").is_retryable());
    }

    #[test]
    fn test_invalid_data_becomes_corrupt() {
        let err = DocketError::store(
            "table.get",
            "users/1",
            StoreError::InvalidData("bad json".into()),
        );
        assert!(matches!(err, DocketError::Corrupt { .. }));
    }

    #[test]
    fn test_message_carries_context() {
        let err =
            DocketError::store("counter.increment", "counters/hits_2", StoreError::Unavailable("timeout".into()));
        let msg = err.to_string();
        assert!(msg.contains("counter.increment"));
        assert!(msg.contains("counters/hits_2"));
        assert!(msg.contains("timeout"));
    }
}
