//! Optimistic read-modify-write with bounded retry.

use docket_core::DocPath;
use docket_store::{Document, DocumentStore, StoreExt, WriteOutcome};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::RetryPolicy;
use crate::error::{DocketError, Result};
use crate::scope::Scope;

/// Atomically transform the document at `path`.
///
/// `apply` sees the current document (or `None` when absent) and returns
/// the body to write plus the value to hand back to the caller. The write
/// is conditional on the version that was read; on conflict the whole
/// cycle repeats after a backoff, up to `policy.max_attempts` times.
///
/// `apply` may run several times and must not have side effects beyond
/// computing its result.
pub(crate) async fn update<S, T, F>(
    store: &S,
    scope: &Scope,
    policy: &RetryPolicy,
    op: &'static str,
    path: &DocPath,
    mut apply: F,
) -> Result<T>
where
    S: DocumentStore + ?Sized,
    F: FnMut(Option<&Document>) -> Result<(Value, T)> + Send,
    T: Send,
{
    let attempts = policy.attempts();

    for attempt in 1..=attempts {
        let tx = scope
            .run(store.begin(path.clone()))
            .await
            .ok_or_else(|| DocketError::canceled(op, path))?
            .map_err(|e| DocketError::store(op, path, e))?;

        let (body, out) = apply(tx.current())?;

        if scope.is_done() {
            return Err(DocketError::canceled(op, path));
        }

        match tx
            .commit(&body)
            .await
            .map_err(|e| DocketError::store(op, path, e))?
        {
            WriteOutcome::Committed(version) => {
                trace!(op, path = %path, version, attempt, "committed");
                return Ok(out);
            }
            WriteOutcome::Conflict if attempt < attempts => {
                let delay = policy.delay_for(attempt);
                debug!(op, path = %path, attempt, ?delay, "write conflict, retrying");
                if !scope.sleep(delay).await {
                    return Err(DocketError::canceled(op, path));
                }
            }
            WriteOutcome::Conflict => {
                debug!(op, path = %path, attempt, "write conflict on final attempt");
            }
        }
    }

    warn!(op, path = %path, attempts, "retry budget exhausted");
    Err(DocketError::ContentionExceeded {
        op,
        path: path.to_string(),
        attempts,
    })
}
