//! Per-call cancellation scope.
//!
//! Every public operation takes a [`Scope`]: a cancellation token plus an
//! optional deadline. Operations observe it while waiting on store reads,
//! right before issuing a conditional write, and while sleeping between
//! retries. An issued write is never abandoned mid-flight, so an operation
//! that reports [`Canceled`](crate::DocketError::Canceled) has committed
//! nothing.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation token plus optional deadline for a single call.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    token: CancellationToken,
    /// Context-wide shutdown token, attached when an operation starts.
    shutdown: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl Scope {
    /// A scope that is never canceled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope driven by an existing token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            shutdown: None,
            deadline: None,
        }
    }

    /// Tighten the deadline to at most `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Tighten the deadline to at most `deadline`. A later deadline than the
    /// current one is ignored.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// A scope canceled whenever this one is, and also cancelable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            shutdown: self.shutdown.clone(),
            deadline: self.deadline,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the scope is canceled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled()
            || self.shutdown.as_ref().is_some_and(|s| s.is_cancelled())
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Bind this scope to a context's shutdown token and per-op timeout.
    pub(crate) fn bounded(&self, shutdown: &CancellationToken, timeout: Option<Duration>) -> Self {
        let scope = Self {
            token: self.token.clone(),
            shutdown: Some(shutdown.clone()),
            deadline: self.deadline,
        };
        match timeout {
            Some(t) => scope.with_timeout(t),
            None => scope,
        }
    }

    /// Completes when the scope is canceled or its deadline passes.
    pub async fn done(&self) {
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending().await,
            }
        };
        let shutdown = async {
            match &self.shutdown {
                Some(s) => s.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = shutdown => {}
            _ = deadline => {}
        }
    }

    /// Drive `fut` unless the scope ends first. Returns `None` if it did.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_done() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.done() => None,
            out = fut => Some(out),
        }
    }

    /// Sleep for `duration`, returning `false` if the scope ended first.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_done();
        }
        self.run(tokio::time::sleep(duration)).await.is_some()
    }
}
