//! Configuration for Docket.
//!
//! Retry bounds and shard counts are tuning knobs, not contracts. Every
//! struct has a `Default` and deserializes with missing fields filled in
//! from it, so service code can load a partial config.

use std::time::Duration;

use docket_core::{Alphabet, Coder};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Bounded exponential backoff around optimistic-transaction conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt number `attempt` (1-based).
    ///
    /// The exponential step is capped at `max_delay`, then jittered to a
    /// uniform value in its upper half so colliding callers spread out.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let step = self
            .base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay);

        let half = step / 2;
        let spread = (step - half).as_nanos() as u64;
        if spread == 0 {
            return step;
        }
        half + Duration::from_nanos(rand::thread_rng().gen_range(0..=spread))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(5), Duration::from_millis(100))
    }
}

/// Configuration for sharded counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Shard count used by callers that do not pick one.
    pub default_shard_count: u32,
    pub retry: RetryPolicy,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            default_shard_count: 16,
            retry: RetryPolicy::default(),
        }
    }
}

/// Configuration for serial issuance and coding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub retry: RetryPolicy,
    pub alphabet: Alphabet,
    /// Zero-pad codes to this width so they sort like the integers.
    pub pad_width: Option<usize>,
}

impl SerialConfig {
    pub fn coder(&self) -> Coder {
        Coder {
            alphabet: self.alphabet,
            pad_width: self.pad_width,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::new(5, Duration::from_millis(10), Duration::from_millis(250)),
            alphabet: Alphabet::Base62,
            pad_width: None,
        }
    }
}

/// Configuration for tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Bounds the read-then-conditional-write cycle of `put` when writers
    /// race on one record.
    pub retry: RetryPolicy,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocketConfig {
    pub counter: CounterConfig,
    pub serial: SerialConfig,
    pub table: TableConfig,
    /// Deadline applied to every operation on top of the caller's scope.
    pub op_timeout: Option<Duration>,
}
