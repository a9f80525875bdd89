//! Sharded counters.
//!
//! A logical counter is split across `shard_count` documents at
//! `counters/{name}_{index}`. Each increment lands on one shard picked
//! uniformly at random, so concurrent writers rarely touch the same
//! document. Reads sum all shards; the sum is eventually consistent but no
//! committed increment is ever lost.

use docket_core::DocPath;
use docket_store::{Document, DocumentStore};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::CounterConfig;
use crate::context::Env;
use crate::error::{DocketError, Result};
use crate::retry;
use crate::scope::Scope;

/// Body of one counter shard document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterShard {
    pub counter_name: String,
    pub shard_index: u32,
    pub value: i64,
}

/// Handle for incrementing and reading sharded counters.
pub struct ShardedCounter<S: ?Sized> {
    env: Env<S>,
    config: CounterConfig,
}

impl<S: DocumentStore + ?Sized> ShardedCounter<S> {
    pub(crate) fn new(env: Env<S>, config: CounterConfig) -> Self {
        Self { env, config }
    }

    /// Shard count from configuration, for callers that do not pick one.
    pub fn default_shard_count(&self) -> u32 {
        self.config.default_shard_count
    }

    /// Add `delta` (possibly negative) to counter `name`.
    ///
    /// The target shard is created with `value = delta` if it does not
    /// exist yet. Fails with `ContentionExceeded` once the retry budget runs
    /// out, and with `InvalidState` when `shard_count` is zero.
    pub async fn increment(
        &self,
        scope: &Scope,
        name: &str,
        delta: i64,
        shard_count: u32,
    ) -> Result<()> {
        check_shard_count(name, shard_count)?;
        let index = rand::thread_rng().gen_range(0..shard_count);
        let path = DocPath::counter_shard(name, index)?;
        trace!(counter = name, shard = index, delta, "selected shard");

        let scope = self.env.scope(scope);
        retry::update(
            &*self.env.store,
            &scope,
            &self.config.retry,
            "counter.increment",
            &path,
            |current| {
                let value = match current {
                    Some(doc) => decode_shard(doc)?
                        .value
                        .checked_add(delta)
                        .ok_or_else(|| {
                            DocketError::InvalidState(format!("counter {name} overflows"))
                        })?,
                    None => delta,
                };
                let shard = CounterShard {
                    counter_name: name.to_string(),
                    shard_index: index,
                    value,
                };
                Ok((encode_shard(&shard)?, ()))
            },
        )
        .await
    }

    /// Sum of all shards of counter `name`. Missing shards count as zero.
    ///
    /// Concurrent increments may or may not be reflected.
    pub async fn read(&self, scope: &Scope, name: &str, shard_count: u32) -> Result<i64> {
        self.shards(scope, name, shard_count)
            .await?
            .into_iter()
            .try_fold(0i64, |total, v| total.checked_add(v))
            .ok_or_else(|| DocketError::InvalidState(format!("counter {name} overflows")))
    }

    /// Per-shard values of counter `name`, indexed by shard.
    pub async fn shards(&self, scope: &Scope, name: &str, shard_count: u32) -> Result<Vec<i64>> {
        check_shard_count(name, shard_count)?;
        let paths = (0..shard_count)
            .map(|i| DocPath::counter_shard(name, i))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let target = format!("counters/{name}_*");

        let scope = self.env.scope(scope);
        let docs = scope
            .run(self.env.store.get_many(&paths))
            .await
            .ok_or_else(|| DocketError::canceled("counter.read", &target))?
            .map_err(|e| DocketError::store("counter.read", &target, e))?;

        paths
            .iter()
            .map(|path| match docs.get(path) {
                Some(doc) => decode_shard(doc).map(|shard| shard.value),
                None => Ok(0),
            })
            .collect()
    }
}

impl<S: ?Sized> Clone for ShardedCounter<S> {
    fn clone(&self) -> Self {
        Self {
            env: self.env.clone(),
            config: self.config.clone(),
        }
    }
}

fn check_shard_count(name: &str, shard_count: u32) -> Result<()> {
    if shard_count == 0 {
        return Err(DocketError::InvalidState(format!(
            "counter {name}: shard count must be at least 1"
        )));
    }
    Ok(())
}

fn decode_shard(doc: &Document) -> Result<CounterShard> {
    CounterShard::deserialize(&doc.body).map_err(|e| DocketError::corrupt(&doc.path, e))
}

fn encode_shard(shard: &CounterShard) -> Result<serde_json::Value> {
    serde_json::to_value(shard)
        .map_err(|e| DocketError::InvalidState(format!("encode counter shard: {e}")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use docket_store::MemoryStore;
    use serde_json::json;

    use super::*;
    use crate::config::{DocketConfig, RetryPolicy};
    use crate::Context;

    fn context() -> Context<MemoryStore> {
        let mut config = DocketConfig::default();
        config.counter.retry = RetryPolicy::new(10, Duration::ZERO, Duration::from_millis(1));
        Context::new(MemoryStore::new(), config)
    }

    #[tokio::test]
    async fn test_read_after_increments() {
        let ctx = context();
        let counter = ctx.counter();
        let scope = Scope::new();

        for _ in 0..25 {
            counter.increment(&scope, "hits", 1, 4).await.unwrap();
        }
        assert_eq!(counter.read(&scope, "hits", 4).await.unwrap(), 25);

        let shards = counter.shards(&scope, "hits", 4).await.unwrap();
        assert_eq!(shards.len(), 4);
        assert_eq!(shards.iter().sum::<i64>(), 25);
    }

    #[tokio::test]
    async fn test_unknown_counter_reads_zero() {
        let ctx = context();
        assert_eq!(ctx.counter().read(&Scope::new(), "nothing", 8).await.unwrap(), 0);
        assert!(ctx.store().is_empty());
    }

    #[tokio::test]
    async fn test_negative_delta() {
        let ctx = context();
        let counter = ctx.counter();
        let scope = Scope::new();

        counter.increment(&scope, "balance", 10, 1).await.unwrap();
        counter.increment(&scope, "balance", -25, 1).await.unwrap();
        assert_eq!(counter.read(&scope, "balance", 1).await.unwrap(), -15);
    }

    #[tokio::test]
    async fn test_shard_body_shape() {
        let ctx = context();
        ctx.counter().increment(&Scope::new(), "solo", 3, 1).await.unwrap();

        let path = DocPath::counter_shard("solo", 0).unwrap();
        let doc = ctx.store().get(&path).await.unwrap().unwrap();
        assert_eq!(
            doc.body,
            json!({ "counter_name": "solo", "shard_index": 0, "value": 3 })
        );
    }

    #[tokio::test]
    async fn test_zero_shard_count_rejected() {
        let ctx = context();
        let counter = ctx.counter();
        let scope = Scope::new();

        assert!(matches!(
            counter.increment(&scope, "hits", 1, 0).await,
            Err(DocketError::InvalidState(_))
        ));
        assert!(matches!(
            counter.read(&scope, "hits", 0).await,
            Err(DocketError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_name_rejected() {
        let ctx = context();
        let err = ctx
            .counter()
            .increment(&Scope::new(), "a/b", 1, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, DocketError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_corrupt_shard() {
        let ctx = context();
        let path = DocPath::counter_shard("bad", 0).unwrap();
        ctx.store().set(&path, &json!({ "value": "many" })).await.unwrap();

        let err = ctx.counter().read(&Scope::new(), "bad", 1).await.unwrap_err();
        assert!(matches!(err, DocketError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_canceled_increment_leaves_value() {
        let ctx = context();
        let counter = ctx.counter();
        counter.increment(&Scope::new(), "hits", 5, 1).await.unwrap();

        let scope = Scope::new();
        scope.cancel();
        let err = counter.increment(&scope, "hits", 1, 1).await.unwrap_err();
        assert!(err.is_canceled());
        assert_eq!(counter.read(&Scope::new(), "hits", 1).await.unwrap(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_not_lost() {
        let ctx = context();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = ctx.counter();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    counter.increment(&Scope::new(), "hits", 2, 4).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(ctx.counter().read(&Scope::new(), "hits", 4).await.unwrap(), 800);
    }
}
