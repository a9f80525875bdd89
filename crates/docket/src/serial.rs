//! Serial issuance.
//!
//! A serial is a single document at `serials/{name}` holding the next value
//! to hand out. Each [`Serial::next`] is an optimistic read-increment-write,
//! so every issued value goes to exactly one caller, starting at 1.
//! [`Serial::code`] turns the issued value into a short string with the
//! configured [`Coder`].

use docket_core::{Coder, DocPath};
use docket_store::{Document, DocumentStore};
use serde::{Deserialize, Serialize};

use crate::config::SerialConfig;
use crate::context::Env;
use crate::error::{DocketError, Result};
use crate::retry;
use crate::scope::Scope;

/// Body of a serial document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialState {
    pub serial_name: String,
    /// The value the next call to `next` will return.
    pub next_value: i64,
}

/// Handle for issuing serial numbers and codes.
pub struct Serial<S: ?Sized> {
    env: Env<S>,
    config: SerialConfig,
}

impl<S: DocumentStore + ?Sized> Serial<S> {
    pub(crate) fn new(env: Env<S>, config: SerialConfig) -> Self {
        Self { env, config }
    }

    pub fn coder(&self) -> Coder {
        self.config.coder()
    }

    /// Issue the next value of serial `name`. The first value is 1.
    pub async fn next(&self, scope: &Scope, name: &str) -> Result<i64> {
        let path = DocPath::serial(name)?;
        let scope = self.env.scope(scope);

        retry::update(
            &*self.env.store,
            &scope,
            &self.config.retry,
            "serial.next",
            &path,
            |current| {
                let issued = match current {
                    Some(doc) => decode_state(doc)?.next_value,
                    None => 1,
                };
                let next_value = issued.checked_add(1).ok_or_else(|| {
                    DocketError::InvalidState(format!("serial {name} is exhausted"))
                })?;
                let state = SerialState {
                    serial_name: name.to_string(),
                    next_value,
                };
                let body = serde_json::to_value(&state)
                    .map_err(|e| DocketError::InvalidState(format!("encode serial: {e}")))?;
                Ok((body, issued))
            },
        )
        .await
    }

    /// Issue the next value of serial `name`, encoded.
    pub async fn code(&self, scope: &Scope, name: &str) -> Result<String> {
        let coder = self.coder();
        coder.check()?;
        let value = self.next(scope, name).await?;
        Ok(coder.encode(value)?)
    }

    /// The value the next call to `next` would return, without issuing it.
    pub async fn peek(&self, scope: &Scope, name: &str) -> Result<i64> {
        let path = DocPath::serial(name)?;
        let scope = self.env.scope(scope);

        let doc = scope
            .run(self.env.store.get(&path))
            .await
            .ok_or_else(|| DocketError::canceled("serial.peek", &path))?
            .map_err(|e| DocketError::store("serial.peek", &path, e))?;

        match doc {
            Some(doc) => Ok(decode_state(&doc)?.next_value),
            None => Ok(1),
        }
    }
}

impl<S: ?Sized> Clone for Serial<S> {
    fn clone(&self) -> Self {
        Self {
            env: self.env.clone(),
            config: self.config.clone(),
        }
    }
}

fn decode_state(doc: &Document) -> Result<SerialState> {
    let state =
        SerialState::deserialize(&doc.body).map_err(|e| DocketError::corrupt(&doc.path, e))?;
    if state.next_value < 1 {
        return Err(DocketError::corrupt(
            &doc.path,
            format!("next_value {} is below 1", state.next_value),
        ));
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use docket_core::Alphabet;
    use docket_store::MemoryStore;
    use serde_json::json;

    use super::*;
    use crate::config::{DocketConfig, RetryPolicy};
    use crate::Context;

    fn context() -> Context<MemoryStore> {
        let mut config = DocketConfig::default();
        config.serial.retry = RetryPolicy::new(20, Duration::ZERO, Duration::from_millis(1));
        Context::new(MemoryStore::new(), config)
    }

    #[tokio::test]
    async fn test_starts_at_one() {
        let ctx = context();
        let serial = ctx.serial();
        let scope = Scope::new();

        assert_eq!(serial.peek(&scope, "orders").await.unwrap(), 1);
        assert_eq!(serial.next(&scope, "orders").await.unwrap(), 1);
        assert_eq!(serial.next(&scope, "orders").await.unwrap(), 2);
        assert_eq!(serial.next(&scope, "invoices").await.unwrap(), 1);
        assert_eq!(serial.peek(&scope, "orders").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_state_body_shape() {
        let ctx = context();
        ctx.serial().next(&Scope::new(), "orders").await.unwrap();

        let doc = ctx
            .store()
            .get(&DocPath::serial("orders").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.body, json!({ "serial_name": "orders", "next_value": 2 }));
    }

    #[tokio::test]
    async fn test_code_uses_coder() {
        let mut config = DocketConfig::default();
        config.serial.alphabet = Alphabet::Base36;
        config.serial.pad_width = Some(4);
        let ctx = Context::new(MemoryStore::new(), config);
        let serial = ctx.serial();
        let scope = Scope::new();

        assert_eq!(serial.code(&scope, "users").await.unwrap(), "0001");
        assert_eq!(serial.code(&scope, "users").await.unwrap(), "0002");
        assert_eq!(serial.coder().decode("0002").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_oversized_pad_issues_nothing() {
        let mut config = DocketConfig::default();
        config.serial.pad_width = Some(usize::MAX);
        let ctx = Context::new(MemoryStore::new(), config);
        let serial = ctx.serial();
        let scope = Scope::new();

        let err = serial.code(&scope, "users").await.unwrap_err();
        assert!(matches!(err, DocketError::InvalidState(_)));
        assert_eq!(serial.peek(&scope, "users").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_serial() {
        let ctx = context();
        let path = DocPath::serial("full").unwrap();
        ctx.store()
            .set(&path, &json!({ "serial_name": "full", "next_value": i64::MAX }))
            .await
            .unwrap();

        let err = ctx.serial().next(&Scope::new(), "full").await.unwrap_err();
        assert!(matches!(err, DocketError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_corrupt_state() {
        let ctx = context();
        let path = DocPath::serial("bad").unwrap();
        ctx.store()
            .set(&path, &json!({ "serial_name": "bad", "next_value": 0 }))
            .await
            .unwrap();

        let err = ctx.serial().next(&Scope::new(), "bad").await.unwrap_err();
        assert!(matches!(err, DocketError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_canceled_next_issues_nothing() {
        let ctx = context();
        let serial = ctx.serial();
        serial.next(&Scope::new(), "orders").await.unwrap();

        let scope = Scope::new();
        scope.cancel();
        assert!(serial.next(&scope, "orders").await.unwrap_err().is_canceled());
        assert_eq!(serial.next(&Scope::new(), "orders").await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_next_unique() {
        let ctx = context();
        let mut handles = Vec::new();
        for _ in 0..10 {
            let serial = ctx.serial();
            handles.push(tokio::spawn(async move {
                let mut got = Vec::new();
                for _ in 0..10 {
                    got.push(serial.next(&Scope::new(), "orders").await.unwrap());
                }
                got
            }));
        }

        let mut issued = BTreeSet::new();
        for handle in handles {
            for value in handle.await.unwrap() {
                assert!(issued.insert(value), "value {value} issued twice");
            }
        }
        assert_eq!(issued, (1..=100).collect::<BTreeSet<i64>>());
    }
}
