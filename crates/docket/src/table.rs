//! Collection-scoped CRUD and query.
//!
//! A [`Table`] maps records of one type onto the documents of one
//! collection. Records without an id get one from the serial of the same
//! name (or a configured one) on their first `put`.

use std::marker::PhantomData;

use docket_core::{now_millis, path::validate_segment, DocPath, Filter, Object};
use docket_store::{Document, DocumentStore};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::context::Env;
use crate::counter::ShardedCounter;
use crate::error::{DocketError, Result};
use crate::retry;
use crate::scope::Scope;
use crate::serial::Serial;

/// Counter kept in step with the number of records in the table.
#[derive(Debug, Clone)]
struct Tally {
    name: String,
    shard_count: u32,
}

/// Typed access to the records of one collection.
pub struct Table<S: ?Sized, R> {
    env: Env<S>,
    collection: String,
    retry: RetryPolicy,
    serial_name: String,
    serial: Serial<S>,
    counter: ShardedCounter<S>,
    tally: Option<Tally>,
    _record: PhantomData<fn() -> R>,
}

impl<S: DocumentStore + ?Sized, R: Object> Table<S, R> {
    pub(crate) fn new(
        env: Env<S>,
        collection: &str,
        retry: RetryPolicy,
        serial: Serial<S>,
        counter: ShardedCounter<S>,
    ) -> Result<Self> {
        validate_segment(collection)?;
        Ok(Self {
            env,
            collection: collection.to_string(),
            retry,
            serial_name: collection.to_string(),
            serial,
            counter,
            tally: None,
            _record: PhantomData,
        })
    }

    /// Allocate ids from serial `name` instead of the collection's own.
    pub fn with_serial(mut self, name: &str) -> Result<Self> {
        validate_segment(name)?;
        self.serial_name = name.to_string();
        Ok(self)
    }

    /// Keep counter `name` at the number of records: +1 when `put` creates
    /// a record, -1 when `delete` removes one.
    pub fn with_counter(mut self, name: &str, shard_count: u32) -> Result<Self> {
        validate_segment(name)?;
        if shard_count == 0 {
            return Err(DocketError::InvalidState(format!(
                "counter {name}: shard count must be at least 1"
            )));
        }
        self.tally = Some(Tally {
            name: name.to_string(),
            shard_count,
        });
        Ok(self)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Load the record with `id`.
    pub async fn get(&self, scope: &Scope, id: &str) -> Result<R> {
        let path = DocPath::new(&self.collection, id)?;
        let scope = self.env.scope(scope);

        let doc = scope
            .run(self.store().get(&path))
            .await
            .ok_or_else(|| DocketError::canceled("table.get", &path))?
            .map_err(|e| DocketError::store("table.get", &path, e))?
            .ok_or_else(|| DocketError::NotFound {
                path: path.to_string(),
            })?;

        self.decode(doc)
    }

    /// Write `record`, creating it if needed.
    ///
    /// Allocates an id when the record has none, fills in the create time
    /// on first write, advances the update time, and marks the record
    /// persisted. When a document already exists under the id, its create
    /// time is kept and the new update time lands above its update time.
    pub async fn put(&self, scope: &Scope, record: &mut R) -> Result<()> {
        if record.collection_name() != self.collection {
            return Err(DocketError::InvalidState(format!(
                "record of collection {:?} put into table {:?}",
                record.collection_name(),
                self.collection
            )));
        }

        let scope = self.env.scope(scope);
        if !record.has_id() {
            let id = self.serial.code(&scope, &self.serial_name).await?;
            debug!(collection = %self.collection, id = %id, "allocated id");
            record.set_id(id)?;
        }
        let path = DocPath::new(&self.collection, record.id())?;

        let created = retry::update(
            self.store(),
            &scope,
            &self.retry,
            "table.put",
            &path,
            |current| {
                if let Some(doc) = current {
                    let stored =
                        R::deserialize(&doc.body).map_err(|e| DocketError::corrupt(&path, e))?;
                    if !record.is_persisted() {
                        debug!(path = %path, version = doc.version, "new record replaces existing document");
                    }
                    record.adopt_stored(stored.create_time(), stored.update_time());
                }
                record.touch(now_millis());
                let body = serde_json::to_value(&*record)
                    .map_err(|e| DocketError::InvalidState(format!("encode {path}: {e}")))?;
                Ok((body, current.is_none()))
            },
        )
        .await?;
        record.mark_persisted();

        if created {
            self.adjust_tally(&scope, 1).await?;
        }
        Ok(())
    }

    /// Remove the record with `id`. Returns whether it existed.
    pub async fn delete(&self, scope: &Scope, id: &str) -> Result<bool> {
        let path = DocPath::new(&self.collection, id)?;
        let scope = self.env.scope(scope);
        if scope.is_done() {
            return Err(DocketError::canceled("table.delete", &path));
        }

        // Like commits in the retry loop, an issued delete is not raced
        // against the scope.
        let existed = self
            .store()
            .delete(&path)
            .await
            .map_err(|e| DocketError::store("table.delete", &path, e))?;
        if existed {
            self.adjust_tally(&scope, -1).await?;
        }
        Ok(existed)
    }

    /// Records whose `field` compares to `value` under `op`
    /// (`==`, `!=`, `<`, `<=`, `>`, `>=`). `field` may be a dotted path.
    pub async fn search(
        &self,
        scope: &Scope,
        field: &str,
        op: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<R>> {
        let filter = Filter::parse(field, op, value)?;
        self.search_by(scope, &filter).await
    }

    pub async fn search_by(&self, scope: &Scope, filter: &Filter) -> Result<Vec<R>> {
        let target = format!("{}?{}", self.collection, filter);
        let scope = self.env.scope(scope);

        let docs = scope
            .run(self.store().query(&self.collection, filter))
            .await
            .ok_or_else(|| DocketError::canceled("table.search", &target))?
            .map_err(|e| DocketError::store("table.search", &target, e))?;

        docs.into_iter().map(|doc| self.decode(doc)).collect()
    }

    /// Current value of the bound counter.
    pub async fn count(&self, scope: &Scope) -> Result<i64> {
        let tally = self.tally.as_ref().ok_or_else(|| {
            DocketError::InvalidState(format!("table {} has no counter", self.collection))
        })?;
        self.counter
            .read(scope, &tally.name, tally.shard_count)
            .await
    }

    fn store(&self) -> &S {
        &self.env.store
    }

    async fn adjust_tally(&self, scope: &Scope, delta: i64) -> Result<()> {
        let Some(tally) = &self.tally else {
            return Ok(());
        };
        let result = self
            .counter
            .increment(scope, &tally.name, delta, tally.shard_count)
            .await;
        if let Err(e) = &result {
            warn!(collection = %self.collection, counter = %tally.name, delta, error = %e, "counter out of step");
        }
        result
    }

    fn decode(&self, doc: Document) -> Result<R> {
        let Document { path, body, .. } = doc;
        let mut record: R =
            serde_json::from_value(body).map_err(|e| DocketError::corrupt(&path, e))?;

        if !record.has_id() {
            record.set_id(path.id().to_string())?;
        } else if record.id() != path.id() {
            return Err(DocketError::corrupt(
                &path,
                format!("body id {:?} does not match path", record.id()),
            ));
        }
        record.mark_persisted();
        Ok(record)
    }
}

impl<S: ?Sized, R> Clone for Table<S, R> {
    fn clone(&self) -> Self {
        Self {
            env: self.env.clone(),
            collection: self.collection.clone(),
            retry: self.retry.clone(),
            serial_name: self.serial_name.clone(),
            serial: self.serial.clone(),
            counter: self.counter.clone(),
            tally: self.tally.clone(),
            _record: PhantomData,
        }
    }
}
