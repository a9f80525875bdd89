//! The object model: the capabilities every stored record shares.
//!
//! A record type implements [`Identify`], [`Own`] and [`Timestamp`]
//! explicitly, usually by delegating to an [`ObjectMeta`] field (and an
//! [`Owner`] field for owned records). Anything implementing all three plus
//! serde is an [`Object`] and can be stored through a table.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ObjectError;

/// Identity of a stored record.
pub trait Identify {
    /// The record id, empty if none has been assigned yet.
    fn id(&self) -> &str;

    /// Assign an id.
    ///
    /// Once the record has been persisted its id is frozen: assigning a
    /// different id fails with [`ObjectError::IdReassigned`]. Re-assigning the
    /// same id is accepted.
    fn set_id(&mut self, id: String) -> Result<(), ObjectError>;

    /// Name of the collection the record is stored in.
    fn collection_name(&self) -> &str;

    /// Whether the record has been written to (or read from) the store.
    fn is_persisted(&self) -> bool;

    fn mark_persisted(&mut self);

    fn has_id(&self) -> bool {
        !self.id().is_empty()
    }
}

/// Ownership tags used by callers for access scoping.
///
/// The defaults describe a global record: both tags are always empty and
/// setters are ignored.
pub trait Own {
    fn account_id(&self) -> &str {
        ""
    }

    fn user_id(&self) -> &str {
        ""
    }

    fn set_account_id(&mut self, _account_id: String) {}

    fn set_user_id(&mut self, _user_id: String) {}
}

/// Create/update timestamps in Unix milliseconds.
pub trait Timestamp {
    fn create_time(&self) -> Option<i64>;

    /// Set the create time. No-op if one is already present.
    fn set_create_time(&mut self, t: i64);

    fn update_time(&self) -> Option<i64>;

    /// Overwrite the update time unconditionally.
    fn set_update_time(&mut self, t: i64);

    /// Take over the timestamps of a stored copy that is about to be
    /// written over. A stored create time replaces ours; the update time is
    /// raised to at least the stored one.
    fn adopt_stored(&mut self, create_time: Option<i64>, update_time: Option<i64>);

    /// Record a mutation at wall time `now` and return the stored update time.
    ///
    /// The update time never goes backwards: if the clock reads at or before
    /// the previous update, the previous value plus one is used instead. The
    /// create time is filled in on the first call only.
    fn touch(&mut self, now: i64) -> i64 {
        let at = match self.update_time() {
            Some(prev) if prev >= now => prev + 1,
            _ => now,
        };
        self.set_create_time(at);
        self.set_update_time(at);
        at
    }
}

/// A record that can be stored through a table.
pub trait Object:
    Identify + Own + Timestamp + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Object for T where
    T: Identify + Own + Timestamp + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Identity and timestamp state shared by all record types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub id: String,
    pub collection_name: String,
    #[serde(default)]
    pub create_time: Option<i64>,
    #[serde(default)]
    pub update_time: Option<i64>,
    #[serde(skip)]
    persisted: bool,
}

impl ObjectMeta {
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(collection_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection_name: collection_name.into(),
            ..Self::default()
        }
    }
}

impl Identify for ObjectMeta {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) -> Result<(), ObjectError> {
        if id.is_empty() {
            return Err(ObjectError::EmptyId);
        }
        if self.persisted && self.id != id {
            return Err(ObjectError::IdReassigned {
                collection: self.collection_name.clone(),
                current: self.id.clone(),
                requested: id,
            });
        }
        self.id = id;
        Ok(())
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    fn is_persisted(&self) -> bool {
        self.persisted
    }

    fn mark_persisted(&mut self) {
        self.persisted = true;
    }
}

impl Timestamp for ObjectMeta {
    fn create_time(&self) -> Option<i64> {
        self.create_time
    }

    fn set_create_time(&mut self, t: i64) {
        if self.create_time.is_none() {
            self.create_time = Some(t);
        }
    }

    fn update_time(&self) -> Option<i64> {
        self.update_time
    }

    fn set_update_time(&mut self, t: i64) {
        self.update_time = Some(t);
    }

    fn adopt_stored(&mut self, create_time: Option<i64>, update_time: Option<i64>) {
        if create_time.is_some() {
            self.create_time = create_time;
        }
        if update_time > self.update_time {
            self.update_time = update_time;
        }
    }
}

/// Ownership tags carried by owned records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub user_id: String,
}

impl Owner {
    pub fn new(account_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            user_id: user_id.into(),
        }
    }
}
