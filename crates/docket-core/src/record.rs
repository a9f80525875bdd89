//! Ready-made record variants.
//!
//! [`OwnedRecord`] carries account/user ownership tags; [`GlobalRecord`]
//! never does. Both wrap an arbitrary serde payload under `data`, so stored
//! bodies look like `{"id": .., "collection_name": .., "create_time": ..,
//! "update_time": .., ["account_id": .., "user_id": ..,] "data": {..}}`.

use serde::{Deserialize, Serialize};

use crate::error::ObjectError;
use crate::object::{Identify, ObjectMeta, Own, Owner, Timestamp};

/// A record scoped to an account and user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedRecord<T> {
    #[serde(flatten)]
    meta: ObjectMeta,
    #[serde(flatten)]
    owner: Owner,
    data: T,
}

impl<T> OwnedRecord<T> {
    pub fn new(collection_name: impl Into<String>, owner: Owner, data: T) -> Self {
        Self {
            meta: ObjectMeta::new(collection_name),
            owner,
            data,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

/// A record that belongs to no account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalRecord<T> {
    #[serde(flatten)]
    meta: ObjectMeta,
    data: T,
}

impl<T> GlobalRecord<T> {
    pub fn new(collection_name: impl Into<String>, data: T) -> Self {
        Self {
            meta: ObjectMeta::new(collection_name),
            data,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

macro_rules! delegate_meta {
    ($record:ident) => {
        impl<T> Identify for $record<T> {
            fn id(&self) -> &str {
                self.meta.id()
            }

            fn set_id(&mut self, id: String) -> Result<(), ObjectError> {
                self.meta.set_id(id)
            }

            fn collection_name(&self) -> &str {
                self.meta.collection_name()
            }

            fn is_persisted(&self) -> bool {
                self.meta.is_persisted()
            }

            fn mark_persisted(&mut self) {
                self.meta.mark_persisted()
            }
        }

        impl<T> Timestamp for $record<T> {
            fn create_time(&self) -> Option<i64> {
                self.meta.create_time()
            }

            fn set_create_time(&mut self, t: i64) {
                self.meta.set_create_time(t)
            }

            fn update_time(&self) -> Option<i64> {
                self.meta.update_time()
            }

            fn set_update_time(&mut self, t: i64) {
                self.meta.set_update_time(t)
            }

            fn adopt_stored(&mut self, create_time: Option<i64>, update_time: Option<i64>) {
                self.meta.adopt_stored(create_time, update_time)
            }
        }
    };
}

delegate_meta!(OwnedRecord);
delegate_meta!(GlobalRecord);

impl<T> Own for OwnedRecord<T> {
    fn account_id(&self) -> &str {
        &self.owner.account_id
    }

    fn user_id(&self) -> &str {
        &self.owner.user_id
    }

    fn set_account_id(&mut self, account_id: String) {
        self.owner.account_id = account_id;
    }

    fn set_user_id(&mut self, user_id: String) {
        self.owner.user_id = user_id;
    }
}

impl<T> Own for GlobalRecord<T> {}
