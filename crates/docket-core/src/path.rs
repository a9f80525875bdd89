//! Document addressing.
//!
//! Every document lives at `{collection}/{id}`. Neither segment may be empty
//! or contain a `/`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Collection holding counter shards.
pub const COUNTERS_COLLECTION: &str = "counters";

/// Collection holding serial sequences.
pub const SERIALS_COLLECTION: &str = "serials";

/// The address of a single document.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocPath {
    collection: String,
    id: String,
}

impl DocPath {
    /// Build a path, validating both segments.
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Result<Self> {
        let collection = collection.into();
        let id = id.into();
        validate_segment(&collection)?;
        validate_segment(&id)?;
        Ok(Self { collection, id })
    }

    /// Path of shard `index` of counter `name`: `counters/{name}_{index}`.
    pub fn counter_shard(name: &str, index: u32) -> Result<Self> {
        Self::new(COUNTERS_COLLECTION, format!("{}_{}", name, index))
    }

    /// Path of serial `name`: `serials/{name}`.
    pub fn serial(name: &str) -> Result<Self> {
        Self::new(SERIALS_COLLECTION, name)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Check that a collection name, id, counter name or serial name is usable
/// as a path segment.
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() || segment.contains('/') {
        return Err(CoreError::InvalidName(segment.to_string()));
    }
    Ok(())
}

impl FromStr for DocPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (collection, id) = s
            .split_once('/')
            .ok_or_else(|| CoreError::MalformedPath(s.to_string()))?;
        Self::new(collection, id).map_err(|_| CoreError::MalformedPath(s.to_string()))
    }
}

impl fmt::Debug for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocPath({}/{})", self.collection, self.id)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
