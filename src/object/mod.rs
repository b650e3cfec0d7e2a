// src/object/mod.rs

//! Mirrored object model.
//!
//! Remote objects have an open-ended shape. [`RemoteObject`] names the
//! fields the mirror and the filter need and keeps everything else in
//! pass-through maps, so an object read from the source serializes back out
//! with its unknown fields intact.

pub mod key;
pub mod meta;
pub mod payload;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use key::{exclusion_key, object_key, split_key, Key};
pub use meta::ObjectMeta;
pub use payload::to_payload;

/// One object of some resource kind, as served by the remote API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,

    /// `spec`, `data` and any other top-level field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteObject {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace()
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata.resource_version.as_deref()
    }

    pub fn has_owner_references(&self) -> bool {
        self.metadata.has_owner_references()
    }

    /// Store key for this object; see [`object_key`].
    pub fn key(&self) -> crate::errors::Result<Key> {
        object_key(self)
    }
}
