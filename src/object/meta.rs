// src/object/meta.rs

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Object metadata as served by the remote API.
///
/// Well-known fields are named; anything else the server sends under
/// `metadata` lands in `extra` and is written back out untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Accepted as either a string or an integer on input.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "version_string"
    )]
    pub resource_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_fields: Option<Value>,

    /// Kept as a raw value: the exclusion filter only cares whether it is
    /// present, whatever its shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_references: Option<Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ObjectMeta {
    /// True when `ownerReferences` carries anything at all.
    ///
    /// `null`, an empty list and an empty map count as absent. Every other
    /// value, including shapes the API would never produce, counts as
    /// present.
    pub fn has_owner_references(&self) -> bool {
        match &self.owner_references {
            None | Some(Value::Null) => false,
            Some(Value::Array(refs)) => !refs.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// Namespace, with the empty string treated as cluster-scoped.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// Numeric view of the resource version, when it has one.
    pub fn resource_version_number(&self) -> Option<u64> {
        self.resource_version.as_deref()?.parse().ok()
    }
}

fn version_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "resourceVersion must be a string or an integer, got {other}"
        ))),
    }
}
