// src/object/key.rs

use crate::errors::{MirrorError, Result};
use crate::object::RemoteObject;

/// Store key: `"namespace/name"`, or `"name"` for cluster-scoped objects.
pub type Key = String;

/// Derive the store key for an object.
///
/// An object without a name cannot be mirrored and is reported as malformed.
pub fn object_key(obj: &RemoteObject) -> Result<Key> {
    let name = obj.name();
    if name.is_empty() {
        return Err(MirrorError::MalformedObject(format!(
            "{} object has no metadata.name",
            if obj.kind.is_empty() { "untyped" } else { obj.kind.as_str() }
        )));
    }

    Ok(match obj.namespace() {
        Some(ns) => format!("{ns}/{name}"),
        None => name.to_string(),
    })
}

/// Split a key back into `(namespace, name)`.
pub fn split_key(key: &str) -> (Option<&str>, &str) {
    match key.split_once('/') {
        Some((ns, name)) => (Some(ns), name),
        None => (None, key),
    }
}

/// The identity used by exact-object exclusions: `"kind:namespace/name"`,
/// or `"kind:name"` when the object is cluster-scoped.
pub fn exclusion_key(kind: &str, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{kind}:{ns}/{name}"),
        None => format!("{kind}:{name}"),
    }
}
