// src/object/payload.rs

//! Notification payload rendering.

use crate::errors::Result;
use crate::object::RemoteObject;

/// Render an object as the YAML payload carried by a notification.
///
/// Server-assigned volatile metadata is always removed so that a resync of
/// an unchanged object renders byte-identical output. `status` is removed
/// too unless `unabridged` is set.
pub fn to_payload(obj: &RemoteObject, unabridged: bool) -> Result<Vec<u8>> {
    let mut obj = obj.clone();

    let meta = &mut obj.metadata;
    meta.self_link = None;
    meta.uid = None;
    meta.resource_version = None;
    meta.generation = None;
    meta.creation_timestamp = None;
    meta.managed_fields = None;

    if !unabridged {
        obj.status = None;
    }

    let yaml = serde_yaml::to_string(&obj)?;
    Ok(yaml.into_bytes())
}
