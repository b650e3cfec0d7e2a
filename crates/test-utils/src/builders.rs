#![allow(dead_code)]

use serde_json::{json, Value};

use resmirror::object::RemoteObject;

/// Shorthand for a namespaced object with no extra fields.
pub fn object(kind: &str, namespace: &str, name: &str) -> RemoteObject {
    ObjectBuilder::new(kind, name).namespace(namespace).build()
}

/// Builder for `RemoteObject` to simplify test setup.
pub struct ObjectBuilder {
    obj: RemoteObject,
}

impl ObjectBuilder {
    pub fn new(kind: &str, name: &str) -> Self {
        let mut obj = RemoteObject {
            api_version: "v1".to_string(),
            kind: kind.to_string(),
            ..RemoteObject::default()
        };
        obj.metadata.name = name.to_string();
        Self { obj }
    }

    pub fn namespace(mut self, ns: &str) -> Self {
        self.obj.metadata.namespace = Some(ns.to_string());
        self
    }

    pub fn api_version(mut self, api_version: &str) -> Self {
        self.obj.api_version = api_version.to_string();
        self
    }

    pub fn resource_version(mut self, rv: &str) -> Self {
        self.obj.metadata.resource_version = Some(rv.to_string());
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.obj.metadata.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn annotation(mut self, key: &str, value: &str) -> Self {
        self.obj
            .metadata
            .annotations
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn self_link(mut self, link: &str) -> Self {
        self.obj.metadata.self_link = Some(link.to_string());
        self
    }

    /// Raw `ownerReferences` value, whatever its shape.
    pub fn owner_references(mut self, value: Value) -> Self {
        self.obj.metadata.owner_references = Some(value);
        self
    }

    /// Append a well-formed owner reference.
    pub fn owned_by(mut self, kind: &str, name: &str) -> Self {
        let entry = json!({ "apiVersion": "v1", "kind": kind, "name": name });
        match self.obj.metadata.owner_references.as_mut() {
            Some(Value::Array(refs)) => refs.push(entry),
            _ => self.obj.metadata.owner_references = Some(Value::Array(vec![entry])),
        }
        self
    }

    /// Fill the server-managed fields a payload must not carry.
    pub fn server_fields(mut self) -> Self {
        let meta = &mut self.obj.metadata;
        meta.uid = Some("2a4c3d6e-0000-4000-8000-000000000001".to_string());
        meta.self_link = Some(format!("/api/v1/{}/{}", self.obj.kind, meta.name));
        meta.generation = Some(3);
        meta.creation_timestamp = Some("2024-01-01T00:00:00Z".to_string());
        meta.managed_fields = Some(json!([{ "manager": "kubectl", "operation": "Update" }]));
        meta.resource_version = Some("42".to_string());
        self
    }

    pub fn status(mut self, value: Value) -> Self {
        self.obj.status = Some(value);
        self
    }

    /// Top-level field such as `spec` or `data`.
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.obj.extra.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> RemoteObject {
        self.obj
    }
}
