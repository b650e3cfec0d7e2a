// src/mirror/store.rs

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::Result;
use crate::object::{Key, RemoteObject};

/// Keyed local copy of every mirrored object of one kind.
///
/// Readers get `Arc` snapshots; nothing handed out borrows from the map, so
/// a reader never blocks the producer beyond a single lookup.
#[derive(Debug, Default)]
pub struct Store {
    items: RwLock<HashMap<Key, Arc<RemoteObject>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<RemoteObject>> {
        self.items.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.read().contains_key(key)
    }

    /// Insert or replace an object, returning the previous one.
    pub fn insert(&self, obj: RemoteObject) -> Result<Option<Arc<RemoteObject>>> {
        let key = obj.key()?;
        Ok(self.items.write().insert(key, Arc::new(obj)))
    }

    pub(crate) fn insert_keyed(&self, key: Key, obj: Arc<RemoteObject>) -> Option<Arc<RemoteObject>> {
        self.items.write().insert(key, obj)
    }

    pub fn remove(&self, key: &str) -> Option<Arc<RemoteObject>> {
        self.items.write().remove(key)
    }

    pub fn keys(&self) -> Vec<Key> {
        self.items.read().keys().cloned().collect()
    }

    /// Snapshot of every stored object.
    pub fn list(&self) -> Vec<Arc<RemoteObject>> {
        self.items.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}
