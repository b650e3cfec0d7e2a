// src/controller/core.rs

//! Pure worker state.
//!
//! [`WorkerCore`] turns "key K currently resolves to object O (or nothing)"
//! into the notification to emit, and remembers which keys it has already
//! reported so it can tell an add from an update. It performs no IO and
//! holds no locks: it is owned by the controller's single worker task.

use std::collections::HashSet;

use crate::errors::Result;
use crate::notifier::{Action, Notification};
use crate::object::{to_payload, Key, RemoteObject};

#[derive(Debug)]
pub struct WorkerCore {
    kind: String,
    unabridged: bool,
    known: HashSet<Key>,
}

impl WorkerCore {
    pub fn new(kind: impl Into<String>, unabridged: bool) -> Self {
        Self {
            kind: kind.into(),
            unabridged,
            known: HashSet::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.known.contains(key)
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    /// Build the notification for `key` given its current mirrored state.
    ///
    /// Does not change what is known; call [`WorkerCore::commit`] once the
    /// notification has been delivered.
    pub fn resolve(&self, key: &str, current: Option<&RemoteObject>) -> Result<Notification> {
        match current {
            Some(obj) => {
                let action = if self.is_known(key) {
                    Action::Update
                } else {
                    Action::Add
                };
                let payload = to_payload(obj, self.unabridged)?;
                Ok(Notification::upsert(key.to_string(), &self.kind, action, payload))
            }
            None => Ok(Notification::delete(key.to_string(), &self.kind)),
        }
    }

    /// Record that a notification for `key` with `action` was delivered.
    pub fn commit(&mut self, key: &str, action: Action) {
        match action {
            Action::Add | Action::Update => {
                self.known.insert(key.to_string());
            }
            Action::Delete => {
                self.known.remove(key);
            }
        }
    }
}
