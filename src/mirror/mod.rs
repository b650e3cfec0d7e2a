// src/mirror/mod.rs

//! Local mirror of one resource kind.
//!
//! A [`Mirror`] lists the kind from a [`ListWatch`] source, keeps the result
//! in a [`Store`], and then follows the source's watch stream, invoking a
//! [`MirrorHandler`] once per observed transition. It owns reconnection:
//! source failures are retried with backoff and never reach the handler.
//!
//! All callbacks for a mirror come from the single task running
//! [`Mirror::run`], so events for a given key are delivered in order.

pub mod reflector;
pub mod store;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::BackoffPolicy;
use crate::object::RemoteObject;
use crate::source::{ListOptions, ListWatch};

pub use store::Store;

/// Receives the mirror's change callbacks.
///
/// Callbacks run on the mirror's task and should return quickly.
pub trait MirrorHandler: Send + Sync {
    fn on_add(&self, obj: &RemoteObject);

    /// Also invoked with `old == new` for every stored object on resync.
    fn on_update(&self, old: &RemoteObject, new: &RemoteObject);

    /// `obj` is the last state the mirror held for the object.
    fn on_delete(&self, obj: &RemoteObject);
}

/// List/watch mirror for a single kind.
pub struct Mirror {
    kind: String,
    source: Arc<dyn ListWatch>,
    options: ListOptions,
    store: Arc<Store>,
    resync_interval: Duration,
    backoff: BackoffPolicy,
    synced: AtomicBool,
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("resync_interval", &self.resync_interval)
            .field("stored", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl Mirror {
    /// `resync_interval` of zero disables periodic resync.
    pub fn new(
        kind: impl Into<String>,
        source: Arc<dyn ListWatch>,
        options: ListOptions,
        resync_interval: Duration,
    ) -> Self {
        Self {
            kind: kind.into(),
            source,
            options,
            store: Arc::new(Store::new()),
            resync_interval,
            backoff: BackoffPolicy::reconnect(),
            synced: AtomicBool::new(false),
        }
    }

    /// Override the reconnect backoff.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// True once the first list has been applied to the store.
    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    fn mark_synced(&self) {
        self.synced.store(true, Ordering::Release);
    }
}
