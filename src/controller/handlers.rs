// src/controller/handlers.rs

//! Mirror callbacks: filter, then schedule the key.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::filter::{is_admitted, Exclusions};
use crate::mirror::MirrorHandler;
use crate::object::RemoteObject;
use crate::queue::EventQueue;

pub(crate) struct EnqueueHandler {
    kind: String,
    exclusions: Arc<Exclusions>,
    queue: Arc<EventQueue>,
}

impl EnqueueHandler {
    pub(crate) fn new(kind: String, exclusions: Arc<Exclusions>, queue: Arc<EventQueue>) -> Self {
        Self {
            kind,
            exclusions,
            queue,
        }
    }

    fn enqueue(&self, obj: &RemoteObject, event: &'static str) {
        if !is_admitted(&self.exclusions, &self.kind, obj) {
            trace!(
                kind = %self.kind,
                name = %obj.name(),
                namespace = ?obj.namespace(),
                event,
                "excluded"
            );
            return;
        }

        match obj.key() {
            Ok(key) => {
                trace!(kind = %self.kind, %key, event, "scheduling");
                self.queue.add(&key);
            }
            Err(err) => warn!(kind = %self.kind, event, error = %err, "cannot schedule object"),
        }
    }
}

impl MirrorHandler for EnqueueHandler {
    fn on_add(&self, obj: &RemoteObject) {
        self.enqueue(obj, "add");
    }

    fn on_update(&self, _old: &RemoteObject, new: &RemoteObject) {
        self.enqueue(new, "update");
    }

    fn on_delete(&self, obj: &RemoteObject) {
        self.enqueue(obj, "delete");
    }
}
