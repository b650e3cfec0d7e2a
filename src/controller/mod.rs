// src/controller/mod.rs

//! Per-kind controller.
//!
//! A [`Controller`] ties together, for one resource kind:
//! - a [`Mirror`] following the source (the single producer),
//! - the exclusion filter, applied in the mirror callbacks,
//! - an [`EventQueue`] of keys,
//! - one worker turning dequeued keys into notifications.
//!
//! Lifecycle: `Created → Started → Stopping → Stopped`. Stopping cancels the
//! mirror; once the mirror loop has returned the queue is shut down, so the
//! worker drains what is already scheduled and exits.

pub mod core;
pub mod factory;
mod handlers;
mod worker;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::filter::Exclusions;
use crate::mirror::{Mirror, MirrorHandler, Store};
use crate::notifier::Notifier;
use crate::queue::EventQueue;

use self::core::WorkerCore;
use self::handlers::EnqueueHandler;
use self::worker::run_worker;

pub use factory::{Factory, FactorySettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Created,
    Started,
    Stopping,
    Stopped,
}

struct Lifecycle {
    state: ControllerState,
    tasks: Vec<JoinHandle<()>>,
}

/// Mirrors one kind and reports its changes to a [`Notifier`].
pub struct Controller {
    kind: String,
    mirror: Arc<Mirror>,
    queue: Arc<EventQueue>,
    notifier: Arc<dyn Notifier>,
    exclusions: Arc<Exclusions>,
    unabridged: bool,
    cancel: CancellationToken,
    lifecycle: Mutex<Lifecycle>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("mirror", &self.mirror)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub(crate) fn new(
        kind: String,
        mirror: Mirror,
        notifier: Arc<dyn Notifier>,
        exclusions: Arc<Exclusions>,
        unabridged: bool,
    ) -> Self {
        let queue = Arc::new(EventQueue::new(kind.clone()));
        Self {
            kind,
            mirror: Arc::new(mirror),
            queue,
            notifier,
            exclusions,
            unabridged,
            cancel: CancellationToken::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: ControllerState::Created,
                tasks: Vec::new(),
            }),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn state(&self) -> ControllerState {
        self.lifecycle.lock().state
    }

    /// The mirror's store. Reads are snapshots.
    pub fn store(&self) -> &Arc<Store> {
        self.mirror.store()
    }

    pub fn has_synced(&self) -> bool {
        self.mirror.has_synced()
    }

    /// Keys waiting for the worker.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Synced, nothing queued and nothing being processed.
    pub fn is_idle(&self) -> bool {
        self.has_synced() && self.queue.is_empty() && self.queue.in_flight() == 0
    }

    /// Launch the mirror loop and the worker. Must be called from within a
    /// Tokio runtime. Only the first call has an effect.
    pub fn start(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != ControllerState::Created {
            warn!(kind = %self.kind, state = ?lifecycle.state, "start ignored");
            return;
        }

        let handler: Arc<dyn MirrorHandler> = Arc::new(EnqueueHandler::new(
            self.kind.clone(),
            Arc::clone(&self.exclusions),
            Arc::clone(&self.queue),
        ));

        let producer = {
            let mirror = Arc::clone(&self.mirror);
            let queue = Arc::clone(&self.queue);
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                mirror.run(handler, cancel).await;
                // No more callbacks can arrive; let the worker drain.
                queue.shut_down();
            })
        };

        let consumer = tokio::spawn(run_worker(
            Arc::clone(&self.queue),
            Arc::clone(self.mirror.store()),
            Arc::clone(&self.notifier),
            WorkerCore::new(self.kind.clone(), self.unabridged),
        ));

        lifecycle.tasks = vec![producer, consumer];
        lifecycle.state = ControllerState::Started;
        info!(kind = %self.kind, "controller started");
    }

    /// Stop the mirror, let the worker drain, and wait for both to exit.
    ///
    /// Calling this before [`Controller::start`], or more than once, does
    /// nothing.
    pub async fn stop(&self) {
        let tasks = {
            let mut lifecycle = self.lifecycle.lock();
            match lifecycle.state {
                ControllerState::Started => {
                    lifecycle.state = ControllerState::Stopping;
                    std::mem::take(&mut lifecycle.tasks)
                }
                state => {
                    debug!(kind = %self.kind, ?state, "stop ignored");
                    return;
                }
            }
        };

        info!(kind = %self.kind, "stopping controller");
        self.cancel.cancel();

        // Producer first, then the worker.
        for task in tasks {
            if let Err(err) = task.await {
                error!(kind = %self.kind, error = %err, "controller task failed");
            }
            // Covers a producer that died before shutting the queue down.
            self.queue.shut_down();
        }

        self.lifecycle.lock().state = ControllerState::Stopped;
        info!(kind = %self.kind, "controller stopped");
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        // Tasks of a controller dropped without `stop` wind down on their own.
        self.cancel.cancel();
    }
}
