// src/queue/mod.rs

//! Deduplicating work queue of object keys.
//!
//! The queue does not carry events, only keys: whoever processes a key reads
//! the latest state from the mirror. Scheduling a key many times before it
//! is processed therefore collapses into a single unit of work.
//!
//! Semantics:
//! - A key is pending at most once.
//! - A key is handed to at most one worker at a time. Re-adding it while it
//!   is being processed marks it dirty; [`EventQueue::done`] puts it back
//!   exactly once.
//! - After [`EventQueue::shut_down`], adds are ignored, pending keys are
//!   still handed out, and `get` returns `None` once the queue is drained.

pub mod rate_limit;

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::backoff::BackoffPolicy;
use crate::object::Key;

#[derive(Debug, Default)]
struct QueueState {
    /// Keys ready to be handed out, in scheduling order.
    queue: VecDeque<Key>,
    /// Keys that need processing: pending ones, plus processing ones that
    /// were re-added.
    dirty: HashSet<Key>,
    /// Keys currently handed out to a worker.
    processing: HashSet<Key>,
    /// Per-key failure counts for the rate limiter.
    requeues: HashMap<Key, u32>,
    shutting_down: bool,
}

/// Work queue shared by a controller's mirror callbacks and its worker.
#[derive(Debug)]
pub struct EventQueue {
    name: String,
    state: Mutex<QueueState>,
    available: Notify,
    rate_limit: BackoffPolicy,
}

impl EventQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_rate_limit(name, BackoffPolicy::per_item())
    }

    pub fn with_rate_limit(name: impl Into<String>, rate_limit: BackoffPolicy) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
            available: Notify::new(),
            rate_limit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schedule `key`. Idempotent while the key is pending; deferred while
    /// it is being processed.
    pub fn add(&self, key: &str) {
        {
            let mut state = self.state.lock();
            if state.shutting_down {
                trace!(queue = %self.name, %key, "add after shutdown ignored");
                return;
            }
            if !state.dirty.insert(key.to_string()) {
                trace!(queue = %self.name, %key, "already scheduled");
                return;
            }
            if state.processing.contains(key) {
                debug!(queue = %self.name, %key, "key in flight; deferring re-add");
                return;
            }
            state.queue.push_back(key.to_string());
        }
        self.available.notify_one();
    }

    /// Wait for the next key.
    ///
    /// Returns `None` once the queue is shut down and drained. The caller
    /// must call [`EventQueue::done`] when finished with the key.
    pub async fn get(&self) -> Option<Key> {
        loop {
            // Register interest before checking, so a wakeup between the
            // check and the await is not lost.
            let notified = self.available.notified();
            {
                let mut state = self.state.lock();
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Mark `key` as processed, re-queueing it if it was re-added meanwhile.
    pub fn done(&self, key: &str) {
        let requeued = {
            let mut state = self.state.lock();
            state.processing.remove(key);
            if state.dirty.contains(key) {
                state.queue.push_back(key.to_string());
                true
            } else {
                false
            }
        };

        if requeued {
            debug!(queue = %self.name, %key, "re-queued deferred key");
            self.available.notify_one();
        }
    }

    /// Stop accepting keys and wake every waiting worker.
    ///
    /// Keys already pending are still handed out; work in progress is not
    /// interrupted.
    pub fn shut_down(&self) {
        {
            let mut state = self.state.lock();
            if state.shutting_down {
                return;
            }
            state.shutting_down = true;
        }
        debug!(queue = %self.name, "queue shutting down");
        self.available.notify_waiters();
        // A worker that registered but has not started waiting yet picks
        // this permit up instead.
        self.available.notify_one();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().shutting_down
    }

    /// Number of keys waiting to be handed out.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys currently handed out.
    pub fn in_flight(&self) -> usize {
        self.state.lock().processing.len()
    }
}
