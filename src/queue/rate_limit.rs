// src/queue/rate_limit.rs

//! Delayed and rate-limited scheduling on top of [`EventQueue`].
//!
//! The controller worker does not requeue: a failed notification is logged
//! and dropped, and a successful one calls [`EventQueue::forget`]. `add_after`
//! and `add_rate_limited` are for embedders whose notifier wants retries; the
//! per-key counters they keep are what `forget` clears.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::EventQueue;

impl EventQueue {
    /// Schedule `key` after `delay`. A zero delay adds immediately.
    pub fn add_after(self: &Arc<Self>, key: &str, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }
        if self.is_shutting_down() {
            return;
        }

        let queue = Arc::clone(self);
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(&key);
        });
    }

    /// Schedule `key` after its per-key backoff, and grow that backoff.
    pub fn add_rate_limited(self: &Arc<Self>, key: &str) {
        let attempt = {
            let mut state = self.state.lock();
            let count = state.requeues.entry(key.to_string()).or_insert(0);
            let attempt = *count;
            *count = count.saturating_add(1);
            attempt
        };

        let delay = self.rate_limit.delay_for_attempt(attempt);
        debug!(queue = %self.name, %key, attempt, ?delay, "rate-limited re-add");
        self.add_after(key, delay);
    }

    /// Reset the per-key backoff.
    pub fn forget(&self, key: &str) {
        self.state.lock().requeues.remove(key);
    }

    /// How many rate-limited re-adds `key` has had since it was last forgotten.
    pub fn num_requeues(&self, key: &str) -> u32 {
        self.state.lock().requeues.get(key).copied().unwrap_or(0)
    }
}
