use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

use resmirror::errors::{MirrorError, Result};
use resmirror::notifier::{Action, Notification, Notifier};

/// A notifier that records everything it is sent.
///
/// - `close_gate` makes every `send` wait until `open_gate`; `waiting()`
///   reports how many sends are currently held.
/// - `fail_next(n)` rejects the next `n` sends without recording them.
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    gate: watch::Sender<bool>,
    waiting: AtomicUsize,
    failing: AtomicUsize,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingNotifier {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            sent: Mutex::new(Vec::new()),
            gate,
            waiting: AtomicUsize::new(0),
            failing: AtomicUsize::new(0),
        }
    }

    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, n: usize) {
        self.failing.store(n, Ordering::SeqCst);
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }

    pub fn for_key(&self, key: &str) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.key == key)
            .cloned()
            .collect()
    }

    pub fn actions_for(&self, key: &str) -> Vec<Action> {
        self.for_key(key).into_iter().map(|n| n.action).collect()
    }

    /// True if any recorded payload contains `needle`.
    pub fn any_payload_contains(&self, needle: &str) -> bool {
        self.sent
            .lock()
            .iter()
            .any(|n| String::from_utf8_lossy(&n.object).contains(needle))
    }

    fn take_failure(&self) -> bool {
        self.failing
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, notification: Notification) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut gate = self.gate.subscribe();
            let open = *gate.borrow_and_update();
            if !open {
                self.waiting.fetch_add(1, Ordering::SeqCst);
                let _ = gate.wait_for(|open| *open).await;
                self.waiting.fetch_sub(1, Ordering::SeqCst);
            }

            if self.take_failure() {
                return Err(MirrorError::NotifierClosed(notification.key));
            }

            self.sent.lock().push(notification);
            Ok(())
        })
    }
}
