// src/notifier/mod.rs

//! Downstream notification sink.
//!
//! Controllers hand every observed change to a [`Notifier`] and never look at
//! what happens to it afterwards. Persisting notifications (to a directory,
//! a git repository, ...) is the notifier's business.
//!
//! - [`ChannelNotifier`] forwards notifications over a bounded mpsc channel
//!   to whatever consumes the receiving end. This is what the binary uses.
//! - Tests provide their own implementation that simply records what it was
//!   sent.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use tokio::sync::mpsc;

use crate::errors::{MirrorError, Result};
use crate::object::Key;

/// What happened to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// First time this controller reports the key.
    Add,
    /// The key was reported before; this is its current state.
    Update,
    /// The key is gone from the source.
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Add => "add",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(s)
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(Action::Add),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(format!(
                "invalid action: {other} (expected \"add\", \"update\" or \"delete\")"
            )),
        }
    }
}

/// One observed change, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub key: Key,
    /// Kind name of the controller that produced it, e.g. `pod`.
    pub kind: String,
    pub action: Action,
    /// Serialized object; empty for [`Action::Delete`].
    pub object: Vec<u8>,
}

impl Notification {
    pub fn upsert(key: Key, kind: impl Into<String>, action: Action, object: Vec<u8>) -> Self {
        Self {
            key,
            kind: kind.into(),
            action,
            object,
        }
    }

    pub fn delete(key: Key, kind: impl Into<String>) -> Self {
        Self {
            key,
            kind: kind.into(),
            action: Action::Delete,
            object: Vec::new(),
        }
    }

    /// Text form used by the stdout sink: a `# <action> <kind> <key>` header
    /// line followed by the payload, as one YAML document.
    pub fn render(&self) -> String {
        let mut out = format!("---\n# {} {} {}\n", self.action, self.kind, self.key);
        out.push_str(&String::from_utf8_lossy(&self.object));
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

/// Receives notifications from controllers.
///
/// `send` may wait (e.g. for channel capacity) but must not silently drop a
/// notification; failing to accept one is reported as an error.
pub trait Notifier: Send + Sync {
    fn send(&self, notification: Notification) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Notifier that forwards into a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver its notifications arrive on.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn send(&self, notification: Notification) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let key = notification.key.clone();
            self.tx
                .send(notification)
                .await
                .map_err(|_| MirrorError::NotifierClosed(key))
        })
    }
}
