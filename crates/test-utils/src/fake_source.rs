use std::collections::BTreeMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use resmirror::object::{Key, RemoteObject};
use resmirror::source::{
    BoxFuture, ListOptions, ListWatch, ObjectList, SourceError, WatchEvent,
};

/// In-memory `ListWatch` for tests.
///
/// - `add` / `modify` / `delete` stamp a fresh resource version and broadcast
///   to open watch streams.
/// - `watch(rv)` replays every recorded change newer than `rv` first.
/// - `pause_watchers` keeps open streams silent while changes are still
///   recorded; `send_raw` pushes an arbitrary event to open streams.
/// - `disconnect_watchers` ends open streams cleanly; `break_watchers` sends
///   them an error first.
/// - `compact` forgets history, so watching from an older version yields
///   `SourceError::Expired`.
/// - `fail_next_lists` / `fail_next_watches` inject `Unavailable` errors.
///
/// List options (selector and namespace) are recorded, not applied.
#[derive(Default)]
pub struct FakeSource {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    version: u64,
    items: BTreeMap<Key, RemoteObject>,
    history: Vec<(u64, WatchEvent)>,
    compacted_at: u64,
    paused: bool,
    watchers: Vec<mpsc::UnboundedSender<WatchEvent>>,
    failing_lists: u32,
    failing_watches: u32,
    list_calls: usize,
    watch_calls: usize,
    options: Vec<ListOptions>,
}

impl FakeState {
    fn record(&mut self, make: impl FnOnce(RemoteObject) -> WatchEvent, mut obj: RemoteObject) -> RemoteObject {
        self.version += 1;
        obj.metadata.resource_version = Some(self.version.to_string());
        let event = make(obj.clone());
        self.history.push((self.version, event.clone()));
        if !self.paused {
            self.watchers.retain(|tx| tx.send(event.clone()).is_ok());
        }
        obj
    }
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `obj`, returning it as stored (with its new version).
    pub fn add(&self, obj: RemoteObject) -> RemoteObject {
        let mut state = self.state.lock();
        let key = obj.key().expect("test object needs a name");
        let stored = state.record(WatchEvent::Added, obj);
        state.items.insert(key, stored.clone());
        stored
    }

    /// Replace `obj`. Works for keys the source never saw too.
    pub fn modify(&self, obj: RemoteObject) -> RemoteObject {
        let mut state = self.state.lock();
        let key = obj.key().expect("test object needs a name");
        let stored = state.record(WatchEvent::Modified, obj);
        state.items.insert(key, stored.clone());
        stored
    }

    /// Delete the object stored under `key`, if any.
    pub fn delete(&self, key: &str) -> Option<RemoteObject> {
        let mut state = self.state.lock();
        let obj = state.items.remove(key)?;
        Some(state.record(WatchEvent::Deleted, obj))
    }

    /// Close every open watch stream without an error.
    pub fn disconnect_watchers(&self) {
        self.state.lock().watchers.clear();
    }

    /// Send `err` on every open watch stream, then close them.
    pub fn break_watchers(&self, err: SourceError) {
        let mut state = self.state.lock();
        for tx in state.watchers.drain(..) {
            let _ = tx.send(WatchEvent::Error(err.clone()));
        }
    }

    /// Stop broadcasting to open streams until `resume_watchers`.
    pub fn pause_watchers(&self) {
        self.state.lock().paused = true;
    }

    pub fn resume_watchers(&self) {
        self.state.lock().paused = false;
    }

    /// Send `event` as-is to every open stream, bypassing version stamping.
    pub fn send_raw(&self, event: WatchEvent) {
        let mut state = self.state.lock();
        state.watchers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Emit a bookmark at the current version on every open stream.
    pub fn bookmark(&self) {
        let state = self.state.lock();
        let resource_version = state.version.to_string();
        for tx in &state.watchers {
            let _ = tx.send(WatchEvent::Bookmark {
                resource_version: resource_version.clone(),
            });
        }
    }

    /// Forget history; watching from any older version now fails as expired.
    pub fn compact(&self) {
        let mut state = self.state.lock();
        state.history.clear();
        state.compacted_at = state.version;
    }

    pub fn fail_next_lists(&self, n: u32) {
        self.state.lock().failing_lists = n;
    }

    pub fn fail_next_watches(&self, n: u32) {
        self.state.lock().failing_watches = n;
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }

    pub fn watch_calls(&self) -> usize {
        self.state.lock().watch_calls
    }

    pub fn open_watchers(&self) -> usize {
        let mut state = self.state.lock();
        state.watchers.retain(|tx| !tx.is_closed());
        state.watchers.len()
    }

    /// Selectors passed to every list and watch call, in order.
    pub fn selectors(&self) -> Vec<String> {
        self.state.lock().options.iter().map(|o| o.label_selector.clone()).collect()
    }

    /// Namespaces passed to every list and watch call, in order.
    pub fn namespaces(&self) -> Vec<String> {
        self.state.lock().options.iter().map(|o| o.namespace.clone()).collect()
    }

    pub fn resource_version(&self) -> String {
        self.state.lock().version.to_string()
    }
}

impl ListWatch for FakeSource {
    fn list<'a>(&'a self, options: &'a ListOptions) -> BoxFuture<'a, Result<ObjectList, SourceError>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.list_calls += 1;
            state.options.push(options.clone());

            if state.failing_lists > 0 {
                state.failing_lists -= 1;
                return Err(SourceError::Unavailable("injected list failure".to_string()));
            }

            Ok(ObjectList {
                resource_version: state.version.to_string(),
                items: state.items.values().cloned().collect(),
            })
        })
    }

    fn watch<'a>(
        &'a self,
        options: &'a ListOptions,
        resource_version: &'a str,
    ) -> BoxFuture<'a, Result<mpsc::UnboundedReceiver<WatchEvent>, SourceError>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.watch_calls += 1;
            state.options.push(options.clone());

            if state.failing_watches > 0 {
                state.failing_watches -= 1;
                return Err(SourceError::Unavailable("injected watch failure".to_string()));
            }

            let from: u64 = resource_version
                .parse()
                .map_err(|_| SourceError::Decode(format!("bad resource version {resource_version:?}")))?;
            if from < state.compacted_at {
                return Err(SourceError::Expired(resource_version.to_string()));
            }

            let (tx, rx) = mpsc::unbounded_channel();
            for (version, event) in &state.history {
                if *version > from {
                    let _ = tx.send(event.clone());
                }
            }
            state.watchers.push(tx);
            Ok(rx)
        })
    }
}
