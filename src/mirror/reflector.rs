// src/mirror/reflector.rs

//! The list/watch loop behind [`Mirror::run`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::mirror::{Mirror, MirrorHandler};
use crate::object::RemoteObject;
use crate::source::{SourceError, WatchEvent};

/// How a single watch stream ended.
#[derive(Debug)]
enum StreamEnd {
    Cancelled,
    /// The source closed the stream; resume from the last version.
    Closed,
    Failed(SourceError),
}

impl Mirror {
    /// List, then follow the watch stream until `cancel` fires.
    ///
    /// Never returns an error: list and watch failures are logged and
    /// retried with backoff, a stream that closes before delivering anything
    /// is reopened after a backoff delay, and an expired resource version triggers a
    /// fresh list that is reconciled against the store.
    pub async fn run(&self, handler: Arc<dyn MirrorHandler>, cancel: CancellationToken) {
        let handler = handler.as_ref();
        let mut backoff = Backoff::new(self.backoff);
        let mut resync = resync_timer(self.resync_interval);

        info!(
            kind = %self.kind,
            selector = %self.options.label_selector,
            namespace = %self.options.namespace,
            "mirror started"
        );

        'relist: loop {
            let listed = tokio::select! {
                _ = cancel.cancelled() => break 'relist,
                res = self.source.list(&self.options) => res,
            };

            let list = match listed {
                Ok(list) => list,
                Err(err) => {
                    let delay = backoff.next_delay();
                    warn!(kind = %self.kind, error = %err, ?delay, "list failed; retrying");
                    if !sleep_or_cancel(delay, &cancel).await {
                        break 'relist;
                    }
                    continue 'relist;
                }
            };

            debug!(
                kind = %self.kind,
                count = list.items.len(),
                resource_version = %list.resource_version,
                "listed objects"
            );
            self.replace(list.items, handler);
            self.mark_synced();
            backoff.reset();

            let mut last_version = list.resource_version;

            loop {
                let opened = tokio::select! {
                    _ = cancel.cancelled() => break 'relist,
                    res = self.source.watch(&self.options, &last_version) => res,
                };

                let mut events = match opened {
                    Ok(rx) => rx,
                    Err(err) if err.is_expired() => {
                        info!(kind = %self.kind, error = %err, "watch version expired; relisting");
                        continue 'relist;
                    }
                    Err(err) => {
                        let delay = backoff.next_delay();
                        warn!(kind = %self.kind, error = %err, ?delay, "watch failed; relisting");
                        if !sleep_or_cancel(delay, &cancel).await {
                            break 'relist;
                        }
                        continue 'relist;
                    }
                };

                let mut delivered = false;
                let end = loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break StreamEnd::Cancelled,
                        _ = next_resync(&mut resync) => self.resync(handler),
                        event = events.recv() => match event {
                            None => break StreamEnd::Closed,
                            Some(WatchEvent::Error(err)) => break StreamEnd::Failed(err),
                            Some(event) => {
                                delivered = true;
                                if let Some(version) = self.apply_event(event, handler) {
                                    last_version = version;
                                }
                            }
                        },
                    }
                };

                match end {
                    StreamEnd::Cancelled => break 'relist,
                    StreamEnd::Closed if delivered => {
                        backoff.reset();
                        debug!(
                            kind = %self.kind,
                            resource_version = %last_version,
                            "watch stream closed; resuming"
                        );
                    }
                    StreamEnd::Closed => {
                        // Nothing arrived before the close: don't spin on a
                        // source that keeps hanging up.
                        let delay = backoff.next_delay();
                        debug!(
                            kind = %self.kind,
                            resource_version = %last_version,
                            ?delay,
                            "empty watch stream closed; resuming after backoff"
                        );
                        if !sleep_or_cancel(delay, &cancel).await {
                            break 'relist;
                        }
                    }
                    StreamEnd::Failed(err) if err.is_expired() => {
                        info!(kind = %self.kind, error = %err, "watch version expired; relisting");
                        continue 'relist;
                    }
                    StreamEnd::Failed(err) => {
                        let delay = backoff.next_delay();
                        warn!(kind = %self.kind, error = %err, ?delay, "watch stream failed; relisting");
                        if !sleep_or_cancel(delay, &cancel).await {
                            break 'relist;
                        }
                        continue 'relist;
                    }
                }
            }
        }

        info!(kind = %self.kind, "mirror stopped");
    }

    /// Reconcile the store with an authoritative list.
    ///
    /// New objects are added, objects whose version changed are updated, and
    /// stored objects missing from the list are deleted with their last
    /// known state.
    pub(crate) fn replace(&self, items: Vec<RemoteObject>, handler: &dyn MirrorHandler) {
        let mut listed: HashSet<String> = HashSet::with_capacity(items.len());

        for obj in items {
            let key = match obj.key() {
                Ok(k) => k,
                Err(err) => {
                    warn!(kind = %self.kind, error = %err, "skipping malformed listed object");
                    continue;
                }
            };
            listed.insert(key.clone());

            let new = Arc::new(obj);
            match self.store.insert_keyed(key, Arc::clone(&new)) {
                Some(old) if unchanged(&old, &new) => {}
                Some(old) => handler.on_update(&old, &new),
                None => handler.on_add(&new),
            }
        }

        for key in self.store.keys() {
            if listed.contains(&key) {
                continue;
            }
            if let Some(last) = self.store.remove(&key) {
                debug!(kind = %self.kind, %key, "object absent from list; deleting");
                handler.on_delete(&last);
            }
        }
    }

    /// Apply one watch event, returning the resource version it carried.
    fn apply_event(&self, event: WatchEvent, handler: &dyn MirrorHandler) -> Option<String> {
        match event {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) => {
                let version = obj.resource_version().map(str::to_string);
                self.upsert(obj, handler);
                version
            }
            WatchEvent::Deleted(obj) => {
                let version = obj.resource_version().map(str::to_string);
                self.delete(obj, handler);
                version
            }
            WatchEvent::Bookmark { resource_version } => Some(resource_version),
            WatchEvent::Error(_) => None,
        }
    }

    fn upsert(&self, obj: RemoteObject, handler: &dyn MirrorHandler) {
        let key = match obj.key() {
            Ok(k) => k,
            Err(err) => {
                warn!(kind = %self.kind, error = %err, "skipping malformed object");
                return;
            }
        };

        let new = Arc::new(obj);
        match self.store.get(&key) {
            Some(old) if is_stale(&old, &new) => {
                debug!(
                    kind = %self.kind,
                    %key,
                    stored = ?old.resource_version(),
                    received = ?new.resource_version(),
                    "ignoring stale update"
                );
            }
            Some(old) => {
                self.store.insert_keyed(key, Arc::clone(&new));
                handler.on_update(&old, &new);
            }
            None => {
                self.store.insert_keyed(key, Arc::clone(&new));
                handler.on_add(&new);
            }
        }
    }

    fn delete(&self, obj: RemoteObject, handler: &dyn MirrorHandler) {
        let key = match obj.key() {
            Ok(k) => k,
            Err(err) => {
                warn!(kind = %self.kind, error = %err, "skipping malformed deletion");
                return;
            }
        };

        match self.store.remove(&key) {
            Some(last) => handler.on_delete(&last),
            None => debug!(kind = %self.kind, %key, "deletion of unknown object ignored"),
        }
    }

    /// Re-deliver every stored object as an update.
    fn resync(&self, handler: &dyn MirrorHandler) {
        let objects = self.store.list();
        debug!(kind = %self.kind, count = objects.len(), "resync");
        for obj in objects {
            handler.on_update(&obj, &obj);
        }
    }
}

/// A stored object is only replaced by a newer numeric version.
///
/// Versions that are not both numeric cannot be ordered and are accepted.
fn is_stale(stored: &RemoteObject, received: &RemoteObject) -> bool {
    match (
        stored.metadata.resource_version_number(),
        received.metadata.resource_version_number(),
    ) {
        (Some(old), Some(new)) => new <= old,
        _ => false,
    }
}

fn unchanged(stored: &RemoteObject, listed: &RemoteObject) -> bool {
    match (stored.resource_version(), listed.resource_version()) {
        (Some(a), Some(b)) => a == b,
        _ => stored == listed,
    }
}

fn resync_timer(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(timer)
}

async fn next_resync(timer: &mut Option<Interval>) {
    match timer {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Sleep for `delay`; false if cancelled first.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
