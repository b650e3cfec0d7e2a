// src/source/manifest_dir.rs

//! A [`ListWatch`] source backed by manifest files on disk.
//!
//! Objects of kind `pod` live as one YAML or JSON document per file under
//! `<root>/pod/`. Listing parses every file matching the include globs;
//! watching uses a `notify` watcher on that directory and turns each burst
//! of filesystem events into `Added` / `Modified` / `Deleted` by diffing a
//! rescan against what was last served.
//!
//! Served state is keyed by object, not by file: renaming a manifest is a
//! `Modified`, and when several files declare the same object the first one
//! in file name order wins.
//!
//! The files carry no trustworthy resource version, so the source stamps its
//! own: one counter per source, bumped on every served change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{MirrorError, Result};
use crate::object::{Key, RemoteObject};
use crate::source::{
    BoxFuture, LabelSelector, ListOptions, ListWatch, ObjectList, SourceError, WatchEvent,
};

/// One served object, the file it came from and the version it was served at.
#[derive(Debug, Clone)]
struct Tracked {
    path: PathBuf,
    object: RemoteObject,
    version: u64,
}

impl Tracked {
    fn stamped(&self) -> RemoteObject {
        stamp(&self.object, self.version)
    }
}

#[derive(Debug, Default)]
struct DirState {
    version: u64,
    objects: HashMap<Key, Tracked>,
}

impl DirState {
    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Bring the served state in line with a fresh scan, returning the
    /// changes as watch events.
    ///
    /// `scanned` must be sorted by path.
    fn reconcile(&mut self, scanned: Vec<(PathBuf, RemoteObject)>) -> Vec<WatchEvent> {
        let mut events = Vec::new();
        let mut next: HashMap<Key, Tracked> = HashMap::with_capacity(scanned.len());

        for (path, object) in scanned {
            // Nameless manifests are rejected while scanning.
            let Ok(key) = object.key() else { continue };
            if let Some(kept) = next.get(&key) {
                warn!(%key, kept = ?kept.path, ignored = ?path, "object declared by several manifests");
                continue;
            }

            let tracked = match self.objects.remove(&key) {
                Some(prev) if prev.object == object && prev.path == path => prev,
                Some(_) => {
                    let t = Tracked { path, object, version: self.bump() };
                    events.push(WatchEvent::Modified(t.stamped()));
                    t
                }
                None => {
                    let t = Tracked { path, object, version: self.bump() };
                    events.push(WatchEvent::Added(t.stamped()));
                    t
                }
            };
            next.insert(key, tracked);
        }

        let mut gone: Vec<Tracked> = self.objects.drain().map(|(_, t)| t).collect();
        gone.sort_by(|a, b| a.path.cmp(&b.path));
        for t in gone {
            let version = self.bump();
            events.push(WatchEvent::Deleted(stamp(&t.object, version)));
        }

        self.objects = next;
        events
    }
}

/// Serves one kind's objects from `<root>/<kind>/`.
#[derive(Debug, Clone)]
pub struct ManifestDirSource {
    dir: PathBuf,
    include: GlobSet,
    state: Arc<Mutex<DirState>>,
}

impl ManifestDirSource {
    /// `include` are glob patterns matched against file names, e.g. `*.yaml`.
    pub fn new(root: impl AsRef<Path>, kind: &str, include: &[String]) -> Result<Self> {
        Ok(Self {
            dir: root.as_ref().join(kind),
            include: build_include_set(include)?,
            state: Arc::new(Mutex::new(DirState::default())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ListWatch for ManifestDirSource {
    fn list<'a>(
        &'a self,
        options: &'a ListOptions,
    ) -> BoxFuture<'a, std::result::Result<ObjectList, SourceError>> {
        Box::pin(async move {
            let query = Query::from_options(options)?;
            let scanned = scan_blocking(self.dir.clone(), self.include.clone(), query).await?;

            let mut state = self.state.lock();
            // Anything that changed since the last list or watch is stamped
            // with a fresh version; the emitted events are irrelevant here.
            let _ = state.reconcile(scanned);

            let mut items: Vec<RemoteObject> = state.objects.values().map(Tracked::stamped).collect();
            items.sort_by(|a, b| a.name().cmp(b.name()));

            debug!(dir = ?self.dir, count = items.len(), version = state.version, "listed manifests");
            Ok(ObjectList {
                resource_version: state.version.to_string(),
                items,
            })
        })
    }

    fn watch<'a>(
        &'a self,
        options: &'a ListOptions,
        resource_version: &'a str,
    ) -> BoxFuture<'a, std::result::Result<mpsc::UnboundedReceiver<WatchEvent>, SourceError>> {
        Box::pin(async move {
            let query = Query::from_options(options)?;

            {
                let state = self.state.lock();
                if state.version.to_string() != resource_version {
                    return Err(SourceError::Expired(format!(
                        "requested {resource_version}, source is at {}",
                        state.version
                    )));
                }
            }

            // Channel from the blocking notify callback into the async world.
            let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
            let mut watcher = RecommendedWatcher::new(
                move |res: notify::Result<Event>| {
                    // The receiver is gone once the watch task exits.
                    let _ = raw_tx.send(res);
                },
                Config::default(),
            )
            .map_err(|e| SourceError::Unavailable(format!("creating watcher: {e}")))?;

            watcher
                .watch(&self.dir, RecursiveMode::NonRecursive)
                .map_err(|e| SourceError::Unavailable(format!("watching {:?}: {e}", self.dir)))?;

            info!(dir = ?self.dir, "manifest watch started");

            let (tx, rx) = mpsc::unbounded_channel::<WatchEvent>();
            let dir = self.dir.clone();
            let include = self.include.clone();
            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                // Dropping the watcher stops filesystem notifications.
                let _watcher = watcher;

                // Catch changes made between the list and the watcher
                // being registered.
                if !rescan_and_send(&dir, &include, &query, &state, &tx).await {
                    return;
                }

                loop {
                    tokio::select! {
                        _ = tx.closed() => break,
                        raw = raw_rx.recv() => match raw {
                            None => break,
                            Some(Err(err)) => {
                                warn!(dir = ?dir, error = %err, "manifest watch error");
                                let _ = tx.send(WatchEvent::Error(SourceError::Unavailable(
                                    err.to_string(),
                                )));
                                break;
                            }
                            Some(Ok(event)) => {
                                let relevant = event.paths.iter().any(|p| is_manifest(&include, p));
                                if !relevant {
                                    continue;
                                }
                                debug!(?event, "manifest change");
                                if !rescan_and_send(&dir, &include, &query, &state, &tx).await {
                                    break;
                                }
                            }
                        }
                    }
                }

                debug!(dir = ?dir, "manifest watch finished");
            });

            Ok(rx)
        })
    }
}

/// Rescan, diff and forward. Returns false once the stream should end.
async fn rescan_and_send(
    dir: &Path,
    include: &GlobSet,
    query: &Query,
    state: &Mutex<DirState>,
    tx: &mpsc::UnboundedSender<WatchEvent>,
) -> bool {
    let scanned =
        match scan_blocking(dir.to_path_buf(), include.clone(), query.clone()).await {
            Ok(s) => s,
            Err(err) => {
                let _ = tx.send(WatchEvent::Error(err));
                return false;
            }
        };

    let events = state.lock().reconcile(scanned);
    for event in events {
        if tx.send(event).is_err() {
            return false;
        }
    }
    true
}

/// Parsed form of the [`ListOptions`] a list or watch was called with.
#[derive(Debug, Clone)]
struct Query {
    selector: LabelSelector,
    options: ListOptions,
}

impl Query {
    fn from_options(options: &ListOptions) -> std::result::Result<Self, SourceError> {
        let selector = LabelSelector::from_str(&options.label_selector)
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(Self {
            selector,
            options: options.clone(),
        })
    }

    fn matches(&self, obj: &RemoteObject) -> bool {
        self.options.namespace_matches(obj) && self.selector.matches(&obj.metadata.labels)
    }
}

fn stamp(object: &RemoteObject, version: u64) -> RemoteObject {
    let mut obj = object.clone();
    obj.metadata.resource_version = Some(version.to_string());
    obj
}

fn build_include_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|e| {
            MirrorError::ConfigError(format!("invalid include glob '{pat}': {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| MirrorError::ConfigError(format!("building include globset: {e}")))
}

fn is_manifest(include: &GlobSet, path: &Path) -> bool {
    path.file_name().is_some_and(|name| include.is_match(name))
}

async fn scan_blocking(
    dir: PathBuf,
    include: GlobSet,
    query: Query,
) -> std::result::Result<Vec<(PathBuf, RemoteObject)>, SourceError> {
    tokio::task::spawn_blocking(move || scan(&dir, &include, &query))
        .await
        .map_err(|e| SourceError::Unavailable(format!("scan task failed: {e}")))?
}

/// Parse every manifest in `dir` that matches `include` and `query`, sorted
/// by path.
///
/// Unreadable or malformed files are skipped with a warning.
fn scan(
    dir: &Path,
    include: &GlobSet,
    query: &Query,
) -> std::result::Result<Vec<(PathBuf, RemoteObject)>, SourceError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SourceError::Unavailable(format!("reading {dir:?}: {e}")))?;

    let mut objects = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(e) => e.path(),
            Err(err) => {
                warn!(dir = ?dir, error = %err, "failed to read directory entry");
                continue;
            }
        };

        if !path.is_file() || !is_manifest(include, &path) {
            continue;
        }

        match read_manifest(&path) {
            Ok(Some(obj)) if query.matches(&obj) => objects.push((path, obj)),
            Ok(_) => {}
            Err(err) => warn!(path = ?path, error = %err, "skipping malformed manifest"),
        }
    }

    objects.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(objects)
}

/// Read one manifest. Empty files yield `None`.
fn read_manifest(path: &Path) -> Result<Option<RemoteObject>> {
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(None);
    }

    let obj: RemoteObject = serde_yaml::from_str(&contents)?;
    obj.key()?;
    Ok(Some(obj))
}
