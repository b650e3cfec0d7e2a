// src/source/mod.rs

//! Remote object sources.
//!
//! The mirror talks to a [`ListWatch`] instead of a concrete API client. A
//! source lists the current objects of one kind together with the resource
//! version the list was taken at, and then streams changes that happened
//! after a given resource version.
//!
//! - [`manifest_dir::ManifestDirSource`] serves objects from manifest files
//!   on disk and is what the binary uses.
//! - Tests provide in-memory sources that can drop connections and fail on
//!   demand.

pub mod manifest_dir;
pub mod selector;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::object::RemoteObject;

pub use manifest_dir::ManifestDirSource;
pub use selector::LabelSelector;

/// Boxed future returned by [`ListWatch`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors a source may report. None of them are fatal to the mirror.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source could not be reached; retry later.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The requested resource version is too old to watch from; relist.
    #[error("resource version expired: {0}")]
    Expired(String),

    /// The source returned something that could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn is_expired(&self) -> bool {
        matches!(self, SourceError::Expired(_))
    }
}

/// Query parameters forwarded verbatim to the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Label selector string, empty for "everything".
    pub label_selector: String,
    /// Only objects in this namespace; empty for all namespaces.
    /// Cluster-scoped objects never match a non-empty namespace.
    pub namespace: String,
}

impl ListOptions {
    /// True if `obj` lives in the requested namespace.
    pub fn namespace_matches(&self, obj: &RemoteObject) -> bool {
        self.namespace.is_empty() || obj.namespace() == Some(self.namespace.as_str())
    }
}

/// Result of a full list.
#[derive(Debug, Clone, Default)]
pub struct ObjectList {
    /// Version to start watching from.
    pub resource_version: String,
    pub items: Vec<RemoteObject>,
}

/// One entry of a watch stream.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    Added(RemoteObject),
    Modified(RemoteObject),
    Deleted(RemoteObject),
    /// No object change; the stream has progressed to this version.
    Bookmark { resource_version: String },
    /// The stream failed. The receiver should be considered finished.
    Error(SourceError),
}

/// List + watch API over objects of a single kind.
///
/// A watch stream ends when the returned receiver yields `None`; the mirror
/// then watches again from the last version it saw.
pub trait ListWatch: Send + Sync {
    fn list<'a>(&'a self, options: &'a ListOptions) -> BoxFuture<'a, Result<ObjectList, SourceError>>;

    fn watch<'a>(
        &'a self,
        options: &'a ListOptions,
        resource_version: &'a str,
    ) -> BoxFuture<'a, Result<mpsc::UnboundedReceiver<WatchEvent>, SourceError>>;
}
