// src/config/model.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::controller::FactorySettings;
use crate::filter::Exclusions;
use crate::source::LabelSelector;

/// Configuration exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [source]
/// manifest_dir = "./manifests"
/// kinds = ["pod", "configmap"]
/// namespace = ""   # all namespaces
///
/// [filter]
/// selector = "app=web"
/// exclude_namespaces = ["kube-.*"]
/// exclude_objects = ["configmap:kube-system/kube-dns"]
/// exclude_having_owner_ref = true
///
/// [sync]
/// resync_interval = 900
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub source: SourceSection,

    #[serde(default)]
    pub filter: FilterSection,

    #[serde(default)]
    pub sync: SyncSection,
}

/// `[source]` section: where objects come from and which kinds to mirror.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    /// Root directory; each kind is read from `<manifest_dir>/<kind>/`.
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: PathBuf,

    /// Kinds to mirror, one controller each.
    #[serde(default)]
    pub kinds: Vec<String>,

    /// File name globs that count as manifests.
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Only mirror objects from this namespace; empty for all.
    #[serde(default)]
    pub namespace: String,
}

fn default_manifest_dir() -> PathBuf {
    PathBuf::from("./manifests")
}

fn default_include() -> Vec<String> {
    vec!["*.yaml".to_string(), "*.yml".to_string(), "*.json".to_string()]
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            manifest_dir: default_manifest_dir(),
            kinds: Vec::new(),
            include: default_include(),
            namespace: String::new(),
        }
    }
}

/// `[filter]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterSection {
    /// Label selector passed to every list/watch call.
    #[serde(default)]
    pub selector: String,

    /// Regexes; a namespace fully matching one is excluded.
    #[serde(default)]
    pub exclude_namespaces: Vec<String>,

    /// Kinds never mirrored.
    #[serde(default)]
    pub exclude_kinds: Vec<String>,

    /// Single objects, `kind:namespace/name` or `kind:name`.
    #[serde(default)]
    pub exclude_objects: Vec<String>,

    /// Exclude every object carrying an owner reference.
    #[serde(default)]
    pub exclude_having_owner_ref: bool,
}

/// `[sync]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
    /// Full resync period in seconds; 0 disables it.
    #[serde(default = "default_resync_interval")]
    pub resync_interval: u64,

    /// Keep `status` in notification payloads.
    #[serde(default)]
    pub unabridged: bool,
}

fn default_resync_interval() -> u64 {
    900
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            resync_interval: default_resync_interval(),
            unabridged: false,
        }
    }
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)`, which
/// compiles the exclusion rules and the label selector once.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub source: SourceSection,
    pub filter: FilterSection,
    pub sync: SyncSection,
    exclusions: Arc<Exclusions>,
    selector: LabelSelector,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        raw: RawConfigFile,
        exclusions: Exclusions,
        selector: LabelSelector,
    ) -> Self {
        Self {
            source: raw.source,
            filter: raw.filter,
            sync: raw.sync,
            exclusions: Arc::new(exclusions),
            selector,
        }
    }

    pub fn exclusions(&self) -> &Arc<Exclusions> {
        &self.exclusions
    }

    pub fn selector(&self) -> &LabelSelector {
        &self.selector
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.resync_interval)
    }

    /// Configured kinds minus excluded ones, deduplicated, in order.
    pub fn watched_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = Vec::new();
        for kind in &self.source.kinds {
            let excluded = self.exclusions.kinds().iter().any(|k| k.eq_ignore_ascii_case(kind));
            if !excluded && !kinds.contains(&kind.as_str()) {
                kinds.push(kind);
            }
        }
        kinds
    }

    /// Settings for the controller factory.
    pub fn factory_settings(&self) -> FactorySettings {
        FactorySettings {
            exclusions: Arc::clone(&self.exclusions),
            label_selector: self.filter.selector.clone(),
            namespace: self.source.namespace.clone(),
            resync_interval: self.resync_interval(),
            unabridged: self.sync.unabridged,
        }
    }
}
