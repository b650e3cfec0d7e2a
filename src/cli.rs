// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{default_config_path, RawConfigFile};

/// Command-line arguments for `resmirror`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "resmirror",
    version,
    about = "Mirror resource objects and report every change as a notification.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `$RESMIRROR_CONFIG`, else `Resmirror.toml` in the current
    /// working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RESMIRROR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the effective configuration, then exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Mirror everything once, emit the notifications, then exit.
    #[arg(long)]
    pub dump_only: bool,

    /// Label selector, overrides `[filter].selector`.
    #[arg(long, value_name = "SELECTOR")]
    pub filter: Option<String>,

    /// Only mirror objects from this namespace, overrides `[source].namespace`.
    #[arg(long, short = 'a', value_name = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Namespace regexes to exclude, overrides `[filter].exclude_namespaces`.
    ///
    /// Comma separated or repeated, e.g. `--exclude-namespaces 'temp.*,kube-.*'`.
    #[arg(long, short = 'z', value_name = "REGEX", value_delimiter = ',')]
    pub exclude_namespaces: Vec<String>,

    /// Kinds to exclude, overrides `[filter].exclude_kinds`.
    #[arg(long = "exclude-kind", short = 'x', value_name = "KIND", value_delimiter = ',')]
    pub exclude_kinds: Vec<String>,

    /// Objects to exclude as `kind:namespace/name`, overrides
    /// `[filter].exclude_objects`.
    #[arg(long = "exclude-object", short = 'y', value_name = "OBJECT", value_delimiter = ',')]
    pub exclude_objects: Vec<String>,

    /// Full resync period in seconds, overrides `[sync].resync_interval`.
    #[arg(long, value_name = "SECONDS")]
    pub resync_interval: Option<u64>,

    /// Keep `status` in emitted objects.
    #[arg(long)]
    pub unabridged: bool,

    /// Skip objects that carry owner references.
    #[arg(long)]
    pub exclude_having_owner_ref: bool,
}

impl CliArgs {
    /// The config file to load.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }

    /// Apply flag overrides on top of the file configuration.
    ///
    /// Boolean flags can only switch a setting on. List flags replace the
    /// file's list when given at least once.
    pub fn apply_overrides(&self, raw: &mut RawConfigFile) {
        if let Some(selector) = &self.filter {
            raw.filter.selector = selector.clone();
        }
        if let Some(namespace) = &self.namespace {
            raw.source.namespace = namespace.clone();
        }
        if !self.exclude_namespaces.is_empty() {
            raw.filter.exclude_namespaces = self.exclude_namespaces.clone();
        }
        if !self.exclude_kinds.is_empty() {
            raw.filter.exclude_kinds = self.exclude_kinds.clone();
        }
        if !self.exclude_objects.is_empty() {
            raw.filter.exclude_objects = self.exclude_objects.clone();
        }
        if let Some(secs) = self.resync_interval {
            raw.sync.resync_interval = secs;
        }
        if self.unabridged {
            raw.sync.unabridged = true;
        }
        if self.exclude_having_owner_ref {
            raw.filter.exclude_having_owner_ref = true;
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
