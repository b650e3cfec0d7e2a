// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::source::SourceError;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Malformed object: {0}")]
    MalformedObject(String),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Notifier closed; dropped notification for {0}")]
    NotifierClosed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MirrorError>;
