// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "RESMIRROR_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "Resmirror.toml";

/// Read and deserialize a TOML configuration file.
///
/// This only performs deserialization; use [`load_and_validate`] to also
/// compile the filter rules.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading config");
    let contents = fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

/// Load a configuration file and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_from_path(path)?)
}

/// Config path used when `--config` is not given: `$RESMIRROR_CONFIG`, or
/// `Resmirror.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    config_path_from_env(std::env::var(CONFIG_ENV_VAR).ok().as_deref())
}

/// [`default_config_path`] with the environment value passed in.
pub fn config_path_from_env(value: Option<&str>) -> PathBuf {
    match value.map(str::trim) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

/// Resolve a relative `manifest_dir` against the directory holding the
/// config file. Absolute paths are returned as-is.
pub fn resolve_manifest_dir(config_path: &Path, manifest_dir: &Path) -> PathBuf {
    if manifest_dir.is_absolute() {
        return manifest_dir.to_path_buf();
    }
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(manifest_dir),
        _ => manifest_dir.to_path_buf(),
    }
}
