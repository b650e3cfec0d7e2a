// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: turning the raw model into a validated [`ConfigFile`]
//!   with compiled exclusion rules.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    config_path_from_env, default_config_path, load_and_validate, load_from_path,
    resolve_manifest_dir, CONFIG_ENV_VAR,
};
pub use model::{ConfigFile, FilterSection, RawConfigFile, SourceSection, SyncSection};
pub use validate::validate_config;
