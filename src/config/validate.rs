// src/config/validate.rs

use std::str::FromStr;

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{MirrorError, Result};
use crate::filter::Exclusions;
use crate::source::LabelSelector;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::MirrorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let exclusions = build_exclusions(&raw)?;
        let selector = LabelSelector::from_str(&raw.filter.selector)?;
        Ok(ConfigFile::new_unchecked(raw, exclusions, selector))
    }
}

/// Validate without keeping the result.
pub fn validate_config(raw: &RawConfigFile) -> Result<()> {
    ConfigFile::try_from(raw.clone()).map(|_| ())
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_kinds(cfg)?;
    validate_kind_names(cfg)?;
    validate_include_globs(cfg)?;
    Ok(())
}

fn ensure_has_kinds(cfg: &RawConfigFile) -> Result<()> {
    if cfg.source.kinds.is_empty() {
        return Err(MirrorError::ConfigError(
            "[source].kinds must list at least one kind".to_string(),
        ));
    }
    Ok(())
}

fn validate_kind_names(cfg: &RawConfigFile) -> Result<()> {
    for kind in cfg.source.kinds.iter() {
        let valid = !kind.is_empty()
            && kind
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_');
        if !valid {
            return Err(MirrorError::ConfigError(format!(
                "invalid kind name '{kind}' in [source].kinds"
            )));
        }
    }
    Ok(())
}

fn validate_include_globs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.source.include.is_empty() {
        return Err(MirrorError::ConfigError(
            "[source].include must list at least one glob".to_string(),
        ));
    }
    for pat in cfg.source.include.iter() {
        Glob::new(pat).map_err(|e| {
            MirrorError::ConfigError(format!("invalid include glob '{pat}': {e}"))
        })?;
    }
    Ok(())
}

fn build_exclusions(cfg: &RawConfigFile) -> Result<Exclusions> {
    Exclusions::builder()
        .objects(cfg.filter.exclude_objects.iter().cloned())
        .namespaces(cfg.filter.exclude_namespaces.iter().cloned())
        .kinds(cfg.filter.exclude_kinds.iter().cloned())
        .exclude_if_has_owner_ref(cfg.filter.exclude_having_owner_ref)
        .build()
}
