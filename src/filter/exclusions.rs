// src/filter/exclusions.rs

use std::collections::HashSet;
use std::fmt;

use regex::Regex;

use crate::errors::{MirrorError, Result};

/// Immutable exclusion rules shared by every controller of a factory.
///
/// Built once from configuration; controllers hold it behind an `Arc` and
/// only ever read it.
#[derive(Clone, Default)]
pub struct Exclusions {
    exact_keys: HashSet<String>,
    namespace_patterns: Vec<Regex>,
    kinds: Vec<String>,
    exclude_if_has_owner_ref: bool,
}

impl fmt::Debug for Exclusions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<&str> = self.namespace_patterns.iter().map(|r| r.as_str()).collect();
        f.debug_struct("Exclusions")
            .field("exact_keys", &self.exact_keys)
            .field("namespace_patterns", &patterns)
            .field("kinds", &self.kinds)
            .field("exclude_if_has_owner_ref", &self.exclude_if_has_owner_ref)
            .finish()
    }
}

impl Exclusions {
    pub fn builder() -> ExclusionsBuilder {
        ExclusionsBuilder::default()
    }

    /// Exclusions that admit everything.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn exact_keys(&self) -> &HashSet<String> {
        &self.exact_keys
    }

    /// Compiled, fully-anchored namespace patterns.
    pub fn namespace_patterns(&self) -> &[Regex] {
        &self.namespace_patterns
    }

    /// Excluded kinds, lowercased.
    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    pub fn exclude_if_has_owner_ref(&self) -> bool {
        self.exclude_if_has_owner_ref
    }
}

/// Collects raw exclusion options and validates them into [`Exclusions`].
#[derive(Debug, Clone, Default)]
pub struct ExclusionsBuilder {
    exact_keys: Vec<String>,
    namespace_patterns: Vec<String>,
    kinds: Vec<String>,
    exclude_if_has_owner_ref: bool,
}

impl ExclusionsBuilder {
    /// Exclude one object, written `kind:namespace/name` or `kind:name`.
    pub fn object(mut self, entry: impl Into<String>) -> Self {
        self.exact_keys.push(entry.into());
        self
    }

    pub fn objects<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exact_keys.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Exclude every namespace the regex fully matches.
    pub fn namespace(mut self, pattern: impl Into<String>) -> Self {
        self.namespace_patterns.push(pattern.into());
        self
    }

    pub fn namespaces<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespace_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.push(kind.into());
        self
    }

    pub fn kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds.extend(kinds.into_iter().map(Into::into));
        self
    }

    pub fn exclude_if_has_owner_ref(mut self, value: bool) -> Self {
        self.exclude_if_has_owner_ref = value;
        self
    }

    pub fn build(self) -> Result<Exclusions> {
        let mut exact_keys = HashSet::with_capacity(self.exact_keys.len());
        for entry in self.exact_keys {
            validate_excluded_object(&entry)?;
            exact_keys.insert(entry);
        }

        let mut namespace_patterns = Vec::with_capacity(self.namespace_patterns.len());
        for pattern in &self.namespace_patterns {
            namespace_patterns.push(compile_full_match(pattern)?);
        }

        let kinds = self
            .kinds
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Exclusions {
            exact_keys,
            namespace_patterns,
            kinds,
            exclude_if_has_owner_ref: self.exclude_if_has_owner_ref,
        })
    }
}

/// Compile a regex that must match the whole input.
fn compile_full_match(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
        MirrorError::ConfigError(format!("invalid namespace exclusion regex '{pattern}': {e}"))
    })
}

/// Check that an exact-object entry reads `kind:namespace/name` or `kind:name`.
fn validate_excluded_object(entry: &str) -> Result<()> {
    let invalid = || {
        MirrorError::ConfigError(format!(
            "invalid excluded object '{entry}' (expected \"kind:namespace/name\" or \"kind:name\")"
        ))
    };

    let (kind, rest) = entry.split_once(':').ok_or_else(invalid)?;
    if kind.is_empty() || rest.is_empty() {
        return Err(invalid());
    }

    match rest.split_once('/') {
        Some((ns, name)) if ns.is_empty() || name.is_empty() || name.contains('/') => {
            Err(invalid())
        }
        _ => Ok(()),
    }
}
