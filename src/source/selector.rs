// src/source/selector.rs

//! Equality-based label selectors (`app=web,tier!=cache,canary,!legacy`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::MirrorError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
    NotExists(String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Equals(k, v) => labels.get(k) == Some(v),
            // A missing label satisfies `!=`.
            Requirement::NotEquals(k, v) => labels.get(k) != Some(v),
            Requirement::Exists(k) => labels.contains_key(k),
            Requirement::NotExists(k) => !labels.contains_key(k),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Equals(k, v) => write!(f, "{k}={v}"),
            Requirement::NotEquals(k, v) => write!(f, "{k}!={v}"),
            Requirement::Exists(k) => write!(f, "{k}"),
            Requirement::NotExists(k) => write!(f, "!{k}"),
        }
    }
}

/// A parsed label selector. The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for LabelSelector {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('(') || s.contains(')') {
            return Err(MirrorError::ConfigError(format!(
                "set-based label selectors are not supported: '{s}'"
            )));
        }

        let mut requirements = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            requirements.push(parse_requirement(part)?);
        }

        Ok(Self { requirements })
    }
}

fn parse_requirement(part: &str) -> Result<Requirement, MirrorError> {
    let invalid = |why: &str| {
        MirrorError::ConfigError(format!("invalid label selector term '{part}': {why}"))
    };

    let requirement = if let Some(key) = part.strip_prefix('!') {
        Requirement::NotExists(key.trim().to_string())
    } else if let Some((k, v)) = part.split_once("!=") {
        Requirement::NotEquals(k.trim().to_string(), v.trim().to_string())
    } else if let Some((k, v)) = part.split_once("==") {
        Requirement::Equals(k.trim().to_string(), v.trim().to_string())
    } else if let Some((k, v)) = part.split_once('=') {
        Requirement::Equals(k.trim().to_string(), v.trim().to_string())
    } else {
        Requirement::Exists(part.to_string())
    };

    let (key, value) = match &requirement {
        Requirement::Equals(k, v) | Requirement::NotEquals(k, v) => (k.as_str(), v.as_str()),
        Requirement::Exists(k) | Requirement::NotExists(k) => (k.as_str(), ""),
    };

    if key.is_empty() {
        return Err(invalid("empty key"));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || "-_./".contains(c)) {
        return Err(invalid("key contains invalid characters"));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || "-_.".contains(c)) {
        return Err(invalid("value contains invalid characters"));
    }

    Ok(requirement)
}
