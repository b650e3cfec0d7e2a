// src/filter/predicate.rs

//! Admission predicates.
//!
//! Each rule is a plain function over literal inputs; [`is_admitted`] combines
//! them for a mirrored object.

use std::collections::HashSet;

use regex::Regex;

use crate::filter::Exclusions;
use crate::object::{exclusion_key, RemoteObject};

/// Rule (a): the object's `kind:namespace/name` identity is listed verbatim.
pub fn is_excluded_object(
    exact_keys: &HashSet<String>,
    kind: &str,
    namespace: Option<&str>,
    name: &str,
) -> bool {
    !exact_keys.is_empty() && exact_keys.contains(&exclusion_key(kind, namespace, name))
}

/// Rule (b): some pattern matches the entire namespace.
///
/// Cluster-scoped objects have no namespace and never match.
pub fn is_excluded_namespace(patterns: &[Regex], namespace: Option<&str>) -> bool {
    match namespace {
        Some(ns) => patterns.iter().any(|re| re.is_match(ns)),
        None => false,
    }
}

/// Rule (c): the kind is in the (lowercased) exclusion list.
pub fn is_excluded_kind(kinds: &[String], kind: &str) -> bool {
    !kind.is_empty() && kinds.iter().any(|k| k.eq_ignore_ascii_case(kind))
}

/// Rule (d): owner references are present while owned objects are excluded.
pub fn is_excluded_owned(exclude_if_has_owner_ref: bool, has_owner_references: bool) -> bool {
    exclude_if_has_owner_ref && has_owner_references
}

/// Decide whether `obj`, watched by the controller for `kind`, is surfaced
/// downstream. Every rule has to let it through.
pub fn is_admitted(exclusions: &Exclusions, kind: &str, obj: &RemoteObject) -> bool {
    let namespace = obj.namespace();

    if is_excluded_object(exclusions.exact_keys(), kind, namespace, obj.name()) {
        return false;
    }
    if is_excluded_namespace(exclusions.namespace_patterns(), namespace) {
        return false;
    }
    if is_excluded_kind(exclusions.kinds(), kind)
        || is_excluded_kind(exclusions.kinds(), &obj.kind)
    {
        return false;
    }
    if is_excluded_owned(
        exclusions.exclude_if_has_owner_ref(),
        obj.has_owner_references(),
    ) {
        return false;
    }

    true
}
