// src/filter/mod.rs

//! Object exclusion rules.
//!
//! An object is surfaced downstream only when it passes every rule:
//! - its `kind:namespace/name` identity is not excluded verbatim,
//! - its namespace is not fully matched by an excluded-namespace regex,
//! - its kind is not excluded,
//! - it carries no owner reference, when owned objects are excluded.
//!
//! The same decision is made for adds, updates and deletes; deletes are
//! judged on the last state the mirror held for the object.

pub mod exclusions;
pub mod predicate;

pub use exclusions::{Exclusions, ExclusionsBuilder};
pub use predicate::{
    is_admitted, is_excluded_kind, is_excluded_namespace, is_excluded_object,
    is_excluded_owned,
};
