//! Core data model for the tripwire pre-commit rule pipeline.
//!
//! This crate provides:
//! - Lifecycle actions and combinable action sets
//! - Typed entity records with ordered field snapshots
//! - Logical-type resolution through lazy-loading proxy wrappers
//! - The insertion-ordered pending change set the dispatch engine
//!   and its handlers operate on

pub mod action;
pub mod changeset;
pub mod entity;

pub use action::*;
pub use changeset::*;
pub use entity::*;
