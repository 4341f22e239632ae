//! Pre-commit business-rule dispatch for a unit-of-work change set.
//!
//! This crate provides:
//! - Declarative rule registration: (type filter, action set) metadata
//!   paired with sync or async handlers, built once per controller
//! - The three-phase dispatch engine (Create, Update, Delete) over
//!   per-phase snapshots of the pending change set
//! - The [`BusinessController`] trait and the [`BusinessContext`]
//!   unit-of-work hook that runs every controller before delegating to
//!   the underlying store commit

pub mod context;
pub mod controller;
pub mod engine;
pub mod error;
pub mod registry;
pub mod store;

pub use context::{BusinessContext, DuplicatePolicy};
pub use controller::BusinessController;
pub use error::{CommitError, DispatchError, RegistrationError};
pub use registry::{Rule, RuleMeta, RuleRegistry, RuleRegistryBuilder, RuleResult};
pub use store::{MemoryStore, Store, StoreError, StoredRow};
