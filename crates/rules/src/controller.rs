//! The business-rules controller trait.

use std::any::Any;

use async_trait::async_trait;

use tripwire_core::ChangeSet;

use crate::error::DispatchError;

/// A pre-commit business-rules controller.
///
/// Implementations build their [`RuleRegistry`] at construction and
/// delegate to [`engine::run_phases`] from `run_rules`. Controllers
/// are read-only during dispatch; configuration that must change after
/// registration belongs behind interior mutability. Controllers that
/// carry per-call state (a current user, a tenant) are one-per-unit-
/// of-work; do not share such an instance across concurrent contexts.
///
/// [`RuleRegistry`]: crate::registry::RuleRegistry
/// [`engine::run_phases`]: crate::engine::run_phases
#[async_trait]
pub trait BusinessController: Send + Sync {
    /// Short name used in dispatch logs.
    fn name(&self) -> &str {
        "business-rules"
    }

    /// Run this controller's rule phases against the pending change
    /// set. Errors abort the commit.
    async fn run_rules(&self, changes: &mut ChangeSet) -> Result<(), DispatchError>;

    /// Concrete-type escape hatch for
    /// [`BusinessContext::find_controller`].
    ///
    /// [`BusinessContext::find_controller`]: crate::context::BusinessContext::find_controller
    fn as_any(&self) -> &dyn Any;
}
