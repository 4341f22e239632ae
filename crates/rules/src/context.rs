//! The unit-of-work hook: controller registration plus the commit
//! boundary.
//!
//! `BusinessContext` owns the pending change set and an ordered list
//! of controllers. Every commit, synchronous or asynchronous, first
//! runs each controller's rules in registration order, strictly
//! sequentially, then delegates the drained change set to the store.
//! A rule or store error leaves the change set intact and the store
//! untouched.

use std::sync::Arc;

use tripwire_core::{ChangeSet, TrackedEntity};

use crate::controller::BusinessController;
use crate::error::{CommitError, DispatchError, RegistrationError};
use crate::store::Store;

/// How `add_controller` treats an instance that is already registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Re-adding a registered instance is a no-op (default).
    #[default]
    Ignore,
    /// The same instance may be registered (and run) multiple times,
    /// in registration order.
    Allow,
    /// Re-adding a registered instance is an error.
    Reject,
}

/// A unit of work with pre-commit business-rule support.
pub struct BusinessContext<S> {
    store: S,
    changes: ChangeSet,
    controllers: Vec<Arc<dyn BusinessController>>,
    duplicates: DuplicatePolicy,
}

impl<S: Store> BusinessContext<S> {
    pub fn new(store: S) -> Self {
        BusinessContext {
            store,
            changes: ChangeSet::new(),
            controllers: Vec::new(),
            duplicates: DuplicatePolicy::default(),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// The pending change set.
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Mutable access for tracking and restating entities.
    pub fn changes_mut(&mut self) -> &mut ChangeSet {
        &mut self.changes
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ── Controller registration ─────────────────────────────────────

    /// Register a controller. Registration order is rule execution
    /// order; duplicates are handled per the configured
    /// [`DuplicatePolicy`].
    pub fn add_controller(
        &mut self,
        controller: Arc<dyn BusinessController>,
    ) -> Result<(), RegistrationError> {
        if self.position_of(controller.as_ref()).is_some() {
            match self.duplicates {
                DuplicatePolicy::Ignore => return Ok(()),
                DuplicatePolicy::Reject => {
                    return Err(RegistrationError::DuplicateController(
                        controller.name().to_string(),
                    ));
                }
                DuplicatePolicy::Allow => {}
            }
        }
        self.controllers.push(controller);
        Ok(())
    }

    /// Remove the first registration of this instance (identity
    /// comparison). Returns false if it is not registered.
    pub fn remove_controller(&mut self, controller: &dyn BusinessController) -> bool {
        match self.position_of(controller) {
            Some(index) => {
                self.controllers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether this instance is registered (identity comparison).
    pub fn contains_controller(&self, controller: &dyn BusinessController) -> bool {
        self.position_of(controller).is_some()
    }

    /// The first registered controller of concrete type `T`.
    pub fn find_controller<T: BusinessController + 'static>(&self) -> Option<&T> {
        self.controllers
            .iter()
            .find_map(|c| c.as_any().downcast_ref::<T>())
    }

    fn position_of(&self, controller: &dyn BusinessController) -> Option<usize> {
        self.controllers
            .iter()
            .position(|c| same_instance(c.as_ref(), controller))
    }

    // ── Commit boundary ─────────────────────────────────────────────

    /// Run every controller's rules, then apply the change set to the
    /// store. Returns the number of entries applied.
    ///
    /// The rule run is awaited to completion on the calling thread;
    /// handlers must not depend on a live async reactor.
    pub fn commit(&mut self) -> Result<usize, CommitError> {
        futures::executor::block_on(self.run_rules())?;
        let ops = self.pending_ops();
        let applied = self.store.apply(ops)?;
        self.changes.clear();
        tracing::debug!(applied, "change set committed");
        Ok(applied)
    }

    /// Asynchronous commit. Rule execution stays strictly sequential
    /// relative to other controllers and to the store apply.
    pub async fn commit_async(&mut self) -> Result<usize, CommitError> {
        self.run_rules().await?;
        let ops = self.pending_ops();
        let applied = self.store.apply_async(ops).await?;
        self.changes.clear();
        tracing::debug!(applied, "change set committed");
        Ok(applied)
    }

    async fn run_rules(&mut self) -> Result<(), DispatchError> {
        for controller in &self.controllers {
            tracing::debug!(
                controller = controller.name(),
                pending = self.changes.len(),
                "running business rules"
            );
            controller.run_rules(&mut self.changes).await?;
        }
        Ok(())
    }

    /// Change set in insertion order, cloned so a store error leaves
    /// the tracked entities in place.
    fn pending_ops(&self) -> Vec<TrackedEntity> {
        self.changes.iter().cloned().collect()
    }
}

/// Reference identity for controller trait objects: data addresses,
/// vtables ignored.
fn same_instance(a: &dyn BusinessController, b: &dyn BusinessController) -> bool {
    a as *const dyn BusinessController as *const ()
        == b as *const dyn BusinessController as *const ()
}
