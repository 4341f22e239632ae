//! Declarative rule registration table.
//!
//! Replaces attribute reflection with an explicit table built once at
//! controller construction: each rule pairs a metadata entry (action
//! set + entity-type filter) with a handler. Registration order is the
//! intra-controller execution order.

use std::collections::HashSet;

use futures::future::BoxFuture;

use tripwire_core::{Action, ActionSet, ChangeSet, EntityType, PendingEntity};

use crate::error::DispatchError;

/// Result of a single rule handler invocation.
pub type RuleResult = Result<(), DispatchError>;

/// Subscription metadata for one rule: which lifecycle actions it
/// fires on, and which logical entity types it applies to.
///
/// An empty type filter matches every entity type. A handler that
/// should match several independent (types, actions) combinations is
/// registered once per combination.
#[derive(Debug, Clone)]
pub struct RuleMeta {
    entity_types: HashSet<EntityType>,
    actions: ActionSet,
}

impl RuleMeta {
    /// Subscribe to the given actions, matching every entity type.
    pub fn on(actions: impl Into<ActionSet>) -> Self {
        RuleMeta {
            entity_types: HashSet::new(),
            actions: actions.into(),
        }
    }

    /// Restrict the subscription to the given logical types.
    pub fn for_types<I>(mut self, types: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<EntityType>,
    {
        self.entity_types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn actions(&self) -> ActionSet {
        self.actions
    }

    /// Whether this rule fires for `action` on an entity of
    /// `logical_type`.
    pub fn matches(&self, action: Action, logical_type: &EntityType) -> bool {
        self.actions.contains(action)
            && (self.entity_types.is_empty() || self.entity_types.contains(logical_type))
    }
}

// ── Handlers ────────────────────────────────────────────────────────

/// Synchronous rule handler over the controller, the change set, and
/// the projected entity.
pub type SyncRuleFn<C> =
    dyn Fn(&C, &mut ChangeSet, &PendingEntity) -> RuleResult + Send + Sync;

/// Asynchronous rule handler.
///
/// Closure inference rarely satisfies the higher-ranked signature;
/// register a standalone fn that takes the three borrows and returns
/// `Box::pin(async move { .. })` as a [`BoxFuture`].
pub type AsyncRuleFn<C> = dyn for<'a> Fn(&'a C, &'a mut ChangeSet, &'a PendingEntity) -> BoxFuture<'a, RuleResult>
    + Send
    + Sync;

enum Handler<C> {
    Sync(Box<SyncRuleFn<C>>),
    Async(Box<AsyncRuleFn<C>>),
}

/// One registered rule: metadata plus handler.
pub struct Rule<C> {
    meta: RuleMeta,
    handler: Handler<C>,
}

impl<C> Rule<C> {
    pub fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    /// Invoke the handler; async handlers are awaited in place so
    /// dispatch stays strictly sequential.
    pub(crate) async fn invoke(
        &self,
        controller: &C,
        changes: &mut ChangeSet,
        entity: &PendingEntity,
    ) -> RuleResult {
        match &self.handler {
            Handler::Sync(f) => f(controller, changes, entity),
            Handler::Async(f) => f(controller, changes, entity).await,
        }
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// Ordered rule table for a controller type `C`.
///
/// Built once at controller construction; read-only during dispatch.
pub struct RuleRegistry<C> {
    rules: Vec<Rule<C>>,
}

impl<C> RuleRegistry<C> {
    pub fn builder() -> RuleRegistryBuilder<C> {
        RuleRegistryBuilder { rules: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules matching (action, logical type), in registration order.
    pub fn matching<'a>(
        &'a self,
        action: Action,
        logical_type: &'a EntityType,
    ) -> impl Iterator<Item = &'a Rule<C>> {
        self.rules
            .iter()
            .filter(move |rule| rule.meta.matches(action, logical_type))
    }
}

/// Builder for [`RuleRegistry`].
pub struct RuleRegistryBuilder<C> {
    rules: Vec<Rule<C>>,
}

impl<C> RuleRegistryBuilder<C> {
    /// Register a synchronous rule.
    pub fn on<F>(mut self, meta: RuleMeta, handler: F) -> Self
    where
        F: Fn(&C, &mut ChangeSet, &PendingEntity) -> RuleResult + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            meta,
            handler: Handler::Sync(Box::new(handler)),
        });
        self
    }

    /// Register an asynchronous rule.
    pub fn on_async<F>(mut self, meta: RuleMeta, handler: F) -> Self
    where
        F: for<'a> Fn(&'a C, &'a mut ChangeSet, &'a PendingEntity) -> BoxFuture<'a, RuleResult>
            + Send
            + Sync
            + 'static,
    {
        self.rules.push(Rule {
            meta,
            handler: Handler::Async(Box::new(handler)),
        });
        self
    }

    pub fn build(self) -> RuleRegistry<C> {
        RuleRegistry { rules: self.rules }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_type_filter_matches_everything() {
        let meta = RuleMeta::on(Action::Create | Action::Update);
        assert!(meta.matches(Action::Create, &EntityType::new("Order")));
        assert!(meta.matches(Action::Update, &EntityType::new("Product")));
        assert!(!meta.matches(Action::Delete, &EntityType::new("Order")));
    }

    #[test]
    fn type_filter_restricts_matches() {
        let meta = RuleMeta::on(Action::Create).for_types(["Order", "Invoice"]);
        assert!(meta.matches(Action::Create, &EntityType::new("Order")));
        assert!(!meta.matches(Action::Create, &EntityType::new("Product")));
    }

    #[test]
    fn matching_preserves_registration_order() {
        struct Nop;
        let registry: RuleRegistry<Nop> = RuleRegistry::builder()
            .on(RuleMeta::on(Action::Create), |_, _, _| Ok(()))
            .on(RuleMeta::on(ActionSet::ALL), |_, _, _| Ok(()))
            .on(RuleMeta::on(Action::Delete), |_, _, _| Ok(()))
            .build();

        let order = EntityType::new("Order");
        let hits: Vec<ActionSet> = registry
            .matching(Action::Create, &order)
            .map(|r| r.meta().actions())
            .collect();
        assert_eq!(hits, vec![Action::Create.into(), ActionSet::ALL]);
    }

    #[test]
    fn one_handler_two_subscriptions() {
        struct Nop;
        let registry: RuleRegistry<Nop> = RuleRegistry::builder()
            .on(RuleMeta::on(Action::Create).for_types(["Order"]), |_, _, _| Ok(()))
            .on(RuleMeta::on(Action::Delete).for_types(["Product"]), |_, _, _| Ok(()))
            .build();

        assert_eq!(registry.len(), 2);
        let order = EntityType::new("Order");
        assert_eq!(registry.matching(Action::Delete, &order).count(), 0);
        let product = EntityType::new("Product");
        assert_eq!(registry.matching(Action::Delete, &product).count(), 1);
    }
}
