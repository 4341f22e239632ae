//! The audit-trail business controller.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use tripwire_core::{Action, ChangeSet, EntityType, PendingEntity};
use tripwire_rules::{
    engine, BusinessContext, BusinessController, DispatchError, RuleMeta, RuleRegistry, Store,
};

use crate::record::{AuditRecord, DEFAULT_RECORD_TYPE};
use crate::serializer::serialize_fields;

/// Derives one audit record per matched pending entity and tracks it
/// into the same unit of work.
///
/// Per-action allow-lists restrict which logical types are audited; an
/// empty allow-list for an action audits every type (default-allow).
/// The lists live behind a `std::sync::RwLock` so they stay
/// configurable after the controller has been registered. The current
/// user is per-instance state: construct one controller per unit of
/// work.
pub struct AuditTrailController {
    current_user_id: Option<String>,
    record_type: EntityType,
    allowed: RwLock<HashMap<Action, HashSet<EntityType>>>,
    registry: RuleRegistry<Self>,
}

impl AuditTrailController {
    /// A controller attributing changes to `current_user_id`. With
    /// `None` (or a blank id) every change is treated as
    /// system-originated and no records are produced.
    pub fn new(current_user_id: Option<String>) -> Self {
        let registry = RuleRegistry::builder()
            .on(RuleMeta::on(Action::Create), |c: &Self, changes, entity| {
                c.record(Action::Create, changes, entity)
            })
            .on(RuleMeta::on(Action::Update), |c: &Self, changes, entity| {
                c.record(Action::Update, changes, entity)
            })
            .on(RuleMeta::on(Action::Delete), |c: &Self, changes, entity| {
                c.record(Action::Delete, changes, entity)
            })
            .build();
        AuditTrailController {
            current_user_id,
            record_type: EntityType::new(DEFAULT_RECORD_TYPE),
            allowed: RwLock::new(HashMap::new()),
            registry,
        }
    }

    /// Track audit records under a different logical type.
    pub fn with_record_type(mut self, record_type: impl Into<EntityType>) -> Self {
        self.record_type = record_type.into();
        self
    }

    /// Restrict auditing for `action` to the given logical types.
    /// Extends (never replaces) the action's allow-list.
    pub fn add_types<I>(&self, action: Action, types: I)
    where
        I: IntoIterator,
        I::Item: Into<EntityType>,
    {
        let mut allowed = self.allowed.write().expect("allow-list lock poisoned");
        allowed
            .entry(action)
            .or_default()
            .extend(types.into_iter().map(Into::into));
    }

    /// Whether `entity_type` is audited for `action`.
    pub fn allows(&self, action: Action, entity_type: &EntityType) -> bool {
        let allowed = self.allowed.read().expect("allow-list lock poisoned");
        match allowed.get(&action) {
            Some(types) if !types.is_empty() => types.contains(entity_type),
            _ => true,
        }
    }

    fn user(&self) -> Option<&str> {
        self.current_user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// The shared handler body for all three actions.
    fn record(
        &self,
        action: Action,
        changes: &mut ChangeSet,
        entity: &PendingEntity,
    ) -> Result<(), DispatchError> {
        if !self.allows(action, &entity.logical_type) {
            return Ok(());
        }
        let Some(user_id) = self.user() else {
            return Ok(());
        };

        let json_body = match action {
            Action::Delete => None,
            _ => Some(serialize_fields(&entity.values)?),
        };
        let record = AuditRecord {
            table_name: entity.logical_type.name().to_string(),
            action: action.code(),
            user_id: user_id.to_string(),
            json_body,
            date_created: Utc::now(),
        };

        tracing::debug!(
            table = %entity.logical_type,
            action = %action,
            user = user_id,
            "audit record captured"
        );
        changes.track(record.into_tracked(&self.record_type));
        Ok(())
    }
}

#[async_trait]
impl BusinessController for AuditTrailController {
    fn name(&self) -> &str {
        "audit-trail"
    }

    async fn run_rules(&self, changes: &mut ChangeSet) -> Result<(), DispatchError> {
        engine::run_phases(self, &self.registry, changes, self.name()).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── Fluent registration ─────────────────────────────────────────────

/// Fluent audit-trail registration on a business context.
pub trait UseAuditTrail {
    /// Construct an [`AuditTrailController`] for `current_user_id`,
    /// register it, and return the handle for allow-list
    /// configuration.
    fn use_audit_trail(&mut self, current_user_id: impl Into<String>)
        -> Arc<AuditTrailController>;
}

impl<S: Store> UseAuditTrail for BusinessContext<S> {
    fn use_audit_trail(
        &mut self,
        current_user_id: impl Into<String>,
    ) -> Arc<AuditTrailController> {
        let controller = Arc::new(AuditTrailController::new(Some(current_user_id.into())));
        // A freshly constructed instance cannot already be registered.
        self.add_controller(controller.clone()).ok();
        controller
    }
}

// ── Tests ───────────────────────────────────────────────────────────
