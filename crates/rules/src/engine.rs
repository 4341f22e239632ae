//! Three-phase rule dispatch over a pending change set.
//!
//! Phases run in fixed order: Added/Create, Modified/Update,
//! Deleted/Delete. Each phase snapshots the change set's matching keys
//! at phase start: entities tracked by handlers during the phase do
//! not join that snapshot (they still commit, and later phases see
//! them). Handlers run strictly sequentially; an error propagates
//! immediately and aborts the commit.

use tripwire_core::{ChangeSet, EntityState, LogicalTyped};

use crate::error::DispatchError;
use crate::registry::RuleRegistry;

const PHASES: [EntityState; 3] = [
    EntityState::Added,
    EntityState::Modified,
    EntityState::Deleted,
];

/// Run all three dispatch phases for one controller.
///
/// `name` is the controller name, used only for tracing.
pub async fn run_phases<C>(
    controller: &C,
    registry: &RuleRegistry<C>,
    changes: &mut ChangeSet,
    name: &str,
) -> Result<(), DispatchError> {
    for state in PHASES {
        run_phase(controller, registry, changes, name, state).await?;
    }
    Ok(())
}

async fn run_phase<C>(
    controller: &C,
    registry: &RuleRegistry<C>,
    changes: &mut ChangeSet,
    name: &str,
    state: EntityState,
) -> Result<(), DispatchError> {
    let action = state.action();
    let snapshot = changes.pending(state);
    if snapshot.is_empty() {
        return Ok(());
    }

    tracing::debug!(
        controller = name,
        phase = %action,
        pending = snapshot.len(),
        "dispatching rule phase"
    );

    for key in snapshot {
        // An entity restated by an earlier handler no longer belongs
        // to this phase.
        let Some(current) = changes.get(key) else {
            continue;
        };
        if current.state != state {
            continue;
        }
        let logical_type = current.logical_type().clone();

        for rule in registry.matching(action, &logical_type) {
            // Re-project before every invocation so mutations made by
            // earlier handlers are visible to later ones.
            let Some(entity) = changes.project(key) else {
                break;
            };
            if entity.state != state {
                break;
            }
            tracing::trace!(
                controller = name,
                phase = %action,
                entity = %entity.logical_type,
                "invoking rule"
            );
            rule.invoke(controller, changes, &entity).await?;
        }
    }

    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tripwire_core::{Action, ActionSet, FieldMap, TrackedEntity, TypeInfo};

    use super::*;
    use crate::registry::RuleMeta;

    /// Controller that records every invocation it sees.
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new() -> Self {
            Recorder {
                seen: Mutex::new(Vec::new()),
            }
        }

        fn note(&self, entry: String) {
            self.seen.lock().expect("recorder lock poisoned").push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.seen.lock().expect("recorder lock poisoned").clone()
        }
    }

    fn all_actions_registry() -> RuleRegistry<Recorder> {
        RuleRegistry::builder()
            .on(RuleMeta::on(ActionSet::ALL), |c: &Recorder, _, e| {
                c.note(format!("{}:{}", e.state, e.logical_type));
                Ok(())
            })
            .build()
    }

    #[tokio::test]
    async fn phases_run_in_fixed_order() {
        let controller = Recorder::new();
        let registry = all_actions_registry();
        let mut changes = ChangeSet::new();
        // Tracked in reverse phase order on purpose.
        changes.track(TrackedEntity::deleted(
            TypeInfo::concrete("C"),
            FieldMap::new(),
        ));
        changes.track(TrackedEntity::modified(
            TypeInfo::concrete("B"),
            FieldMap::new(),
        ));
        changes.track(TrackedEntity::added(
            TypeInfo::concrete("A"),
            FieldMap::new(),
        ));

        run_phases(&controller, &registry, &mut changes, "test")
            .await
            .unwrap();

        assert_eq!(
            controller.entries(),
            vec!["added:A", "modified:B", "deleted:C"]
        );
    }

    #[tokio::test]
    async fn matching_rule_fires_exactly_once_per_entity() {
        let controller = Recorder::new();
        let registry = RuleRegistry::builder()
            .on(
                RuleMeta::on(Action::Create).for_types(["Order"]),
                |c: &Recorder, _, e| {
                    c.note(e.logical_type.name().to_string());
                    Ok(())
                },
            )
            .build();
        let mut changes = ChangeSet::new();
        changes.add(TypeInfo::concrete("Order"), FieldMap::new());
        changes.add(TypeInfo::concrete("Product"), FieldMap::new());

        run_phases(&controller, &registry, &mut changes, "test")
            .await
            .unwrap();

        assert_eq!(controller.entries(), vec!["Order"]);
    }

    #[tokio::test]
    async fn create_update_rule_skips_deleted_entities() {
        let controller = Recorder::new();
        let registry = RuleRegistry::builder()
            .on(
                RuleMeta::on(Action::Create | Action::Update),
                |c: &Recorder, _, e| {
                    c.note(e.state.to_string());
                    Ok(())
                },
            )
            .build();
        let mut changes = ChangeSet::new();
        changes.track(TrackedEntity::deleted(
            TypeInfo::concrete("Order"),
            FieldMap::new(),
        ));

        run_phases(&controller, &registry, &mut changes, "test")
            .await
            .unwrap();

        assert!(controller.entries().is_empty());
    }

    #[tokio::test]
    async fn entities_added_mid_phase_do_not_join_the_snapshot() {
        struct Spawner {
            seen: Mutex<Vec<String>>,
        }
        let registry: RuleRegistry<Spawner> = RuleRegistry::builder()
            .on(RuleMeta::on(Action::Create), |c: &Spawner, changes, e| {
                c.seen
                    .lock()
                    .expect("lock poisoned")
                    .push(e.logical_type.name().to_string());
                if e.logical_type.name() == "Order" {
                    changes.add(TypeInfo::concrete("Shadow"), FieldMap::new());
                }
                Ok(())
            })
            .build();
        let controller = Spawner {
            seen: Mutex::new(Vec::new()),
        };
        let mut changes = ChangeSet::new();
        changes.add(TypeInfo::concrete("Order"), FieldMap::new());

        run_phases(&controller, &registry, &mut changes, "test")
            .await
            .unwrap();

        // The spawned entity was not dispatched in the same phase, but
        // it is tracked for the commit.
        let seen = controller.seen.lock().expect("lock poisoned").clone();
        assert_eq!(seen, vec!["Order"]);
        assert_eq!(changes.len(), 2);
    }

    #[tokio::test]
    async fn later_handler_sees_earlier_mutation() {
        struct Pair;
        let registry: RuleRegistry<Pair> = RuleRegistry::builder()
            .on(RuleMeta::on(Action::Create), |_c, changes, e| {
                let entity = changes.get_mut(e.key).expect("entity tracked");
                entity.set_field(
                    "city",
                    tripwire_core::FieldValue::Text("NYC".to_string()),
                );
                Ok(())
            })
            .on(RuleMeta::on(Action::Create), |_c, _changes, e| {
                match e.values.get("city").and_then(|v| v.as_str()) {
                    Some("NYC") => Ok(()),
                    other => Err(DispatchError::rule(
                        "assert-city",
                        format!("expected NYC, saw {other:?}"),
                    )),
                }
            })
            .build();
        let mut changes = ChangeSet::new();
        changes.add(TypeInfo::concrete("Order"), FieldMap::new());

        run_phases(&Pair, &registry, &mut changes, "test")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn handler_error_stops_dispatch_immediately() {
        let controller = Recorder::new();
        let registry = RuleRegistry::builder()
            .on(RuleMeta::on(Action::Create), |_c: &Recorder, _, _| {
                Err(DispatchError::rule("boom", "rejected"))
            })
            .on(RuleMeta::on(Action::Create), |c: &Recorder, _, _| {
                c.note("unreachable".to_string());
                Ok(())
            })
            .build();
        let mut changes = ChangeSet::new();
        changes.add(TypeInfo::concrete("Order"), FieldMap::new());

        let err = run_phases(&controller, &registry, &mut changes, "test")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Rule { .. }));
        assert!(controller.entries().is_empty());
    }
}
