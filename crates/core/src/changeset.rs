//! Insertion-ordered pending change set for a unit of work.
//!
//! The change set is the tracker side of the unit-of-work contract:
//! it holds every entity destined for the next commit, partitioned by
//! lifecycle state, in insertion order. The dispatch engine snapshots
//! it per phase; rule handlers mutate entities and add derived ones
//! (audit records) through it so everything commits atomically.

use indexmap::IndexMap;

use crate::entity::{
    EntityKey, EntityState, FieldMap, LogicalTyped, PendingEntity, TrackedEntity, TypeInfo,
};

/// Pending changes tracked for a single atomic commit.
#[derive(Debug, Default)]
pub struct ChangeSet {
    entries: IndexMap<EntityKey, TrackedEntity>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an entity. Returns its key.
    pub fn track(&mut self, entity: TrackedEntity) -> EntityKey {
        let key = entity.key;
        self.entries.insert(key, entity);
        key
    }

    /// Track a new entity in the `Added` state.
    pub fn add(&mut self, type_info: TypeInfo, fields: FieldMap) -> EntityKey {
        self.track(TrackedEntity::added(type_info, fields))
    }

    pub fn get(&self, key: EntityKey) -> Option<&TrackedEntity> {
        self.entries.get(&key)
    }

    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut TrackedEntity> {
        self.entries.get_mut(&key)
    }

    /// Restate a tracked entity as `Modified`. Returns false if the key
    /// is unknown.
    pub fn mark_modified(&mut self, key: EntityKey) -> bool {
        self.restate(key, EntityState::Modified)
    }

    /// Restate a tracked entity as `Deleted`. Returns false if the key
    /// is unknown.
    pub fn mark_deleted(&mut self, key: EntityKey) -> bool {
        self.restate(key, EntityState::Deleted)
    }

    fn restate(&mut self, key: EntityKey, state: EntityState) -> bool {
        match self.entries.get_mut(&key) {
            Some(entity) => {
                entity.state = state;
                true
            }
            None => false,
        }
    }

    /// Keys of entities currently in `state`, in insertion order.
    ///
    /// This is the per-phase snapshot contract: entities tracked after
    /// the call do not retroactively join the returned set.
    pub fn pending(&self, state: EntityState) -> Vec<EntityKey> {
        self.entries
            .values()
            .filter(|e| e.state == state)
            .map(|e| e.key)
            .collect()
    }

    /// Dispatch-time projection of a tracked entity, logical type
    /// resolved.
    pub fn project(&self, key: EntityKey) -> Option<PendingEntity> {
        self.entries.get(&key).map(|entity| PendingEntity {
            key: entity.key,
            runtime_type: entity.type_info.runtime_type().clone(),
            logical_type: entity.logical_type().clone(),
            state: entity.state,
            values: entity.fields.clone(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every tracked entity, in insertion order.
    pub fn drain(&mut self) -> Vec<TrackedEntity> {
        self.entries.drain(..).map(|(_, entity)| entity).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ── Tests ───────────────────────────────────────────────────────────
