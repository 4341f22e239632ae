//! Commit seam between the business context and the persistence
//! backend, plus an in-memory implementation for tests and trivial
//! hosts.

use async_trait::async_trait;
use indexmap::IndexMap;

use tripwire_core::{EntityKey, EntityState, EntityType, FieldMap, LogicalTyped, TrackedEntity};

/// Errors raised by the underlying store while applying a change set.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend failure: {0}")]
    Backend(String),
}

/// The commit primitive the business context wraps.
///
/// `apply` must be atomic from the caller's perspective: the context
/// only invokes it after every business rule has passed, and treats an
/// error as "nothing persisted".
#[async_trait]
pub trait Store: Send {
    /// Apply a drained change set. Returns the number of entries
    /// applied.
    fn apply(&mut self, changes: Vec<TrackedEntity>) -> Result<usize, StoreError>;

    /// Async variant; defaults to the synchronous `apply`.
    async fn apply_async(&mut self, changes: Vec<TrackedEntity>) -> Result<usize, StoreError> {
        self.apply(changes)
    }
}

// ── In-memory store ─────────────────────────────────────────────────

/// A committed row in the [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub entity_type: EntityType,
    pub fields: FieldMap,
}

/// Insertion-ordered in-memory store: `Added` inserts, `Modified`
/// upserts, `Deleted` removes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: IndexMap<EntityKey, StoredRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: EntityKey) -> Option<&StoredRow> {
        self.rows.get(&key)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&EntityKey, &StoredRow)> {
        self.rows.iter()
    }

    /// Committed rows of one logical type, in commit order.
    pub fn rows_of(&self, entity_type: &EntityType) -> Vec<&StoredRow> {
        self.rows
            .values()
            .filter(|row| &row.entity_type == entity_type)
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn apply(&mut self, changes: Vec<TrackedEntity>) -> Result<usize, StoreError> {
        let applied = changes.len();
        for entity in changes {
            match entity.state {
                EntityState::Added | EntityState::Modified => {
                    let entity_type = entity.logical_type().clone();
                    self.rows.insert(
                        entity.key,
                        StoredRow {
                            entity_type,
                            fields: entity.fields,
                        },
                    );
                }
                EntityState::Deleted => {
                    self.rows.shift_remove(&entity.key);
                }
            }
        }
        Ok(applied)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use tripwire_core::{FieldValue, TypeInfo};

    use super::*;

    #[test]
    fn apply_inserts_updates_and_removes() {
        let mut store = MemoryStore::new();

        let added = TrackedEntity::added(
            TypeInfo::concrete("Order"),
            FieldMap::from([("n".to_string(), FieldValue::Integer(1))]),
        );
        let key = added.key;
        store.apply(vec![added]).unwrap();
        assert_eq!(store.len(), 1);

        let mut modified = TrackedEntity::modified(
            TypeInfo::concrete("Order"),
            FieldMap::from([("n".to_string(), FieldValue::Integer(2))]),
        );
        modified.key = key;
        store.apply(vec![modified]).unwrap();
        assert_eq!(
            store.get(key).unwrap().fields.get("n"),
            Some(&FieldValue::Integer(2))
        );

        let mut deleted = TrackedEntity::deleted(TypeInfo::concrete("Order"), FieldMap::new());
        deleted.key = key;
        store.apply(vec![deleted]).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn rows_of_filters_by_logical_type() {
        let mut store = MemoryStore::new();
        store
            .apply(vec![
                TrackedEntity::added(TypeInfo::concrete("Order"), FieldMap::new()),
                TrackedEntity::added(TypeInfo::proxy("Order_1a", "Order"), FieldMap::new()),
                TrackedEntity::added(TypeInfo::concrete("Product"), FieldMap::new()),
            ])
            .unwrap();

        assert_eq!(store.rows_of(&EntityType::new("Order")).len(), 2);
        assert_eq!(store.rows_of(&EntityType::new("Product")).len(), 1);
    }
}
