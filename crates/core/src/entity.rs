//! Entity records, logical types, and field snapshots.
//!
//! Entities are generic records: a type descriptor plus an ordered
//! field-name→value map. Lazy-loading persistence layers wrap entities
//! in synthetic proxy subtypes; rule matching must always see the
//! declared (logical) type, which the [`LogicalTyped`] capability
//! resolves.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::Action;

/// Unique key of a tracked entity within a unit of work.
pub type EntityKey = Uuid;

/// An entity's declared domain type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        EntityType(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        EntityType::new(name)
    }
}

impl From<String> for EntityType {
    fn from(name: String) -> Self {
        EntityType(name)
    }
}

// ── Type info and proxy unwrapping ──────────────────────────────────

/// Runtime type descriptor for a tracked entity.
///
/// A `base` marks a lazy-loading proxy: the `runtime` type is a
/// synthetic wrapper subtype and `base` is the declared domain type
/// underneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    runtime: EntityType,
    base: Option<EntityType>,
}

impl TypeInfo {
    /// A plain (non-proxy) entity type.
    pub fn concrete(runtime: impl Into<EntityType>) -> Self {
        TypeInfo {
            runtime: runtime.into(),
            base: None,
        }
    }

    /// A lazy-loading proxy wrapper over `base`.
    pub fn proxy(runtime: impl Into<EntityType>, base: impl Into<EntityType>) -> Self {
        TypeInfo {
            runtime: runtime.into(),
            base: Some(base.into()),
        }
    }

    /// The runtime type, proxy subtype included.
    pub fn runtime_type(&self) -> &EntityType {
        &self.runtime
    }

    pub fn is_proxy(&self) -> bool {
        self.base.is_some()
    }
}

/// Capability for resolving an entity's logical (non-proxy) type.
///
/// Implemented by whatever adapter wraps lazy-loaded entities, so the
/// dispatch engine never inspects runtime type names itself.
pub trait LogicalTyped {
    fn logical_type(&self) -> &EntityType;
}

impl LogicalTyped for TypeInfo {
    fn logical_type(&self) -> &EntityType {
        self.base.as_ref().unwrap_or(&self.runtime)
    }
}

// ── Field values ────────────────────────────────────────────────────

/// A typed field value in an entity snapshot.
///
/// The scalar kinds (everything except `Blob` and `Complex`) serialize
/// by literal value into audit bodies. `Null` models the nullable form
/// of every scalar kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Boolean(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    DateTime(DateTime<Utc>),
    Uuid(Uuid),
    Null,
    /// Binary data, never serialized literally.
    Blob(Vec<u8>),
    /// Navigation or nested value, omitted from audit snapshots.
    Complex(serde_json::Value),
}

impl FieldValue {
    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldValue::Blob(_) | FieldValue::Complex(_))
    }

    /// JSON literal for scalar kinds; `None` for `Blob` and `Complex`.
    pub fn as_json_literal(&self) -> Option<serde_json::Value> {
        use serde_json::Value;

        match self {
            FieldValue::Text(s) => Some(Value::String(s.clone())),
            FieldValue::Boolean(b) => Some(Value::Bool(*b)),
            FieldValue::Integer(i) => Some(Value::from(*i)),
            FieldValue::Unsigned(u) => Some(Value::from(*u)),
            FieldValue::Float(f) => Some(Value::from(*f)),
            FieldValue::DateTime(dt) => Some(Value::String(dt.to_rfc3339())),
            FieldValue::Uuid(id) => Some(Value::String(id.to_string())),
            FieldValue::Null => Some(Value::Null),
            FieldValue::Blob(_) | FieldValue::Complex(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Ordered field-name→value snapshot of an entity's current values.
pub type FieldMap = IndexMap<String, FieldValue>;

// ── Lifecycle state ─────────────────────────────────────────────────

/// Pending lifecycle state of a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityState {
    Added,
    Modified,
    Deleted,
}

impl EntityState {
    /// The dispatch action this state maps to.
    pub fn action(self) -> Action {
        match self {
            EntityState::Added => Action::Create,
            EntityState::Modified => Action::Update,
            EntityState::Deleted => Action::Delete,
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityState::Added => write!(f, "added"),
            EntityState::Modified => write!(f, "modified"),
            EntityState::Deleted => write!(f, "deleted"),
        }
    }
}

// ── Tracked entities ────────────────────────────────────────────────

/// An entity tracked by the unit of work, pending commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub key: EntityKey,
    pub type_info: TypeInfo,
    pub state: EntityState,
    pub fields: FieldMap,
}

impl TrackedEntity {
    pub fn new(state: EntityState, type_info: TypeInfo, fields: FieldMap) -> Self {
        TrackedEntity {
            key: Uuid::new_v4(),
            type_info,
            state,
            fields,
        }
    }

    pub fn added(type_info: TypeInfo, fields: FieldMap) -> Self {
        Self::new(EntityState::Added, type_info, fields)
    }

    pub fn modified(type_info: TypeInfo, fields: FieldMap) -> Self {
        Self::new(EntityState::Modified, type_info, fields)
    }

    pub fn deleted(type_info: TypeInfo, fields: FieldMap) -> Self {
        Self::new(EntityState::Deleted, type_info, fields)
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Set a field value. Existing fields keep their snapshot position.
    pub fn set_field(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }
}

impl LogicalTyped for TrackedEntity {
    fn logical_type(&self) -> &EntityType {
        self.type_info.logical_type()
    }
}

// ── Dispatch-time projection ────────────────────────────────────────

/// Transient projection of a tracked entity handed to rule handlers.
///
/// Recomputed from the change set before every handler invocation;
/// the engine reads it, never owns it; entity lifetime belongs to the
/// unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntity {
    pub key: EntityKey,
    pub runtime_type: EntityType,
    pub logical_type: EntityType,
    pub state: EntityState,
    pub values: FieldMap,
}

impl LogicalTyped for PendingEntity {
    fn logical_type(&self) -> &EntityType {
        &self.logical_type
    }
}

// ── Tests ───────────────────────────────────────────────────────────
