//! The persisted audit-trail record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tripwire_core::{EntityType, FieldMap, FieldValue, TrackedEntity, TypeInfo};

/// Default logical type audit records are tracked under.
pub const DEFAULT_RECORD_TYPE: &str = "AuditRecord";

/// One audit-trail entry, derived from a pending entity at dispatch
/// time.
///
/// `json_body` is never populated for delete actions: the entity is
/// gone, only the action marker is retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Simple name of the audited entity's logical type.
    pub table_name: String,
    /// Numeric action code (create = 1, update = 2, delete = 4).
    pub action: u8,
    /// The user the change is attributed to.
    pub user_id: String,
    /// JSON snapshot of scalar field values; `None` for deletes.
    pub json_body: Option<String>,
    pub date_created: DateTime<Utc>,
}

impl AuditRecord {
    /// Convert into an `Added` tracked entity under `record_type`, so
    /// the record joins the triggering unit of work and commits with
    /// it.
    pub fn into_tracked(self, record_type: &EntityType) -> TrackedEntity {
        let json_body = match self.json_body {
            Some(body) => FieldValue::Text(body),
            None => FieldValue::Null,
        };
        let fields = FieldMap::from([
            ("table_name".to_string(), FieldValue::Text(self.table_name)),
            (
                "action".to_string(),
                FieldValue::Integer(i64::from(self.action)),
            ),
            ("user_id".to_string(), FieldValue::Text(self.user_id)),
            ("json_body".to_string(), json_body),
            (
                "date_created".to_string(),
                FieldValue::DateTime(self.date_created),
            ),
        ]);
        TrackedEntity::added(TypeInfo::concrete(record_type.clone()), fields)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
