//! Audit-trail specialization of the pre-commit rule pipeline.
//!
//! This crate provides:
//! - [`AuditRecord`]: who changed which table, with what action, and
//!   (for non-deletes) a JSON snapshot of scalar field values
//! - The scalar field serializer with blob placeholdering
//! - [`AuditTrailController`]: a business controller that derives one
//!   audit record per matched pending entity and tracks it into the
//!   same unit of work, so the record and the triggering change commit
//!   atomically

pub mod controller;
pub mod record;
pub mod serializer;

pub use controller::{AuditTrailController, UseAuditTrail};
pub use record::{AuditRecord, DEFAULT_RECORD_TYPE};
pub use serializer::{serialize_fields, BLOB_PLACEHOLDER};
