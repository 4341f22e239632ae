//! Scalar field-snapshot serialization for audit bodies.

use indexmap::IndexMap;

use tripwire_core::{FieldMap, FieldValue};

/// Placeholder written in place of binary field values; raw bytes are
/// never serialized into an audit body.
pub const BLOB_PLACEHOLDER: &str = "(Blob)";

/// Serialize an ordered field snapshot to a JSON object string.
///
/// Scalar fields (string, boolean, numeric families, date/time, uuid,
/// and their nullable forms) serialize by literal value. Blob fields
/// become [`BLOB_PLACEHOLDER`]. Navigation/nested fields are silently
/// omitted. Key order follows the snapshot's field enumeration order.
pub fn serialize_fields(fields: &FieldMap) -> Result<String, serde_json::Error> {
    let mut body: IndexMap<&str, serde_json::Value> = IndexMap::with_capacity(fields.len());
    for (name, value) in fields {
        match value {
            FieldValue::Blob(_) => {
                body.insert(name.as_str(), serde_json::Value::from(BLOB_PLACEHOLDER));
            }
            other => {
                if let Some(literal) = other.as_json_literal() {
                    body.insert(name.as_str(), literal);
                }
            }
        }
    }
    serde_json::to_string(&body)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn scalars_serialize_by_literal_value() {
        let stamp = Utc.with_ymd_and_hms(2016, 3, 14, 9, 26, 53).unwrap();
        let fields = FieldMap::from([
            ("name".to_string(), FieldValue::Text("Mouse".to_string())),
            ("in_stock".to_string(), FieldValue::Boolean(true)),
            ("quantity".to_string(), FieldValue::Integer(-3)),
            ("price".to_string(), FieldValue::Float(12.5)),
            ("restocked_at".to_string(), FieldValue::DateTime(stamp)),
            ("discontinued".to_string(), FieldValue::Null),
        ]);

        let body = serialize_fields(&fields).unwrap();
        assert_eq!(
            body,
            "{\"name\":\"Mouse\",\"in_stock\":true,\"quantity\":-3,\"price\":12.5,\
             \"restocked_at\":\"2016-03-14T09:26:53+00:00\",\"discontinued\":null}"
        );
    }

    #[test]
    fn blobs_become_the_placeholder() {
        let fields = FieldMap::from([(
            "thumbnail".to_string(),
            FieldValue::Blob(vec![0xde, 0xad, 0xbe, 0xef]),
        )]);

        let body = serialize_fields(&fields).unwrap();
        assert_eq!(body, "{\"thumbnail\":\"(Blob)\"}");
    }

    #[test]
    fn complex_fields_are_silently_omitted() {
        let fields = FieldMap::from([
            ("id".to_string(), FieldValue::Integer(7)),
            (
                "details".to_string(),
                FieldValue::Complex(serde_json::json!([{"sku": "A-1"}])),
            ),
            ("note".to_string(), FieldValue::Text("ok".to_string())),
        ]);

        let body = serialize_fields(&fields).unwrap();
        assert_eq!(body, "{\"id\":7,\"note\":\"ok\"}");
    }

    #[test]
    fn key_order_follows_the_snapshot() {
        let fields = FieldMap::from([
            ("z".to_string(), FieldValue::Integer(1)),
            ("a".to_string(), FieldValue::Integer(2)),
            ("m".to_string(), FieldValue::Integer(3)),
        ]);

        let body = serialize_fields(&fields).unwrap();
        assert_eq!(body, "{\"z\":1,\"a\":2,\"m\":3}");
    }
}
