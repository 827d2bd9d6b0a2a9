//! Snapshot codec for `versions.model_data` and `versions.additional_data`.
//!
//! Both blobs are UTF-8 JSON. Attribute maps serialize with sorted keys, so
//! two maps that compare equal always encode to the same bytes regardless of
//! the order their fields were set in.

use serde_json::Value;

use crate::entity::is_empty_value;
use crate::types::Attributes;

/// Encode an attribute map into a `model_data` blob.
pub fn serialize(attributes: &Attributes) -> Result<Vec<u8>, serde_json::Error> {
    let sorted: std::collections::BTreeMap<&String, &Value> = attributes.iter().collect();
    serde_json::to_vec(&sorted)
}

/// Decode a `model_data` blob back into an attribute map.
pub fn deserialize(blob: &[u8]) -> Result<Attributes, serde_json::Error> {
    serde_json::from_slice(blob)
}

/// Encode out-of-band version data. Absent or empty data yields no blob.
pub fn serialize_additional(data: Option<&Value>) -> Result<Option<Vec<u8>>, serde_json::Error> {
    match data {
        Some(value) if !is_empty_value(value) => serde_json::to_vec(value).map(Some),
        _ => Ok(None),
    }
}

/// Decode an `additional_data` blob. An absent blob decodes to `None`.
pub fn deserialize_additional(blob: Option<&[u8]>) -> Result<Option<Value>, serde_json::Error> {
    blob.map(serde_json::from_slice).transpose()
}

/// Remove `fields` from `attributes`.
pub fn strip_fields(attributes: &mut Attributes, fields: &[&str]) {
    for field in fields {
        attributes.remove(*field);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn round_trips_scalars_and_arrays() {
        let original = attrs(json!({
            "id": 3,
            "name": "Rodrigo",
            "score": 9.5,
            "active": true,
            "nickname": null,
            "tags": ["a", "b"],
            "settings": {"theme": "dark"}
        }));
        let blob = serialize(&original).unwrap();
        assert_eq!(deserialize(&blob).unwrap(), original);
    }

    #[test]
    fn round_trips_floats_exactly() {
        let mut original = Attributes::new();
        for n in 0..20_000u32 {
            original.insert(format!("f{n}"), json!(f64::from(n) / 7919.0 * 100.0));
        }
        original.insert("tiny".into(), json!(f64::MIN_POSITIVE));
        original.insert("huge".into(), json!(f64::MAX));
        original.insert("third".into(), json!(1.0 / 3.0));
        original.insert("negative".into(), json!(-122_253.855_284_758_17));

        let decoded = deserialize(&serialize(&original).unwrap()).unwrap();
        for (field, value) in &original {
            assert_eq!(
                decoded[field].as_f64(),
                value.as_f64(),
                "{field} changed on round trip"
            );
        }
    }

    #[test]
    fn key_order_does_not_change_the_blob() {
        let mut first = Attributes::new();
        first.insert("name".into(), json!("Rodrigo"));
        first.insert("email".into(), json!("a@x"));

        let mut second = Attributes::new();
        second.insert("email".into(), json!("a@x"));
        second.insert("name".into(), json!("Rodrigo"));

        assert_eq!(serialize(&first).unwrap(), serialize(&second).unwrap());
    }

    #[test]
    fn absent_additional_data_has_no_blob() {
        assert_eq!(serialize_additional(None).unwrap(), None);
        assert_eq!(serialize_additional(Some(&json!(null))).unwrap(), None);
        assert_eq!(serialize_additional(Some(&json!(""))).unwrap(), None);
        assert_eq!(deserialize_additional(None).unwrap(), None);
    }

    #[test]
    fn additional_data_round_trips() {
        let data = json!({"ticket": "OPS-12", "batch": [1, 2]});
        let blob = serialize_additional(Some(&data)).unwrap();
        let decoded = deserialize_additional(blob.as_deref()).unwrap();
        assert_eq!(decoded, Some(data));
    }

    #[test]
    fn garbage_blob_fails_to_decode() {
        assert!(deserialize(b"\x00not json").is_err());
    }

    #[test]
    fn strip_fields_removes_listed_fields() {
        let mut map = attrs(json!({"name": "x", "updated_at": "t", "deleted_at": null}));
        strip_fields(&mut map, &["updated_at", "deleted_at"]);
        assert_eq!(map, attrs(json!({"name": "x"})));
    }
}
