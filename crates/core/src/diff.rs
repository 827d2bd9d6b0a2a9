//! Flat attribute-map comparison between two snapshots.

use serde_json::Value;

use crate::types::Attributes;

const NULL: Value = Value::Null;

/// Fields of `baseline` whose value differs in `version`, reported with
/// `version`'s value.
///
/// A field missing from `version` counts as `null`, so absent and `null` are
/// treated as equal. Fields in `excluded` never appear in the result. Values
/// are compared whole; nested objects are not diffed.
pub fn diff_attributes(
    version: &Attributes,
    baseline: &Attributes,
    excluded: &[&str],
) -> Attributes {
    baseline
        .iter()
        .filter(|(field, _)| !excluded.iter().any(|skip| *skip == field.as_str()))
        .filter(|(field, value)| version.get(field.as_str()).unwrap_or(&NULL) != *value)
        .map(|(field, _)| {
            let value = version.get(field).cloned().unwrap_or(Value::Null);
            (field.clone(), value)
        })
        .collect()
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
    fn reports_changed_fields_with_version_values() {
        let v1 = attrs(json!({"name": "Rodrigo", "email": "a@x"}));
        let v3 = attrs(json!({"name": "Julia", "email": "a@x"}));

        let diff = diff_attributes(&v1, &v3, &[]);
        assert_eq!(diff, attrs(json!({"name": "Rodrigo"})));
    }

    #[test]
    fn is_not_symmetric() {
        let a = attrs(json!({"name": "Rodrigo"}));
        let b = attrs(json!({"name": "John"}));

        assert_eq!(diff_attributes(&a, &b, &[])["name"], "Rodrigo");
        assert_eq!(diff_attributes(&b, &a, &[])["name"], "John");
    }

    #[test]
    fn excluded_fields_are_stripped() {
        let a = attrs(json!({"name": "Rodrigo", "updated_at": "t1", "deleted_at": null}));
        let b = attrs(json!({"name": "John", "updated_at": "t2", "deleted_at": "t2"}));

        let diff = diff_attributes(&a, &b, &["updated_at", "deleted_at"]);
        assert_eq!(diff, attrs(json!({"name": "Rodrigo"})));
    }

    #[test]
    fn field_missing_from_version_reports_null() {
        let a = attrs(json!({"name": "Rodrigo"}));
        let b = attrs(json!({"name": "Rodrigo", "nickname": "Ro"}));

        let diff = diff_attributes(&a, &b, &[]);
        assert_eq!(diff, attrs(json!({"nickname": null})));
    }

    #[test]
    fn missing_and_null_are_equal() {
        let a = attrs(json!({"name": "Rodrigo"}));
        let b = attrs(json!({"name": "Rodrigo", "nickname": null}));

        assert!(diff_attributes(&a, &b, &[]).is_empty());
    }

    #[test]
    fn fields_only_in_version_are_ignored() {
        let a = attrs(json!({"name": "Rodrigo", "extra": 1}));
        let b = attrs(json!({"name": "Rodrigo"}));

        assert!(diff_attributes(&a, &b, &[]).is_empty());
    }

    #[test]
    fn nested_values_compare_whole() {
        let a = attrs(json!({"settings": {"theme": "dark", "lang": "en"}}));
        let b = attrs(json!({"settings": {"theme": "light", "lang": "en"}}));

        let diff = diff_attributes(&a, &b, &[]);
        assert_eq!(diff["settings"], json!({"theme": "dark", "lang": "en"}));
    }
}
