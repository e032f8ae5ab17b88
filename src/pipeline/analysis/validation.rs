// Shape validation for parsed model replies.
// Applied between parse_reply() and returning an AnalysisResult.
// Only top-level structure is enforced; values pass through untouched.

use serde_json::Value;

use super::types::{AnalysisItem, AnalysisResult};
use super::AnalysisError;

/// Check a parsed reply against the `AnalysisResult` shape.
///
/// `date` must be a non-empty string and `items` an array of objects.
/// Item contents are not interpreted: field values keep their JSON type and
/// unknown keys, at the top level or inside items, are kept.
pub fn validate_shape(value: Value) -> Result<AnalysisResult, AnalysisError> {
    let mut root = match value {
        Value::Object(map) => map,
        other => {
            return Err(invalid(format!(
                "expected a JSON object, found {}",
                json_type(&other)
            )))
        }
    };

    let date = match root.shift_remove("date") {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::String(_)) => return Err(invalid("`date` is empty".into())),
        Some(Value::Null) | None => return Err(invalid("`date` is missing".into())),
        Some(other) => {
            return Err(invalid(format!(
                "`date` must be a string, found {}",
                json_type(&other)
            )))
        }
    };

    let raw_items = match root.shift_remove("items") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Err(invalid("`items` is missing".into())),
        Some(other) => {
            return Err(invalid(format!(
                "`items` must be an array, found {}",
                json_type(&other)
            )))
        }
    };

    let items = raw_items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => Ok(AnalysisItem::from_fields(fields)),
            other => Err(invalid(format!(
                "items[{index}] must be an object, found {}",
                json_type(&other)
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalysisResult {
        date,
        items,
        extra: root,
    })
}

fn invalid(detail: String) -> AnalysisError {
    AnalysisError::InvalidResultShape(detail)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_invalid(value: Value) -> String {
        match validate_shape(value) {
            Err(AnalysisError::InvalidResultShape(detail)) => detail,
            other => panic!("expected InvalidResultShape, got {other:?}"),
        }
    }

    #[test]
    fn valid_result_passes_unchanged() {
        let result = validate_shape(json!({
            "date": "2024-03-01",
            "items": [
                {"name": "血圧", "value": "120", "unit": "mmHg"},
                {"name": "体重", "value": "65.2", "unit": "kg"}
            ]
        }))
        .unwrap();
        assert_eq!(result.date, "2024-03-01");
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].name, Some(json!("血圧")));
        assert_eq!(result.items[1].value, Some(json!("65.2")));
    }

    #[test]
    fn empty_items_is_valid() {
        let result = validate_shape(json!({"date": "2024-03-01", "items": []})).unwrap();
        assert!(result.items.is_empty());
    }

    #[test]
    fn item_order_and_duplicates_are_preserved() {
        let result = validate_shape(json!({
            "date": "2024-03-01",
            "items": [
                {"name": "B", "value": "2", "unit": "x"},
                {"name": "A", "value": "1", "unit": "x"},
                {"name": "B", "value": "2", "unit": "x"}
            ]
        }))
        .unwrap();
        let names: Vec<_> = result.items.iter().map(|i| i.name.clone()).collect();
        assert_eq!(names, vec![Some(json!("B")), Some(json!("A")), Some(json!("B"))]);
        assert_eq!(result.items[0], result.items[2]);
    }

    #[test]
    fn missing_date_is_invalid() {
        let detail = assert_invalid(json!({"items": []}));
        assert!(detail.contains("date"));
    }

    #[test]
    fn empty_or_null_date_is_invalid() {
        assert_invalid(json!({"date": "", "items": []}));
        assert_invalid(json!({"date": null, "items": []}));
    }

    #[test]
    fn non_string_date_is_invalid() {
        assert_invalid(json!({"date": 20240301, "items": []}));
    }

    #[test]
    fn missing_items_is_invalid() {
        let detail = assert_invalid(json!({"date": "2024-03-01"}));
        assert!(detail.contains("items"));
    }

    #[test]
    fn non_array_items_is_invalid() {
        assert_invalid(json!({"date": "2024-03-01", "items": {"name": "血圧"}}));
        assert_invalid(json!({"date": "2024-03-01", "items": "none"}));
    }

    #[test]
    fn non_object_item_is_invalid() {
        let detail = assert_invalid(json!({"date": "2024-03-01", "items": ["血圧 120"]}));
        assert!(detail.contains("items[0]"));
    }

    #[test]
    fn missing_item_fields_pass_through_as_absent() {
        let result = validate_shape(json!({
            "date": "2024-03-01",
            "items": [{"name": "尿蛋白"}]
        }))
        .unwrap();
        assert_eq!(result.items[0].name, Some(json!("尿蛋白")));
        assert_eq!(result.items[0].value, None);
        assert_eq!(result.items[0].unit, None);
    }

    #[test]
    fn item_values_keep_their_json_type() {
        let result = validate_shape(json!({
            "date": "2024-03-01",
            "items": [
                {"name": "血圧", "value": 120, "unit": "mmHg"},
                {"name": "尿糖", "value": false, "unit": null},
                {"name": "血圧", "value": {"systolic": 120, "diastolic": 80}, "unit": "mmHg"}
            ]
        }))
        .unwrap();
        assert_eq!(result.items[0].value, Some(json!(120)));
        assert_eq!(result.items[1].value, Some(json!(false)));
        assert_eq!(result.items[1].unit, Some(Value::Null));
        assert_eq!(
            result.items[2].value,
            Some(json!({"systolic": 120, "diastolic": 80}))
        );
    }

    #[test]
    fn unknown_keys_are_kept_in_order() {
        let result = validate_shape(json!({
            "date": "2024-03-01",
            "note": "x",
            "items": [{"name": "血圧", "value": 120, "unit": "mmHg", "flag": "H"}]
        }))
        .unwrap();
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"date":"2024-03-01","items":[{"name":"血圧","value":120,"unit":"mmHg","flag":"H"}],"note":"x"}"#
        );
    }

    #[test]
    fn non_object_root_is_invalid() {
        assert_invalid(json!([1, 2, 3]));
    }
}
