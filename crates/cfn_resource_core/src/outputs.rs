use serde_json::Value;

use crate::contract::{Attributes, SCALAR_OUTPUT_KEY};

/// Converts an operation's return value into the response `Data` mapping.
///
/// Objects are used as the attribute set, `null` yields no attributes, and
/// any other value becomes the single attribute `Value`. With `stringify`
/// set, attribute values that are not strings, numbers or booleans are
/// replaced by their compact JSON text.
pub fn normalize_outputs(output: Value, stringify: bool) -> Attributes {
    let attributes = match output {
        Value::Null => Attributes::new(),
        Value::Object(map) => map,
        scalar => Attributes::from_iter([(SCALAR_OUTPUT_KEY.to_string(), scalar)]),
    };

    if !stringify {
        return attributes;
    }

    attributes
        .into_iter()
        .map(|(key, value)| (key, stringify_value(value)))
        .collect()
}

fn stringify_value(value: Value) -> Value {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => value,
        structured => Value::String(structured.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn mapping_is_used_as_attribute_set() {
        let attributes = normalize_outputs(json!({"output_key": "output_value"}), true);
        assert_eq!(
            Value::Object(attributes),
            json!({"output_key": "output_value"})
        );
    }

    #[test]
    fn scalar_is_wrapped_as_value() {
        assert_eq!(
            Value::Object(normalize_outputs(json!("output_value"), true)),
            json!({"Value": "output_value"})
        );
        assert_eq!(
            Value::Object(normalize_outputs(json!(42), false)),
            json!({"Value": 42})
        );
    }

    #[test]
    fn absent_output_is_empty() {
        assert!(normalize_outputs(Value::Null, true).is_empty());
    }

    #[test]
    fn nested_values_are_stringified_by_default() {
        let attributes = normalize_outputs(
            json!({
                "output_key": {"subkey": "subvalue"},
                "list": [1, 2],
                "flag": true,
                "count": 3,
                "missing": null
            }),
            true,
        );
        assert_eq!(
            Value::Object(attributes),
            json!({
                "output_key": "{\"subkey\":\"subvalue\"}",
                "list": "[1,2]",
                "flag": true,
                "count": 3,
                "missing": "null"
            })
        );
    }

    #[test]
    fn nested_values_pass_through_when_not_stringified() {
        let output = json!({"output_key": {"subkey": "subvalue"}});
        let attributes = normalize_outputs(output.clone(), false);
        assert_eq!(Value::Object(attributes), output);
    }

    #[test]
    fn keys_are_not_renamed() {
        let attributes = normalize_outputs(json!({"MixedCase": 1, "snake_case": 2}), true);
        let mut keys: Vec<_> = attributes.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["MixedCase", "snake_case"]);
    }
}
