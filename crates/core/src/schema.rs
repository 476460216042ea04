//! Minimal JSON Schema checks applied at the registry boundary.
//!
//! Only the subset the tool schemas use is understood: an object with
//! `properties`, each carrying a primitive `type` (arrays may constrain
//! their `items`), and a `required` list. Undeclared properties pass through.

use serde_json::Value;

/// Whether the schema declares a top-level property with this name.
pub fn declares_property(schema: &Value, name: &str) -> bool {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|props| props.contains_key(name))
}

/// Validate `args` against `schema`, returning a human-readable reason on failure.
pub fn validate(schema: &Value, args: &Value) -> Result<(), String> {
    let Some(object) = args.as_object() else {
        return Err(format!("expected an object, got {}", type_name(args)));
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            match object.get(field) {
                None | Some(Value::Null) => {
                    return Err(format!("missing required property '{field}'"));
                }
                Some(_) => {}
            }
        }
    }

    let Some(props) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (key, value) in object {
        let Some(prop) = props.get(key) else { continue };
        // Optional properties may be sent as explicit nulls.
        if value.is_null() {
            continue;
        }
        check_type(key, prop, value)?;
    }

    Ok(())
}

fn check_type(key: &str, prop: &Value, value: &Value) -> Result<(), String> {
    let Some(expected) = prop.get("type").and_then(Value::as_str) else {
        return Ok(());
    };

    let ok = match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => match value.as_array() {
            Some(items) => {
                if let Some(item_schema) = prop.get("items") {
                    for (i, item) in items.iter().enumerate() {
                        check_type(&format!("{key}[{i}]"), item_schema, item)?;
                    }
                }
                true
            }
            None => false,
        },
        _ => true,
    };

    if ok {
        Ok(())
    } else {
        Err(format!(
            "property '{key}' should be {expected}, got {}",
            type_name(value)
        ))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
