//! Strict JSON schema generation for structured outputs.
//!
//! Strict mode only accepts a subset of JSON Schema: every object must list all
//! of its properties as required and forbid extra ones, and references and
//! keywords like `format` are rejected.

use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde_json::{Map, Value};

const DROPPED_KEYWORDS: &[&str] = &["$schema", "title", "format", "definitions"];

/// Build the strict schema for `T` with all subschemas inlined.
pub fn strict_schema_for<T: JsonSchema>() -> Result<Value, serde_json::Error> {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
        })
        .into_generator();
    let root = generator.into_root_schema_for::<T>();

    let mut value = serde_json::to_value(root)?;
    if let Value::Object(map) = &mut value {
        make_strict(map);
    }
    Ok(value)
}

fn make_strict(schema: &mut Map<String, Value>) {
    for key in DROPPED_KEYWORDS {
        schema.remove(*key);
    }

    if let Some(Value::Object(props)) = schema.get_mut("properties") {
        let names: Vec<Value> = props.keys().cloned().map(Value::String).collect();
        for child in props.values_mut() {
            if let Value::Object(child) = child {
                make_strict(child);
            }
        }
        schema.insert("required".to_string(), Value::Array(names));
        schema.insert("additionalProperties".to_string(), Value::Bool(false));
    }

    match schema.get_mut("items") {
        Some(Value::Object(items)) => make_strict(items),
        Some(Value::Array(items)) => {
            for item in items {
                if let Value::Object(item) = item {
                    make_strict(item);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ExtractionResult;

    #[test]
    fn test_extraction_schema_is_strict() {
        let schema = strict_schema_for::<ExtractionResult>().unwrap();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["required"], serde_json::json!(["data"]));
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("definitions").is_none());

        let item = &schema["properties"]["data"]["items"];
        assert_eq!(item["type"], "object");
        assert_eq!(item["additionalProperties"], false);

        let mut required: Vec<&str> = item["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        required.sort();
        assert_eq!(
            required,
            vec!["Amount", "Analysis", "Category", "Date", "Description", "Subcategory"]
        );

        assert_eq!(item["properties"]["Amount"]["type"], "number");
        assert!(item["properties"]["Amount"].get("format").is_none());
    }

    #[test]
    fn test_schema_has_no_refs() {
        let schema = strict_schema_for::<ExtractionResult>().unwrap();
        assert!(!schema.to_string().contains("$ref"));
    }
}
