//! JSON schema generation for strict structured outputs.
//!
//! `schemars` produces the schema; it is then reshaped into the subset strict mode accepts.
//!
//! ```rust,ignore
//! #[derive(Deserialize, JsonSchema)]
//! struct RouteChoice {
//!     next: String,
//! }
//!
//! let schema = RouteChoice::openai_schema();
//! ```

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types usable as strict structured output.
///
/// Blanket-implemented for everything that is `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Schema in the shape strict mode expects: every object closed with
    /// `additionalProperties: false`, every property required (nullable ones too),
    /// and no `$ref`s left.
    fn openai_schema() -> Value {
        let mut value = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        close_objects(&mut value);

        let definitions = value.get("definitions").cloned().unwrap_or(Value::Null);
        inline_refs(&mut value, &definitions);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    /// Schema name reported in `response_format.json_schema.name`.
    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".into(), Value::Bool(false));
                if let Some(required) = all_property_names(map) {
                    map.insert("required".into(), required);
                }
            }
            map.values_mut().for_each(close_objects);
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

fn all_property_names(map: &Map<String, Value>) -> Option<Value> {
    let props = map.get("properties")?.as_object()?;
    Some(Value::Array(props.keys().cloned().map(Value::String).collect()))
}

/// Replace `{"$ref": "#/definitions/X"}` nodes with the definition of `X`.
fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();

            match target {
                Some(def) => {
                    *value = def;
                    inline_refs(value, definitions);
                }
                None => map
                    .values_mut()
                    .for_each(|v| inline_refs(v, definitions)),
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| inline_refs(v, definitions)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct RouteChoice {
        next: String,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Clause {
        title: String,
        description: String,
        action: Option<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Summary {
        risk_level: Option<String>,
        clauses: Vec<Clause>,
    }

    #[test]
    fn test_flat_schema_is_strict() {
        let schema = RouteChoice::openai_schema();
        let obj = schema.as_object().unwrap();

        assert_eq!(obj.get("type"), Some(&serde_json::json!("object")));
        assert_eq!(obj.get("additionalProperties"), Some(&serde_json::json!(false)));
        assert_eq!(obj.get("required"), Some(&serde_json::json!(["next"])));
        assert!(!obj.contains_key("$schema"));
    }

    #[test]
    fn test_optional_fields_are_required() {
        let schema = Clause::openai_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();

        assert!(required.contains(&"title"));
        assert!(required.contains(&"description"));
        assert!(required.contains(&"action"));
    }

    #[test]
    fn test_nested_struct_inlined() {
        let schema = Summary::openai_schema();
        let obj = schema.as_object().unwrap();

        assert!(!obj.contains_key("definitions"));

        let items = &schema["properties"]["clauses"]["items"];
        assert!(items.get("$ref").is_none(), "clause items should be inlined");
        assert_eq!(items["type"], "object");
        assert_eq!(items["additionalProperties"], false);
        assert_eq!(items["required"].as_array().unwrap().len(), 3);

        let rendered = serde_json::to_string(&schema).unwrap();
        assert!(!rendered.contains("$ref"));
    }

    #[test]
    fn test_type_name() {
        assert_eq!(RouteChoice::type_name(), "RouteChoice");
    }
}
