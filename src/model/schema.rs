// JSON schema payloads arrive in several shapes: already-parsed values from
// config files, raw JSON text from MCP wire messages, raw bytes from storage.
// SchemaValue normalizes all of them to a parsed `serde_json::Value` at the
// boundary so that equality is equality of the JSON value, not of its
// encoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DiscoveryError, Result};

/// A JSON schema (or any JSON document) normalized for structural comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaValue(Value);

impl SchemaValue {
    pub fn new(value: Value) -> Self {
        SchemaValue(value)
    }

    /// Parse a schema from raw JSON text.
    pub fn from_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|e| {
            DiscoveryError::invalid_tool(format!("schema is not valid JSON: {e}"))
        })?;
        Ok(SchemaValue(value))
    }

    /// Parse a schema from raw JSON bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(raw).map_err(|e| {
            DiscoveryError::invalid_tool(format!("schema is not valid JSON: {e}"))
        })?;
        Ok(SchemaValue(value))
    }

    /// An empty object schema, useful as a minimal valid input schema.
    pub fn empty_object() -> Self {
        SchemaValue(Value::Object(serde_json::Map::new()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// A schema is "empty" when it is null, an empty object, or an empty string.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Look up a property of an object-shaped schema.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.as_object().and_then(|m| m.get(key))
    }
}

impl Default for SchemaValue {
    fn default() -> Self {
        SchemaValue(Value::Null)
    }
}

impl PartialEq for SchemaValue {
    fn eq(&self, other: &Self) -> bool {
        json_eq(&self.0, &other.0)
    }
}

impl Eq for SchemaValue {}

impl From<Value> for SchemaValue {
    fn from(value: Value) -> Self {
        SchemaValue(value)
    }
}

/// Deep JSON equality with numeric normalization: `42` and `42.0` describe
/// the same JSON number and compare equal even though serde keeps them in
/// different internal representations.
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(xf), Some(yf)) => xf == yf,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm.iter().all(|(k, v)| ym.get(k).is_some_and(|w| json_eq(v, w)))
        }
        _ => a == b,
    }
}

/// Equality between optional JSON values where absent and `null` differ.
pub fn opt_json_eq(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => json_eq(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_and_parsed_forms_compare_equal() {
        let parsed = SchemaValue::new(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}}
        }));
        let raw = SchemaValue::from_str(
            r#"{"type":"object","properties":{"name":{"type":"string"}}}"#,
        )
        .unwrap();
        let bytes = SchemaValue::from_slice(
            br#"{"properties":{"name":{"type":"string"}},"type":"object"}"#,
        )
        .unwrap();

        assert_eq!(parsed, raw);
        assert_eq!(parsed, bytes);
    }

    #[test]
    fn test_different_schemas_not_equal() {
        let a = SchemaValue::new(json!({"type": "object", "properties": {"x": {"type": "integer"}}}));
        let b = SchemaValue::from_str(r#"{"type":"object","properties":{"y":{"type":"number"}}}"#)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(SchemaValue::from_str("{invalid").is_err());
        assert!(SchemaValue::from_slice(b"{invalid").is_err());
    }

    #[test]
    fn test_is_empty() {
        assert!(SchemaValue::new(Value::Null).is_empty());
        assert!(SchemaValue::empty_object().is_empty());
        assert!(!SchemaValue::new(json!({"type": "object"})).is_empty());
    }

    #[test]
    fn test_json_eq() {
        assert!(json_eq(&json!(42), &json!(42.0)));
        assert!(!json_eq(&json!(42), &json!(43)));
        assert!(!json_eq(&json!("42"), &json!(42)));
        assert!(!json_eq(&json!(true), &json!("true")));
        assert!(json_eq(&json!({"k": "v"}), &json!({"k": "v"})));
        assert!(!json_eq(&json!({"k": "v"}), &json!({"k": "v", "k2": "v2"})));
        assert!(json_eq(&json!(["a", "b"]), &json!(["a", "b"])));
        assert!(!json_eq(&json!(["a"]), &json!(["a", "b"])));
        assert!(json_eq(&json!({"nested": {"a": "b"}}), &json!({"nested": {"a": "b"}})));
        assert!(!json_eq(&json!({"nested": {"a": "b"}}), &json!({"nested": {"a": "c"}})));
    }

    #[test]
    fn test_opt_json_eq() {
        let v = json!({"k": "v"});
        assert!(opt_json_eq(None, None));
        assert!(opt_json_eq(Some(&v), Some(&v)));
        assert!(!opt_json_eq(Some(&v), None));
    }
}
