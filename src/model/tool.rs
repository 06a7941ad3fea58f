use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DiscoveryError, Result};
use crate::model::schema::{json_eq, SchemaValue};

/// Behavioral hints advertised alongside a tool.
///
/// The two optional hints distinguish "unset" from "explicitly false", so
/// they stay `Option<bool>` while the others default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default)]
    pub read_only_hint: bool,
    #[serde(default)]
    pub idempotent_hint: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// An icon reference advertised for a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Icon {
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub theme: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sizes: Vec<String>,
}

/// A callable tool: a named operation with a JSON schema for its input.
///
/// `namespace`, `version` and `tags` are registry extensions layered on top
/// of the MCP-visible fields; they may change across re-registrations of the
/// same id while the MCP-visible fields may not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default = "SchemaValue::empty_object")]
    pub input_schema: SchemaValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<SchemaValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub icons: Vec<Icon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Tool {
    /// Minimal constructor for a tool with the common fields.
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: SchemaValue) -> Self {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
            ..Tool::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = normalize_tags(tags.into_iter().map(Into::into));
        self
    }

    /// Canonical id: `namespace:name:version`, `namespace:name`, or `name`.
    pub fn tool_id(&self) -> String {
        match (self.namespace.is_empty(), self.version.is_empty()) {
            (false, false) => format!("{}:{}:{}", self.namespace, self.name, self.version),
            (false, true) => format!("{}:{}", self.namespace, self.name),
            _ => self.name.clone(),
        }
    }

    /// Reject tools with no name or no input schema.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DiscoveryError::invalid_tool("tool name is required"));
        }
        if self.input_schema.is_empty() {
            return Err(DiscoveryError::invalid_tool(format!(
                "tool {} has no input schema",
                self.name
            )));
        }
        Ok(())
    }

    /// Normalize registry extensions in place (tags on ingest).
    pub fn normalize(&mut self) {
        self.tags = normalize_tags(self.tags.drain(..));
    }
}

/// Compare the MCP-visible fields of two tools: name, title, description,
/// input/output schema (JSON-normalized), annotations, icons (order matters),
/// meta. Tags and version are registry extensions and deliberately excluded.
pub fn mcp_fields_eq(a: &Tool, b: &Tool) -> bool {
    a.name == b.name
        && a.title == b.title
        && a.description == b.description
        && a.input_schema == b.input_schema
        && a.output_schema == b.output_schema
        && a.annotations == b.annotations
        && a.icons == b.icons
        && meta_eq(a.meta.as_ref(), b.meta.as_ref())
}

fn meta_eq(a: Option<&Map<String, Value>>, b: Option<&Map<String, Value>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| json_eq(v, w)))
        }
        _ => false,
    }
}

/// Normalize tags: trim, lowercase, collapse internal whitespace runs to a
/// single `-`, drop empties, dedupe preserving first occurrence.
pub fn normalize_tags<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let normalized = tag
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        if normalized.is_empty() {
            continue;
        }
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_tool() -> Tool {
        Tool::new("mytool", "desc", SchemaValue::new(json!({"type": "object"})))
            .with_namespace("ns")
    }

    #[test]
    fn test_tool_id_forms() {
        let mut tool = Tool::new("status", "", SchemaValue::empty_object());
        assert_eq!(tool.tool_id(), "status");

        tool.namespace = "git".into();
        assert_eq!(tool.tool_id(), "git:status");

        tool.version = "v2".into();
        assert_eq!(tool.tool_id(), "git:status:v2");

        // Version without namespace falls back to bare name.
        tool.namespace = String::new();
        assert_eq!(tool.tool_id(), "status");
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let tool = Tool::new("", "desc", SchemaValue::new(json!({"type": "object"})));
        let err = tool.validate().unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidTool { .. }));
    }

    #[test]
    fn test_validate_rejects_empty_schema() {
        let tool = Tool::new("t", "desc", SchemaValue::new(Value::Null));
        assert!(tool.validate().is_err());
        let tool = Tool::new("t", "desc", SchemaValue::empty_object());
        assert!(tool.validate().is_err());
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(
            ["  TAG ONE  ", "TAG-TWO", "tag-two", "", "   "]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(tags, vec!["tag-one", "tag-two"]);
    }

    #[test]
    fn test_mcp_fields_eq_ignores_tags_and_version() {
        let a = base_tool().with_tags(["one"]);
        let mut b = base_tool().with_tags(["two", "three"]);
        b.version = "v9".into();
        // version participates in the id, not in MCP-visible equality
        assert!(mcp_fields_eq(&a, &b));
    }

    #[test]
    fn test_mcp_fields_eq_detects_changes() {
        let a = base_tool();

        let mut changed = base_tool();
        changed.description = "other".into();
        assert!(!mcp_fields_eq(&a, &changed));

        let mut changed = base_tool();
        changed.title = "Title".into();
        assert!(!mcp_fields_eq(&a, &changed));

        let mut changed = base_tool();
        changed.input_schema =
            SchemaValue::new(json!({"type": "object", "properties": {"x": {"type": "string"}}}));
        assert!(!mcp_fields_eq(&a, &changed));

        let mut changed = base_tool();
        changed.output_schema = Some(SchemaValue::new(json!({"type": "string"})));
        assert!(!mcp_fields_eq(&a, &changed));

        let mut changed = base_tool();
        changed.icons = vec![Icon { source: "https://example.com/icon.png".into(), ..Icon::default() }];
        assert!(!mcp_fields_eq(&a, &changed));

        let mut changed = base_tool();
        changed.meta = Some(json!({"k": "v"}).as_object().unwrap().clone());
        assert!(!mcp_fields_eq(&a, &changed));
    }

    #[test]
    fn test_mcp_fields_eq_annotations_optional_hints() {
        let mut a = base_tool();
        a.annotations = Some(ToolAnnotations { destructive_hint: Some(true), ..Default::default() });
        let mut b = base_tool();
        b.annotations = Some(ToolAnnotations { destructive_hint: Some(false), ..Default::default() });
        assert!(!mcp_fields_eq(&a, &b));

        let mut c = base_tool();
        c.annotations = Some(ToolAnnotations { destructive_hint: None, ..Default::default() });
        assert!(!mcp_fields_eq(&a, &c));

        b.annotations = a.annotations.clone();
        assert!(mcp_fields_eq(&a, &b));
    }

    #[test]
    fn test_mcp_fields_eq_raw_schema_forms() {
        let mut a = base_tool();
        a.input_schema = SchemaValue::new(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}}
        }));
        let mut b = base_tool();
        b.input_schema = SchemaValue::from_str(
            r#"{"type":"object","properties":{"name":{"type":"string"}}}"#,
        )
        .unwrap();
        assert!(mcp_fields_eq(&a, &b));

        b.input_schema =
            SchemaValue::from_str(r#"{"type":"object","properties":{"age":{"type":"number"}}}"#)
                .unwrap();
        assert!(!mcp_fields_eq(&a, &b));
    }

    #[test]
    fn test_icons_order_sensitive() {
        let icon1 = Icon { source: "icon1.png".into(), ..Icon::default() };
        let icon2 = Icon { source: "icon2.png".into(), ..Icon::default() };

        let mut a = base_tool();
        a.icons = vec![icon1.clone(), icon2.clone()];
        let mut b = base_tool();
        b.icons = vec![icon2, icon1];
        assert!(!mcp_fields_eq(&a, &b));
    }
}
