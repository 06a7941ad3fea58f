// Projection of a Tool into its discovery-facing shapes: the lightweight
// Summary served to consumers and the SearchDoc handed to searchers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::Tool;

/// Short descriptions are capped so summaries stay cheap to ship in bulk.
pub const MAX_SHORT_DESCRIPTION_LEN: usize = 120;

/// Lightweight discovery payload. Never carries schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short_description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub security_summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Scoring payload: the summary plus a pre-lowered text blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDoc {
    pub id: String,
    pub doc_text: String,
    pub summary: Summary,
}

/// Build the Summary projection for a tool.
pub fn summarize(tool: &Tool) -> Summary {
    let short = truncate_chars(&tool.description, MAX_SHORT_DESCRIPTION_LEN);
    let meta = tool.meta.as_ref();

    Summary {
        id: tool.tool_id(),
        name: tool.name.clone(),
        namespace: tool.namespace.clone(),
        short_description: short.clone(),
        summary: short,
        category: meta_string(meta, "category"),
        input_modes: meta_string_slice(meta, "inputModes"),
        output_modes: meta_string_slice(meta, "outputModes"),
        security_summary: security_summary(meta),
        tags: tool.tags.clone(),
    }
}

/// Build the SearchDoc projection for a tool. The doc text is the lowercased
/// concatenation of every searchable field.
pub fn search_doc(tool: &Tool) -> SearchDoc {
    let summary = summarize(tool);

    let mut parts: Vec<&str> = Vec::with_capacity(8 + summary.tags.len());
    parts.push(&summary.name);
    parts.push(&summary.namespace);
    parts.push(&tool.description);
    parts.push(&summary.summary);
    parts.push(&summary.category);
    for mode in &summary.input_modes {
        parts.push(mode);
    }
    for mode in &summary.output_modes {
        parts.push(mode);
    }
    for tag in &summary.tags {
        parts.push(tag);
    }

    let doc_text = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    SearchDoc { id: summary.id.clone(), doc_text, summary }
}

/// Truncate to at most `max` characters without splitting a char.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

fn meta_string(meta: Option<&Map<String, Value>>, key: &str) -> String {
    meta.and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn meta_string_slice(meta: Option<&Map<String, Value>>, key: &str) -> Vec<String> {
    match meta.and_then(|m| m.get(key)) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Derive the auth summary from security metadata: scheme names from
/// `securityRequirements`, falling back to `securitySchemes`, sorted and
/// comma-joined.
fn security_summary(meta: Option<&Map<String, Value>>) -> String {
    let Some(meta) = meta else { return String::new() };

    let mut schemes = scheme_names_from_requirements(meta.get("securityRequirements"));
    if schemes.is_empty() {
        schemes = scheme_names_from_schemes(meta.get("securitySchemes"));
    }
    if schemes.is_empty() {
        return String::new();
    }
    schemes.sort();
    schemes.dedup();
    schemes.join(",")
}

fn scheme_names_from_requirements(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::Array(reqs)) => reqs
            .iter()
            .filter_map(Value::as_object)
            .flat_map(|req| req.keys().cloned())
            .collect(),
        _ => Vec::new(),
    }
}

fn scheme_names_from_schemes(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::Object(schemes)) => schemes.keys().cloned().collect(),
        _ => Vec::new(),
    }
}
