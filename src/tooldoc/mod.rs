// Progressive tool documentation: tiered detail (summary, schema, full) so
// long content stays out of context until explicitly requested. Example args
// are size-capped at registration to keep examples safe to inline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DiscoveryError, Result};
use crate::index::summary::truncate_chars;
use crate::model::{SchemaValue, Tool};

pub mod store;

pub use store::{DocStore, InMemoryDocStore, StoreOptions, ToolResolver};

pub const MAX_SUMMARY_LEN: usize = 200;
pub const MAX_NOTES_LEN: usize = 2000;
pub const MAX_EXAMPLE_DESCRIPTION_LEN: usize = 300;
pub const MAX_RESULT_HINT_LEN: usize = 200;
/// Maximum nesting depth for example args (maps and arrays).
pub const MAX_ARGS_DEPTH: usize = 5;
/// Maximum total size (map keys + array items) across all levels.
pub const MAX_ARGS_KEYS: usize = 50;

/// Documentation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Summary,
    Schema,
    Full,
}

impl std::str::FromStr for DetailLevel {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "summary" => Ok(DetailLevel::Summary),
            "schema" => Ok(DetailLevel::Schema),
            "full" => Ok(DetailLevel::Full),
            other => Err(DiscoveryError::InvalidDetailLevel { level: other.to_string() }),
        }
    }
}

/// A worked example for a tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExample {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub args: Map<String, Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result_hint: String,
}

/// Registered documentation for one tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ToolExample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_refs: Vec<String>,
}

impl DocEntry {
    /// Cap string fields and validate example args. Oversized args fail the
    /// whole entry; oversized strings are silently truncated.
    pub fn validate_and_truncate(&self) -> Result<DocEntry> {
        let mut entry = self.clone();
        entry.summary = truncate_chars(&entry.summary, MAX_SUMMARY_LEN);
        entry.notes = truncate_chars(&entry.notes, MAX_NOTES_LEN);

        for example in &mut entry.examples {
            example.description =
                truncate_chars(&example.description, MAX_EXAMPLE_DESCRIPTION_LEN);
            example.result_hint = truncate_chars(&example.result_hint, MAX_RESULT_HINT_LEN);

            let (stats, ok) = validate_args(&example.args);
            if !ok {
                return Err(DiscoveryError::ArgsTooLarge {
                    message: format!(
                        "example {:?}: depth {} (max {MAX_ARGS_DEPTH}), size {} (max {MAX_ARGS_KEYS})",
                        example.title, stats.depth, stats.keys
                    ),
                });
            }
        }
        Ok(entry)
    }
}

/// Schema facts derived best-effort from a tool's input schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub defaults: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, Vec<String>>,
}

/// Documentation payload at a requested tier. Higher tiers fill more fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDoc {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<Tool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_info: Option<SchemaInfo>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ToolExample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_refs: Vec<String>,
}

/// Size measurements for example args.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArgStats {
    pub depth: usize,
    pub keys: usize,
}

/// Measure args nesting depth and total size. Returns the stats and whether
/// they are within the caps.
pub fn validate_args(args: &Map<String, Value>) -> (ArgStats, bool) {
    let mut stats = ArgStats::default();
    if !args.is_empty() {
        stats.depth = 1;
        stats.keys = args.len();
        for value in args.values() {
            measure(value, 2, &mut stats);
        }
    }
    (stats, stats.depth <= MAX_ARGS_DEPTH && stats.keys <= MAX_ARGS_KEYS)
}

fn measure(value: &Value, depth: usize, stats: &mut ArgStats) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            stats.depth = stats.depth.max(depth);
            stats.keys += map.len();
            for v in map.values() {
                measure(v, depth + 1, stats);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            stats.depth = stats.depth.max(depth);
            stats.keys += items.len();
            for v in items {
                measure(v, depth + 1, stats);
            }
        }
        _ => {}
    }
}

/// Derive `SchemaInfo` from an object-shaped JSON schema. Anything that does
/// not look like a schema yields `None`.
pub fn schema_info_from(schema: &SchemaValue) -> Option<SchemaInfo> {
    let obj = schema.as_value().as_object()?;
    let mut info = SchemaInfo::default();

    if let Some(required) = obj.get("required").and_then(Value::as_array) {
        info.required =
            required.iter().filter_map(Value::as_str).map(str::to_string).collect();
    }

    if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        for (name, prop) in props {
            let Some(prop) = prop.as_object() else { continue };
            if let Some(default) = prop.get("default") {
                info.defaults.insert(name.clone(), default.clone());
            }
            match prop.get("type") {
                Some(Value::String(t)) => {
                    info.types.insert(name.clone(), vec![t.clone()]);
                }
                Some(Value::Array(ts)) => {
                    info.types.insert(
                        name.clone(),
                        ts.iter().filter_map(Value::as_str).map(str::to_string).collect(),
                    );
                }
                _ => {}
            }
        }
    }

    Some(info)
}
