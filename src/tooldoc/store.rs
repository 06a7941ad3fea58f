use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{DiscoveryError, Result};
use crate::index::summary::truncate_chars;
use crate::model::Tool;
use crate::tooldoc::{
    schema_info_from, DetailLevel, DocEntry, ToolDoc, ToolExample, MAX_SUMMARY_LEN,
};

/// Resolves a canonical tool id to its tool payload. Implemented by the
/// index; tests and standalone deployments can inject their own.
pub trait ToolResolver: Send + Sync {
    fn resolve_tool(&self, id: &str) -> Result<Tool>;
}

impl<T: crate::index::Index + ?Sized> ToolResolver for T {
    fn resolve_tool(&self, id: &str) -> Result<Tool> {
        self.get_tool(id).map(|(tool, _)| tool)
    }
}

/// Documentation store contract.
pub trait DocStore: Send + Sync {
    /// Register or replace documentation for a tool. Oversized example args
    /// fail the whole call and leave the store unchanged.
    fn register_doc(&self, tool_id: &str, entry: DocEntry) -> Result<()>;

    /// Append examples to a tool's documentation, creating the entry if
    /// needed. Same arg caps as `register_doc`.
    fn register_examples(&self, tool_id: &str, examples: Vec<ToolExample>) -> Result<()>;

    /// Fetch documentation at the requested tier.
    fn describe_tool(&self, id: &str, level: DetailLevel) -> Result<ToolDoc>;

    /// Examples for a tool, capped at `min(max, configured max)`.
    fn list_examples(&self, id: &str, max: usize) -> Result<Vec<ToolExample>>;
}

/// Construction options for `InMemoryDocStore`.
#[derive(Default)]
pub struct StoreOptions {
    pub resolver: Option<Arc<dyn ToolResolver>>,
    /// Default cap on returned examples. 0 means the built-in default of 10.
    pub max_examples: usize,
}

const DEFAULT_MAX_EXAMPLES: usize = 10;

pub struct InMemoryDocStore {
    docs: RwLock<FxHashMap<String, DocEntry>>,
    resolver: Option<Arc<dyn ToolResolver>>,
    max_examples: usize,
}

impl std::fmt::Debug for InMemoryDocStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocStore")
            .field("max_examples", &self.max_examples)
            .finish_non_exhaustive()
    }
}

impl InMemoryDocStore {
    pub fn new(options: StoreOptions) -> Self {
        InMemoryDocStore {
            docs: RwLock::new(FxHashMap::default()),
            resolver: options.resolver,
            max_examples: if options.max_examples == 0 {
                DEFAULT_MAX_EXAMPLES
            } else {
                options.max_examples
            },
        }
    }

    fn resolve(&self, id: &str) -> Option<Tool> {
        self.resolver.as_ref().and_then(|r| r.resolve_tool(id).ok())
    }
}

impl DocStore for InMemoryDocStore {
    fn register_doc(&self, tool_id: &str, entry: DocEntry) -> Result<()> {
        if tool_id.is_empty() {
            return Err(DiscoveryError::invalid_request("tool id is required"));
        }
        let validated = entry.validate_and_truncate()?;
        self.docs.write().insert(tool_id.to_string(), validated);
        Ok(())
    }

    fn register_examples(&self, tool_id: &str, examples: Vec<ToolExample>) -> Result<()> {
        if tool_id.is_empty() {
            return Err(DiscoveryError::invalid_request("tool id is required"));
        }
        // Validate before touching the stored entry.
        let addition = DocEntry { examples, ..DocEntry::default() }.validate_and_truncate()?;

        let mut docs = self.docs.write();
        let entry = docs.entry(tool_id.to_string()).or_default();
        entry.examples.extend(addition.examples);
        Ok(())
    }

    fn describe_tool(&self, id: &str, level: DetailLevel) -> Result<ToolDoc> {
        let entry = self.docs.read().get(id).cloned();
        let tool = self.resolve(id);

        if entry.is_none() && tool.is_none() {
            return Err(DiscoveryError::not_found(format!("tool {id}")));
        }

        // Summary comes from the doc override, falling back to the tool
        // description.
        let summary = match (&entry, &tool) {
            (Some(e), _) if !e.summary.is_empty() => e.summary.clone(),
            (_, Some(t)) => truncate_chars(&t.description, MAX_SUMMARY_LEN),
            _ => String::new(),
        };

        let mut doc = ToolDoc { id: id.to_string(), summary, ..ToolDoc::default() };
        if level == DetailLevel::Summary {
            return Ok(doc);
        }

        // Schema and Full need the tool itself.
        let tool = tool.ok_or_else(|| DiscoveryError::NoTool { id: id.to_string() })?;
        doc.schema_info = schema_info_from(&tool.input_schema);
        doc.tool = Some(tool);
        if level == DetailLevel::Schema {
            return Ok(doc);
        }

        if let Some(entry) = entry {
            doc.notes = entry.notes;
            doc.examples = entry.examples.into_iter().take(self.max_examples).collect();
            doc.external_refs = entry.external_refs;
        }
        Ok(doc)
    }

    fn list_examples(&self, id: &str, max: usize) -> Result<Vec<ToolExample>> {
        let docs = self.docs.read();
        let entry = docs
            .get(id)
            .ok_or_else(|| DiscoveryError::not_found(format!("docs for tool {id}")))?;

        let effective = if max == 0 { self.max_examples } else { max.min(self.max_examples) };
        Ok(entry.examples.iter().take(effective).cloned().collect())
    }
}
