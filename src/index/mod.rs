// Tool index: authoritative registry with pluggable search and cursor
// pagination.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{BackendKind, Tool, ToolBackend};

pub mod cursor;
pub mod memory;
pub mod summary;

pub use cursor::Cursor;
pub use memory::{InMemoryIndex, IndexOptions};
pub use summary::{search_doc, summarize, SearchDoc, Summary, MAX_SHORT_DESCRIPTION_LEN};

/// A tool paired with the backend it should be registered under.
#[derive(Debug, Clone)]
pub struct ToolRegistration {
    pub tool: Tool,
    pub backend: ToolBackend,
}

/// What changed in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Registered,
    Updated,
    ToolRemoved,
    BackendRemoved,
}

/// Emitted after each committed write, outside the index lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub tool_id: String,
    pub version: u64,
}

/// Change listener callback. Listeners run after the write lock is released
/// and may call back into the index.
pub type ChangeListener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Token returned by `on_change`, consumed by `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Picks the backend `get_tool` returns when a record has several.
pub type BackendSelector = Arc<dyn Fn(&[ToolBackend]) -> Option<ToolBackend> + Send + Sync>;

/// Default selection policy: Local > Provider > MCP, falling back to the
/// first backend in insertion order.
pub fn default_backend_selector(backends: &[ToolBackend]) -> Option<ToolBackend> {
    for kind in [BackendKind::Local, BackendKind::Provider, BackendKind::Mcp] {
        if let Some(backend) = backends.iter().find(|b| b.kind() == kind) {
            return Some(backend.clone());
        }
    }
    backends.first().cloned()
}

/// Scoring contract. Implementations must order results by score descending
/// with id ascending as the tiebreaker, return the first `limit` docs in id
/// order for an empty query, and return nothing for `limit == 0`.
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, query: &str, limit: usize, docs: &[SearchDoc]) -> Result<Vec<Summary>>;

    /// Whether identical inputs always produce identical output. Pagination
    /// is only sound over deterministic searchers.
    fn deterministic(&self) -> bool {
        false
    }
}

/// Registry contract implemented by `InMemoryIndex`.
#[async_trait]
pub trait Index: Send + Sync {
    fn register_tool(&self, tool: Tool, backend: ToolBackend) -> Result<()>;
    fn register_tools(&self, batch: Vec<ToolRegistration>) -> Result<()>;
    fn register_tools_from_mcp(&self, server_name: &str, tools: Vec<Tool>) -> Result<()>;
    fn unregister_backend(&self, id: &str, kind: BackendKind, discriminator: &str) -> Result<()>;
    fn get_tool(&self, id: &str) -> Result<(Tool, ToolBackend)>;
    fn get_all_backends(&self, id: &str) -> Result<Vec<ToolBackend>>;
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Summary>>;
    async fn search_page(
        &self,
        query: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<(Vec<Summary>, Option<String>)>;
    fn list_namespaces(&self) -> Result<Vec<String>>;
    fn list_namespaces_page(
        &self,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>)>;
    fn on_change(&self, listener: ChangeListener) -> ListenerId;
    fn unsubscribe(&self, id: ListenerId);
    fn refresh(&self) -> u64;
    fn version(&self) -> u64;
}

/// Lexical fallback searcher: case-insensitive substring matching over the
/// doc text with an occurrence-count score. Sufficient for small corpora and
/// always available.
#[derive(Debug, Default)]
pub struct DefaultSearcher;

#[async_trait]
impl Searcher for DefaultSearcher {
    async fn search(&self, query: &str, limit: usize, docs: &[SearchDoc]) -> Result<Vec<Summary>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        if query.is_empty() {
            return Ok(docs.iter().take(limit).map(|d| d.summary.clone()).collect());
        }

        let needle = query.to_lowercase();
        let mut scored: Vec<(usize, &SearchDoc)> = docs
            .iter()
            .filter_map(|doc| {
                let count = doc.doc_text.matches(&needle).count();
                (count > 0).then_some((count, doc))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));

        Ok(scored.into_iter().take(limit).map(|(_, d)| d.summary.clone()).collect())
    }

    fn deterministic(&self) -> bool {
        true
    }
}
