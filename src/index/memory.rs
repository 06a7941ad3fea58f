// In-memory index: the authoritative tool registry. One RW-lock guards the
// record map, namespace counts, listener table and the search-doc snapshot
// cache; listener callbacks always run outside that lock.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{DiscoveryError, Result};
use crate::index::cursor;
use crate::index::summary::{search_doc, SearchDoc, Summary};
use crate::index::{
    default_backend_selector, BackendSelector, ChangeEvent, ChangeKind, ChangeListener,
    DefaultSearcher, Index, ListenerId, Searcher, ToolRegistration,
};
use crate::model::{identity_for_unregister, BackendKind, Tool, ToolBackend};

/// One registered tool: the accepted payload plus its backend set keyed by
/// backend identity, in insertion order.
#[derive(Debug, Clone)]
struct ToolRecord {
    tool: Tool,
    backends: Vec<(String, ToolBackend)>,
}

struct Inner {
    records: FxHashMap<String, ToolRecord>,
    /// Tool count per namespace; a namespace leaves the set at zero.
    namespaces: FxHashMap<String, usize>,
    docs_cache: Option<Arc<Vec<SearchDoc>>>,
    dirty: bool,
    version: u64,
    listeners: Vec<(u64, ChangeListener)>,
    next_listener_id: u64,
    pending_events: VecDeque<ChangeEvent>,
    search_doc_builds: u64,
}

/// Construction options for `InMemoryIndex`.
#[derive(Default)]
pub struct IndexOptions {
    pub searcher: Option<Arc<dyn Searcher>>,
    pub backend_selector: Option<BackendSelector>,
    /// When set, `search_page` refuses searchers that do not declare
    /// themselves deterministic.
    pub require_deterministic_searcher: bool,
}

pub struct InMemoryIndex {
    inner: RwLock<Inner>,
    /// Serializes event dispatch so every listener observes commit order.
    notify: Mutex<()>,
    searcher: Arc<dyn Searcher>,
    selector: BackendSelector,
    require_deterministic: bool,
}

impl std::fmt::Debug for InMemoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIndex")
            .field("require_deterministic", &self.require_deterministic)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new(IndexOptions::default())
    }
}

impl InMemoryIndex {
    pub fn new(options: IndexOptions) -> Self {
        InMemoryIndex {
            inner: RwLock::new(Inner {
                records: FxHashMap::default(),
                namespaces: FxHashMap::default(),
                docs_cache: None,
                dirty: true,
                version: 0,
                listeners: Vec::new(),
                next_listener_id: 1,
                pending_events: VecDeque::new(),
                search_doc_builds: 0,
            }),
            notify: Mutex::new(()),
            searcher: options.searcher.unwrap_or_else(|| Arc::new(DefaultSearcher)),
            selector: options
                .backend_selector
                .unwrap_or_else(|| Arc::new(default_backend_selector)),
            require_deterministic: options.require_deterministic_searcher,
        }
    }

    /// Current search-doc snapshot plus the version it reflects, building it
    /// at most once per dirty cycle even under concurrent readers.
    fn snapshot_docs(&self) -> (Arc<Vec<SearchDoc>>, u64) {
        {
            let inner = self.inner.read();
            if !inner.dirty {
                if let Some(cache) = &inner.docs_cache {
                    return (Arc::clone(cache), inner.version);
                }
            }
        }

        let mut inner = self.inner.write();
        if inner.dirty || inner.docs_cache.is_none() {
            let mut docs: Vec<SearchDoc> =
                inner.records.values().map(|r| search_doc(&r.tool)).collect();
            docs.sort_by(|a, b| a.id.cmp(&b.id));
            inner.docs_cache = Some(Arc::new(docs));
            inner.dirty = false;
            inner.search_doc_builds += 1;
            debug!(builds = inner.search_doc_builds, "rebuilt search-doc snapshot");
        }
        (Arc::clone(inner.docs_cache.as_ref().expect("snapshot just built")), inner.version)
    }

    /// Apply one registration under the write lock. Inputs must already be
    /// validated; the MCP-field check against existing records still runs
    /// here and is the only remaining failure.
    fn apply_register(inner: &mut Inner, tool: Tool, backend: ToolBackend) -> Result<()> {
        let id = tool.tool_id();
        let identity = backend
            .identity()
            .ok_or_else(|| DiscoveryError::invalid_backend("backend has no identity"))?;

        let kind = match inner.records.get_mut(&id) {
            Some(record) => {
                if !crate::model::mcp_fields_eq(&record.tool, &tool) {
                    return Err(DiscoveryError::invalid_tool(format!(
                        "tool {id} re-registered with different MCP-visible fields"
                    )));
                }
                match record.backends.iter_mut().find(|(key, _)| *key == identity) {
                    Some((_, existing)) => *existing = backend,
                    None => record.backends.push((identity, backend)),
                }
                // Registry extensions (tags, version) replace the stored values.
                record.tool = tool;
                ChangeKind::Updated
            }
            None => {
                let namespace = tool.namespace.clone();
                inner.records.insert(id.clone(), ToolRecord {
                    tool,
                    backends: vec![(identity, backend)],
                });
                *inner.namespaces.entry(namespace).or_insert(0) += 1;
                ChangeKind::Registered
            }
        };

        inner.dirty = true;
        inner.version += 1;
        let version = inner.version;
        inner.pending_events.push_back(ChangeEvent { kind, tool_id: id, version });
        Ok(())
    }

    /// Drain pending events one at a time under the notify mutex. A listener
    /// that writes back into the index enqueues a new event; its own drain
    /// attempt bails on the held mutex and the current drainer picks it up.
    fn drain_events(&self) {
        loop {
            let Some(_guard) = self.notify.try_lock() else { return };
            let next = {
                let mut inner = self.inner.write();
                let event = inner.pending_events.pop_front();
                event.map(|e| {
                    let listeners: Vec<ChangeListener> =
                        inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
                    (e, listeners)
                })
            };
            let Some((event, listeners)) = next else { return };
            for listener in listeners {
                if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                    warn!(tool_id = %event.tool_id, "change listener panicked");
                }
            }
        }
    }

    /// Number of snapshot rebuilds so far (test instrumentation).
    pub fn search_doc_builds(&self) -> u64 {
        self.inner.read().search_doc_builds
    }
}

#[async_trait]
impl Index for InMemoryIndex {
    fn register_tool(&self, mut tool: Tool, backend: ToolBackend) -> Result<()> {
        tool.validate()?;
        backend.validate()?;
        tool.normalize();

        {
            let mut inner = self.inner.write();
            Self::apply_register(&mut inner, tool, backend)?;
        }
        self.drain_events();
        Ok(())
    }

    fn register_tools(&self, batch: Vec<ToolRegistration>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut normalized = Vec::with_capacity(batch.len());
        for ToolRegistration { mut tool, backend } in batch {
            tool.validate()?;
            backend.validate()?;
            tool.normalize();
            normalized.push((tool, backend));
        }

        {
            let mut inner = self.inner.write();

            // Check MCP-field consistency for the whole batch before any
            // element is applied, both against stored records and against
            // earlier batch elements, so application cannot fail partway.
            {
                let mut batch_tools: FxHashMap<String, &Tool> = FxHashMap::default();
                for (tool, _) in &normalized {
                    let id = tool.tool_id();
                    let prior = inner
                        .records
                        .get(&id)
                        .map(|r| &r.tool)
                        .or_else(|| batch_tools.get(&id).copied());
                    if let Some(prior) = prior {
                        if !crate::model::mcp_fields_eq(prior, tool) {
                            return Err(DiscoveryError::invalid_tool(format!(
                                "tool {id} re-registered with different MCP-visible fields"
                            )));
                        }
                    }
                    batch_tools.insert(id, tool);
                }
            }

            for (tool, backend) in normalized {
                Self::apply_register(&mut inner, tool, backend)?;
            }
        }
        self.drain_events();
        Ok(())
    }

    fn register_tools_from_mcp(&self, server_name: &str, tools: Vec<Tool>) -> Result<()> {
        let backend = ToolBackend::mcp(server_name);
        backend.validate()?;
        let batch = tools
            .into_iter()
            .map(|tool| ToolRegistration { tool, backend: backend.clone() })
            .collect();
        self.register_tools(batch)
    }

    fn unregister_backend(&self, id: &str, kind: BackendKind, discriminator: &str) -> Result<()> {
        let identity = identity_for_unregister(kind, discriminator)?;

        {
            let mut inner = self.inner.write();
            let record = inner
                .records
                .get_mut(id)
                .ok_or_else(|| DiscoveryError::not_found(format!("tool {id}")))?;

            let position = record
                .backends
                .iter()
                .position(|(key, _)| *key == identity)
                .ok_or_else(|| {
                    DiscoveryError::not_found(format!("backend {identity} for tool {id}"))
                })?;
            record.backends.remove(position);

            let kind = if record.backends.is_empty() {
                let namespace = record.tool.namespace.clone();
                inner.records.remove(id);
                if let Some(count) = inner.namespaces.get_mut(&namespace) {
                    *count -= 1;
                    if *count == 0 {
                        inner.namespaces.remove(&namespace);
                    }
                }
                ChangeKind::ToolRemoved
            } else {
                ChangeKind::BackendRemoved
            };

            inner.dirty = true;
            inner.version += 1;
            let version = inner.version;
            inner.pending_events.push_back(ChangeEvent {
                kind,
                tool_id: id.to_string(),
                version,
            });
        }
        self.drain_events();
        Ok(())
    }

    fn get_tool(&self, id: &str) -> Result<(Tool, ToolBackend)> {
        let inner = self.inner.read();
        let record = inner
            .records
            .get(id)
            .ok_or_else(|| DiscoveryError::not_found(format!("tool {id}")))?;

        let backends: Vec<ToolBackend> =
            record.backends.iter().map(|(_, b)| b.clone()).collect();
        let backend = (self.selector)(&backends)
            .or_else(|| backends.first().cloned())
            .ok_or_else(|| DiscoveryError::internal(format!("tool {id} has no backends")))?;

        Ok((record.tool.clone(), backend))
    }

    fn get_all_backends(&self, id: &str) -> Result<Vec<ToolBackend>> {
        let inner = self.inner.read();
        let record = inner
            .records
            .get(id)
            .ok_or_else(|| DiscoveryError::not_found(format!("tool {id}")))?;
        Ok(record.backends.iter().map(|(_, b)| b.clone()).collect())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Summary>> {
        let (docs, _) = self.snapshot_docs();
        self.searcher.search(query, limit, &docs).await
    }

    async fn search_page(
        &self,
        query: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<(Vec<Summary>, Option<String>)> {
        if self.require_deterministic && !self.searcher.deterministic() {
            return Err(DiscoveryError::NonDeterministicSearcher);
        }

        let (docs, version) = self.snapshot_docs();
        let offset = cursor::resolve_offset(cursor, version, query)?;

        let ranked = self.searcher.search(query, docs.len(), &docs).await?;
        let total = ranked.len();
        let page: Vec<Summary> = ranked.into_iter().skip(offset).take(limit).collect();
        let next = cursor::next_cursor(version, query, offset + page.len(), total);
        Ok((page, next))
    }

    fn list_namespaces(&self) -> Result<Vec<String>> {
        let inner = self.inner.read();
        let mut namespaces: Vec<String> = inner.namespaces.keys().cloned().collect();
        namespaces.sort();
        Ok(namespaces)
    }

    fn list_namespaces_page(
        &self,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>)> {
        let inner = self.inner.read();
        let version = inner.version;
        let mut namespaces: Vec<String> = inner.namespaces.keys().cloned().collect();
        drop(inner);
        namespaces.sort();

        let offset = cursor::resolve_offset(cursor, version, "")?;
        let total = namespaces.len();
        let page: Vec<String> = namespaces.into_iter().skip(offset).take(limit).collect();
        let next = cursor::next_cursor(version, "", offset + page.len(), total);
        Ok((page, next))
    }

    fn on_change(&self, listener: ChangeListener) -> ListenerId {
        let mut inner = self.inner.write();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, listener));
        ListenerId(id)
    }

    fn unsubscribe(&self, id: ListenerId) {
        let mut inner = self.inner.write();
        inner.listeners.retain(|(key, _)| *key != id.0);
    }

    fn refresh(&self) -> u64 {
        let mut inner = self.inner.write();
        inner.dirty = true;
        inner.version += 1;
        inner.version
    }

    fn version(&self) -> u64 {
        self.inner.read().version
    }
}
