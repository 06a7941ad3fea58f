// Production BM25 searcher backed by an in-RAM tantivy index. The engine is
// cached per doc-set fingerprint: reads check the fingerprint under a read
// lock and only a changed doc set triggers a rebuild under the write lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};
use tantivy::{doc, Document, Index as TantivyIndex};
use tracing::debug;

use crate::error::{DiscoveryError, Result};
use crate::index::{SearchDoc, Searcher, Summary};
use crate::search::fingerprint::compute_fingerprint;

/// BM25 configuration. Field boosts default to name 3.0 / namespace 2.0 /
/// tags 2.0; the caps are off unless set.
#[derive(Debug, Clone)]
pub struct Bm25Config {
    pub name_boost: f32,
    pub namespace_boost: f32,
    pub tags_boost: f32,
    /// Index at most this many documents.
    pub max_docs: Option<usize>,
    /// Truncate doc text to this many characters before indexing.
    pub max_doc_text_len: Option<usize>,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Bm25Config {
            name_boost: 3.0,
            namespace_boost: 2.0,
            tags_boost: 2.0,
            max_docs: None,
            max_doc_text_len: None,
        }
    }
}

struct Fields {
    id: Field,
    name: Field,
    namespace: Field,
    tags: Field,
    doc_text: Field,
}

/// One built engine, valid for a single doc-set fingerprint.
struct Engine {
    fingerprint: String,
    index: TantivyIndex,
    fields: Fields,
    summaries: FxHashMap<String, Summary>,
    /// Ids sorted ascending, for empty-query listing.
    sorted_ids: Vec<String>,
}

pub struct Bm25Searcher {
    config: Bm25Config,
    engine: RwLock<Option<Arc<Engine>>>,
    rebuilds: AtomicU64,
}

impl Bm25Searcher {
    pub fn new(config: Bm25Config) -> Self {
        Bm25Searcher { config, engine: RwLock::new(None), rebuilds: AtomicU64::new(0) }
    }

    /// Number of engine rebuilds so far (test instrumentation for the
    /// fingerprint-cache contract).
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }

    fn ensure_engine(&self, docs: &[SearchDoc]) -> Result<Arc<Engine>> {
        let fingerprint = compute_fingerprint(docs);

        {
            let cached = self.engine.read();
            if let Some(engine) = cached.as_ref() {
                if engine.fingerprint == fingerprint {
                    return Ok(Arc::clone(engine));
                }
            }
        }

        let mut cached = self.engine.write();
        // Another writer may have built it while we waited.
        if let Some(engine) = cached.as_ref() {
            if engine.fingerprint == fingerprint {
                return Ok(Arc::clone(engine));
            }
        }

        let engine = Arc::new(self.build_engine(fingerprint, docs)?);
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        debug!(docs = docs.len(), rebuilds = self.rebuilds(), "rebuilt bm25 engine");
        *cached = Some(Arc::clone(&engine));
        Ok(engine)
    }

    fn build_engine(&self, fingerprint: String, docs: &[SearchDoc]) -> Result<Engine> {
        let mut schema_builder = Schema::builder();
        let id = schema_builder.add_text_field("id", STRING | STORED);
        let name = schema_builder.add_text_field("name", TEXT);
        let namespace = schema_builder.add_text_field("namespace", TEXT);
        let tags = schema_builder.add_text_field("tags", TEXT);
        let doc_text = schema_builder.add_text_field("doc_text", TEXT);
        let schema = schema_builder.build();

        let index = TantivyIndex::create_in_ram(schema);
        let mut writer = index
            .writer(15_000_000)
            .map_err(|e| search_error("failed to create index writer", e))?;

        let capped: &[SearchDoc] = match self.config.max_docs {
            Some(max) if docs.len() > max => &docs[..max],
            _ => docs,
        };

        let mut summaries = FxHashMap::default();
        let mut sorted_ids = Vec::with_capacity(capped.len());

        for sd in capped {
            let text = match self.config.max_doc_text_len {
                Some(max) => crate::index::summary::truncate_chars(&sd.doc_text, max),
                None => sd.doc_text.clone(),
            };
            writer
                .add_document(doc!(
                    id => sd.id.clone(),
                    name => sd.summary.name.clone(),
                    namespace => sd.summary.namespace.clone(),
                    tags => sd.summary.tags.join(" "),
                    doc_text => text
                ))
                .map_err(|e| search_error("failed to index document", e))?;
            summaries.insert(sd.id.clone(), sd.summary.clone());
            sorted_ids.push(sd.id.clone());
        }

        writer.commit().map_err(|e| search_error("failed to commit index", e))?;
        sorted_ids.sort();

        Ok(Engine {
            fingerprint,
            index,
            fields: Fields { id, name, namespace, tags, doc_text },
            summaries,
            sorted_ids,
        })
    }

    fn run_query(&self, engine: &Engine, query: &str, limit: usize) -> Result<Vec<Summary>> {
        let sanitized = sanitize_query(query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }

        let reader = engine.index.reader().map_err(|e| search_error("failed to open reader", e))?;
        let searcher = reader.searcher();

        let mut parser = QueryParser::for_index(
            &engine.index,
            vec![
                engine.fields.name,
                engine.fields.namespace,
                engine.fields.tags,
                engine.fields.doc_text,
            ],
        );
        parser.set_field_boost(engine.fields.name, self.config.name_boost);
        parser.set_field_boost(engine.fields.namespace, self.config.namespace_boost);
        parser.set_field_boost(engine.fields.tags, self.config.tags_boost);

        let parsed = parser
            .parse_query(&sanitized)
            .map_err(|e| search_error("failed to parse query", e))?;

        let fetch = engine.sorted_ids.len().max(1);
        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(fetch))
            .map_err(|e| search_error("search failed", e))?;

        let mut scored: Vec<(f32, String)> = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: Document =
                searcher.doc(address).map_err(|e| search_error("failed to load doc", e))?;
            let id = doc
                .get_first(engine.fields.id)
                .and_then(|v| v.as_text())
                .ok_or_else(|| DiscoveryError::internal("indexed doc missing id field"))?
                .to_string();
            scored.push((score, id));
        }

        // Tantivy already orders by score; re-sort to pin the id tiebreaker.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.1.cmp(&b.1))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .filter_map(|(_, id)| engine.summaries.get(&id).cloned())
            .collect())
    }
}

#[async_trait]
impl Searcher for Bm25Searcher {
    async fn search(&self, query: &str, limit: usize, docs: &[SearchDoc]) -> Result<Vec<Summary>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let engine = self.ensure_engine(docs)?;

        if query.is_empty() {
            return Ok(engine
                .sorted_ids
                .iter()
                .take(limit)
                .filter_map(|id| engine.summaries.get(id).cloned())
                .collect());
        }

        self.run_query(&engine, query, limit)
    }

    fn deterministic(&self) -> bool {
        true
    }
}

/// Strip query-parser syntax; tokens only. A query that sanitizes to nothing
/// matches nothing.
fn sanitize_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn search_error(context: &str, err: impl std::error::Error + Send + Sync + 'static) -> DiscoveryError {
    DiscoveryError::Search { message: context.to_string(), source: Some(Box::new(err)) }
}
