// Standalone document index and strategy-driven searcher, for callers that
// want semantic ranking without the full tool registry. Unlike the registry
// searchers, this one returns every indexed document ranked, zero scores
// included, so callers can apply their own thresholds.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{DiscoveryError, Result};
use crate::semantic::document::Document;
use crate::semantic::strategy::Strategy;

/// Stores documents for semantic search.
pub trait Indexer: Send + Sync {
    /// Add or replace a document. Empty ids are rejected.
    fn add(&self, doc: Document) -> Result<()>;
    fn get(&self, id: &str) -> Option<Document>;
    /// All documents, sorted by id.
    fn list(&self) -> Vec<Document>;
    /// Remove a document; reports whether it existed.
    fn remove(&self, id: &str) -> bool;
}

#[derive(Default)]
pub struct InMemoryDocumentIndex {
    docs: RwLock<FxHashMap<String, Document>>,
}

impl InMemoryDocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

impl Indexer for InMemoryDocumentIndex {
    fn add(&self, doc: Document) -> Result<()> {
        if doc.id.is_empty() {
            return Err(DiscoveryError::invalid_request("document id is required"));
        }
        // Normalize on ingest so every strategy sees the same text.
        let normalized = doc.normalized();
        self.docs.write().insert(normalized.id.clone(), normalized);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<Document> {
        self.docs.read().get(id).cloned()
    }

    fn list(&self) -> Vec<Document> {
        let mut docs: Vec<Document> = self.docs.read().values().cloned().collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }

    fn remove(&self, id: &str) -> bool {
        self.docs.write().remove(id).is_some()
    }
}

/// A ranked document.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f64,
}

/// Searches an `Indexer` with a scoring strategy.
pub struct SemanticSearcher {
    index: Arc<dyn Indexer>,
    strategy: Arc<dyn Strategy>,
}

impl SemanticSearcher {
    pub fn new(index: Arc<dyn Indexer>, strategy: Arc<dyn Strategy>) -> Self {
        SemanticSearcher { index, strategy }
    }

    /// Score every indexed document against the query. Results are ordered
    /// by score descending with id ascending as the tiebreaker.
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredDocument>> {
        let docs = self.index.list();
        let mut scored = Vec::with_capacity(docs.len());
        for doc in docs {
            let score = self.strategy.score(query, &doc).await?;
            scored.push(ScoredDocument { document: doc, score });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        Ok(scored)
    }

    /// As `search`, but keep only the top `limit` results.
    pub async fn search_top(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>> {
        let mut results = self.search(query).await?;
        results.truncate(limit);
        Ok(results)
    }
}
