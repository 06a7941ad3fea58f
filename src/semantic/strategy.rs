// Scoring strategies: lexical token overlap, embedding cosine, and the
// weighted hybrid of the two. A strategy scores one document against one
// query; searchers loop strategies over a corpus.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DiscoveryError, Result};
use crate::semantic::document::Document;
use crate::utils::math::cosine_similarity;

/// Produces a vector embedding for a piece of text. Implementations are
/// expected to be safe for concurrent calls.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Whether identical input always yields the identical vector. Embedding
    /// models usually are; override for sampling-based providers.
    fn deterministic(&self) -> bool {
        true
    }
}

/// Scores one document against one query.
#[async_trait]
pub trait Strategy: Send + Sync {
    async fn score(&self, query: &str, doc: &Document) -> Result<f64>;
}

/// Synchronous lexical scorer pluggable into `Bm25Strategy`.
pub trait Bm25Scorer: Send + Sync {
    fn score(&self, query: &str, doc: &Document) -> f64;
}

/// Default lexical scorer: one point per query token present in the document
/// text. No corpus statistics, no external dependencies.
#[derive(Debug, Default)]
pub struct TokenOverlapScorer;

impl Bm25Scorer for TokenOverlapScorer {
    fn score(&self, query: &str, doc: &Document) -> f64 {
        if query.is_empty() {
            return 0.0;
        }
        let text = doc_text(doc).to_lowercase();
        let tokens: std::collections::HashSet<&str> = text.split_whitespace().collect();

        query
            .to_lowercase()
            .split_whitespace()
            .filter(|token| tokens.contains(token))
            .count() as f64
    }
}

/// Lexical strategy wrapping a `Bm25Scorer` (the default token-overlap
/// scorer unless one is supplied).
pub struct Bm25Strategy {
    scorer: Arc<dyn Bm25Scorer>,
}

impl std::fmt::Debug for Bm25Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bm25Strategy").finish_non_exhaustive()
    }
}

impl Bm25Strategy {
    pub fn new(scorer: Option<Arc<dyn Bm25Scorer>>) -> Self {
        Bm25Strategy { scorer: scorer.unwrap_or_else(|| Arc::new(TokenOverlapScorer)) }
    }
}

#[async_trait]
impl Strategy for Bm25Strategy {
    async fn score(&self, query: &str, doc: &Document) -> Result<f64> {
        Ok(self.scorer.score(query, doc))
    }
}

/// Embedding strategy: cosine similarity between the query and document
/// embeddings. Degenerate vectors (empty, zero-norm, unequal length) score 0.
pub struct EmbeddingStrategy {
    embedder: Option<Arc<dyn Embedder>>,
}

impl EmbeddingStrategy {
    pub fn new(embedder: Option<Arc<dyn Embedder>>) -> Self {
        EmbeddingStrategy { embedder }
    }
}

#[async_trait]
impl Strategy for EmbeddingStrategy {
    async fn score(&self, query: &str, doc: &Document) -> Result<f64> {
        let embedder = self.embedder.as_ref().ok_or(DiscoveryError::InvalidEmbedder)?;

        let query_vec = embedder.embed(query).await?;
        let doc_vec = embedder.embed(&doc_text(doc)).await?;
        Ok(cosine_similarity(&query_vec, &doc_vec) as f64)
    }
}

/// Weighted combination: `alpha * bm25 + (1 - alpha) * embedding`.
pub struct HybridStrategy {
    bm25: Arc<dyn Strategy>,
    embedding: Arc<dyn Strategy>,
    alpha: f64,
}

impl std::fmt::Debug for HybridStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridStrategy")
            .field("alpha", &self.alpha)
            .finish_non_exhaustive()
    }
}

impl HybridStrategy {
    pub fn new(
        bm25: Arc<dyn Strategy>,
        embedding: Arc<dyn Strategy>,
        alpha: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(DiscoveryError::InvalidHybridConfig {
                message: format!("alpha {alpha} outside [0, 1]"),
            });
        }
        Ok(HybridStrategy { bm25, embedding, alpha })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

#[async_trait]
impl Strategy for HybridStrategy {
    async fn score(&self, query: &str, doc: &Document) -> Result<f64> {
        let bm25 = self.bm25.score(query, doc).await?;
        let embedding = self.embedding.score(query, doc).await?;
        Ok(self.alpha * bm25 + (1.0 - self.alpha) * embedding)
    }
}

/// The text a strategy scores: the prebuilt blob when present, otherwise the
/// normalized rebuild.
fn doc_text(doc: &Document) -> std::borrow::Cow<'_, str> {
    if doc.text.is_empty() {
        std::borrow::Cow::Owned(doc.normalized().text)
    } else {
        std::borrow::Cow::Borrowed(doc.text.as_str())
    }
}
