// Scoring searchers used by the discovery facade: hybrid (BM25 + embedding
// cosine, weighted by alpha), embedding-only, and lexical-only. All three
// implement the plain `Searcher` contract plus `ScoringSearcher`, which
// additionally surfaces scores and provenance.

use std::sync::Arc;

use async_trait::async_trait;

use crate::discovery::result::{Results, ScoreType, ScoredResult};
use crate::error::{DiscoveryError, Result};
use crate::index::{SearchDoc, Searcher, Summary};
use crate::semantic::{
    documents_from_search_docs, Bm25Scorer, Bm25Strategy, Document, Embedder, Strategy,
};
use crate::utils::math::cosine_similarity;

/// A searcher that can also report scores with provenance.
#[async_trait]
pub trait ScoringSearcher: Searcher {
    async fn search_with_scores(
        &self,
        query: &str,
        limit: usize,
        docs: &[SearchDoc],
    ) -> Result<Results>;

    fn score_type(&self) -> ScoreType;
}

/// Options for `HybridSearcher`.
pub struct HybridOptions {
    /// Optional custom lexical scorer; token overlap by default.
    pub bm25_scorer: Option<Arc<dyn Bm25Scorer>>,
    /// Embedding provider. Required.
    pub embedder: Option<Arc<dyn Embedder>>,
    /// BM25 weight in [0, 1]; the embedding weight is `1 - alpha`.
    pub alpha: f64,
}

/// Weighted combination of lexical and embedding scores.
pub struct HybridSearcher {
    bm25: Bm25Strategy,
    embedder: Arc<dyn Embedder>,
    alpha: f64,
}

impl std::fmt::Debug for HybridSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridSearcher")
            .field("alpha", &self.alpha)
            .finish_non_exhaustive()
    }
}

impl HybridSearcher {
    pub fn new(options: HybridOptions) -> Result<Self> {
        let embedder = options.embedder.ok_or(DiscoveryError::InvalidEmbedder)?;
        if !(0.0..=1.0).contains(&options.alpha) {
            return Err(DiscoveryError::InvalidHybridConfig {
                message: format!("alpha {} outside [0, 1]", options.alpha),
            });
        }
        Ok(HybridSearcher {
            bm25: Bm25Strategy::new(options.bm25_scorer),
            embedder,
            alpha: options.alpha,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    async fn score_docs(&self, query: &str, docs: &[Document]) -> Result<Vec<f64>> {
        // The query is embedded exactly once per search.
        let query_vec = self.embedder.embed(query).await?;

        let mut scores = Vec::with_capacity(docs.len());
        for doc in docs {
            let bm25_score = self.bm25.score(query, doc).await?;
            let doc_vec = self.embedder.embed(&doc.text).await?;
            let embedding_score = cosine_similarity(&query_vec, &doc_vec) as f64;
            scores.push(self.alpha * bm25_score + (1.0 - self.alpha) * embedding_score);
        }
        Ok(scores)
    }
}

#[async_trait]
impl Searcher for HybridSearcher {
    async fn search(&self, query: &str, limit: usize, docs: &[SearchDoc]) -> Result<Vec<Summary>> {
        Ok(self.search_with_scores(query, limit, docs).await?.summaries())
    }

    fn deterministic(&self) -> bool {
        self.embedder.deterministic()
    }
}

#[async_trait]
impl ScoringSearcher for HybridSearcher {
    async fn search_with_scores(
        &self,
        query: &str,
        limit: usize,
        docs: &[SearchDoc],
    ) -> Result<Results> {
        if limit == 0 {
            return Ok(Results::default());
        }
        if query.is_empty() {
            return Ok(first_by_id(docs, limit, self.score_type()));
        }

        let normalized: Vec<Document> = documents_from_search_docs(docs)
            .into_iter()
            .map(|d| d.normalized())
            .collect();
        let scores = self.score_docs(query, &normalized).await?;
        Ok(rank(docs, &scores, limit, self.score_type()))
    }

    fn score_type(&self) -> ScoreType {
        ScoreType::Hybrid
    }
}

/// Embedding-only scoring searcher: cosine similarity against the query
/// embedding, computed once per search.
pub struct EmbeddingSearcher {
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingSearcher {
    pub fn new(embedder: Option<Arc<dyn Embedder>>) -> Result<Self> {
        Ok(EmbeddingSearcher { embedder: embedder.ok_or(DiscoveryError::InvalidEmbedder)? })
    }
}

#[async_trait]
impl Searcher for EmbeddingSearcher {
    async fn search(&self, query: &str, limit: usize, docs: &[SearchDoc]) -> Result<Vec<Summary>> {
        Ok(self.search_with_scores(query, limit, docs).await?.summaries())
    }

    fn deterministic(&self) -> bool {
        self.embedder.deterministic()
    }
}

#[async_trait]
impl ScoringSearcher for EmbeddingSearcher {
    async fn search_with_scores(
        &self,
        query: &str,
        limit: usize,
        docs: &[SearchDoc],
    ) -> Result<Results> {
        if limit == 0 {
            return Ok(Results::default());
        }
        if query.is_empty() {
            return Ok(first_by_id(docs, limit, self.score_type()));
        }

        let query_vec = self.embedder.embed(query).await?;
        let normalized: Vec<Document> = documents_from_search_docs(docs)
            .into_iter()
            .map(|d| d.normalized())
            .collect();

        let mut scores = Vec::with_capacity(docs.len());
        for doc in &normalized {
            let doc_vec = self.embedder.embed(&doc.text).await?;
            scores.push(cosine_similarity(&query_vec, &doc_vec) as f64);
        }
        Ok(rank(docs, &scores, limit, self.score_type()))
    }

    fn score_type(&self) -> ScoreType {
        ScoreType::Embedding
    }
}

/// Lexical-only scoring searcher over the token-overlap strategy. Useful
/// when scores and provenance are wanted without an embedder.
pub struct Bm25OnlySearcher {
    strategy: Bm25Strategy,
}

impl Bm25OnlySearcher {
    pub fn new(scorer: Option<Arc<dyn Bm25Scorer>>) -> Self {
        Bm25OnlySearcher { strategy: Bm25Strategy::new(scorer) }
    }
}

impl Default for Bm25OnlySearcher {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Searcher for Bm25OnlySearcher {
    async fn search(&self, query: &str, limit: usize, docs: &[SearchDoc]) -> Result<Vec<Summary>> {
        Ok(self.search_with_scores(query, limit, docs).await?.summaries())
    }

    fn deterministic(&self) -> bool {
        true
    }
}

#[async_trait]
impl ScoringSearcher for Bm25OnlySearcher {
    async fn search_with_scores(
        &self,
        query: &str,
        limit: usize,
        docs: &[SearchDoc],
    ) -> Result<Results> {
        if limit == 0 {
            return Ok(Results::default());
        }
        if query.is_empty() {
            return Ok(first_by_id(docs, limit, self.score_type()));
        }

        let normalized: Vec<Document> = documents_from_search_docs(docs)
            .into_iter()
            .map(|d| d.normalized())
            .collect();

        let mut scores = Vec::with_capacity(docs.len());
        for doc in &normalized {
            scores.push(self.strategy.score(query, doc).await?);
        }
        Ok(rank(docs, &scores, limit, self.score_type()))
    }

    fn score_type(&self) -> ScoreType {
        ScoreType::Bm25
    }
}

/// Order positive-scoring docs by score descending, id ascending, and take
/// the first `limit`.
fn rank(docs: &[SearchDoc], scores: &[f64], limit: usize, score_type: ScoreType) -> Results {
    let mut scored: Vec<(usize, f64)> = scores
        .iter()
        .enumerate()
        .filter(|(_, score)| **score > 0.0)
        .map(|(i, score)| (i, *score))
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| docs[a.0].id.cmp(&docs[b.0].id))
    });
    scored.truncate(limit);

    Results(
        scored
            .into_iter()
            .map(|(i, score)| ScoredResult {
                summary: docs[i].summary.clone(),
                score,
                score_type,
            })
            .collect(),
    )
}

fn first_by_id(docs: &[SearchDoc], limit: usize, score_type: ScoreType) -> Results {
    let mut sorted: Vec<&SearchDoc> = docs.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    Results(
        sorted
            .into_iter()
            .take(limit)
            .map(|d| ScoredResult { summary: d.summary.clone(), score: 0.0, score_type })
            .collect(),
    )
}
