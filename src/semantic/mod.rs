// Semantic scoring: pluggable strategies (lexical overlap, embedding cosine,
// weighted hybrid) over a flat document model, with adapters to and from the
// index's search docs. No vector backend is mandated; callers bring their
// own `Embedder`.

pub mod adapter;
pub mod document;
pub mod indexer;
pub mod strategy;

pub use adapter::{
    document_from_search_doc, documents_from_search_docs, search_doc_from_document,
    search_docs_from_documents,
};
pub use document::{filter_by_namespace, filter_by_tags, Document};
pub use indexer::{Indexer, InMemoryDocumentIndex, ScoredDocument, SemanticSearcher};
pub use strategy::{
    Bm25Scorer, Bm25Strategy, Embedder, EmbeddingStrategy, HybridStrategy, Strategy,
    TokenOverlapScorer,
};
