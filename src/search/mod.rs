// Full-text search layer: the production BM25 searcher and its doc-set
// fingerprint cache.

pub mod bm25;
pub mod fingerprint;

pub use bm25::{Bm25Config, Bm25Searcher};
pub use fingerprint::compute_fingerprint;
