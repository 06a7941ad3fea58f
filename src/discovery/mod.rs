// Discovery facade: one entry point composing the index, a search strategy,
// the documentation store and the provider registry. Results carry score
// provenance so consumers can tell how a ranking was produced.

use std::sync::Arc;

use crate::error::Result;
use crate::index::{
    ChangeListener, Index, IndexOptions, InMemoryIndex, ListenerId, SearchDoc, Searcher, Summary,
    ToolRegistration,
};
use crate::provider::{InMemoryProviderStore, ProviderInfo, ProviderStore};
use crate::search::{Bm25Config, Bm25Searcher};
use crate::semantic::Embedder;
use crate::tooldoc::{
    DetailLevel, DocEntry, DocStore, InMemoryDocStore, StoreOptions, ToolDoc, ToolExample,
    ToolResolver,
};
use crate::model::{Tool, ToolBackend};

pub mod hybrid;
pub mod result;

pub use hybrid::{Bm25OnlySearcher, EmbeddingSearcher, HybridOptions, HybridSearcher, ScoringSearcher};
pub use result::{Results, ScoreType, ScoredResult};

/// Options for building a `Discovery` facade. Everything has a sensible
/// default; supplying an embedder switches search to the hybrid strategy.
#[derive(Default)]
pub struct DiscoveryOptions {
    /// Tool registry. A fresh `InMemoryIndex` when absent.
    pub index: Option<Arc<InMemoryIndex>>,
    /// Search implementation. Ignored when `embedder` is set (hybrid wins).
    pub searcher: Option<Arc<dyn Searcher>>,
    /// Provider registry. A fresh in-memory store when absent.
    pub provider_store: Option<Arc<dyn ProviderStore>>,
    /// Enables hybrid search when provided.
    pub embedder: Option<Arc<dyn Embedder>>,
    /// BM25 weight for hybrid search; 0.0 means the 0.5 default.
    pub hybrid_alpha: f64,
    /// BM25 configuration, used when neither searcher nor embedder is set.
    pub bm25: Bm25Config,
    /// Default cap on returned examples (0 means 10).
    pub max_examples: usize,
}

pub struct Discovery {
    index: Arc<InMemoryIndex>,
    docs: Arc<InMemoryDocStore>,
    providers: Arc<dyn ProviderStore>,
    composite: Option<Arc<dyn ScoringSearcher>>,
    score_type: ScoreType,
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("score_type", &self.score_type)
            .finish_non_exhaustive()
    }
}

impl Discovery {
    pub fn new(options: DiscoveryOptions) -> Result<Self> {
        let (searcher, composite, score_type): (
            Arc<dyn Searcher>,
            Option<Arc<dyn ScoringSearcher>>,
            ScoreType,
        ) = if let Some(embedder) = options.embedder {
            let alpha = if options.hybrid_alpha == 0.0 { 0.5 } else { options.hybrid_alpha };
            let hybrid = Arc::new(HybridSearcher::new(HybridOptions {
                bm25_scorer: None,
                embedder: Some(embedder),
                alpha,
            })?);
            (hybrid.clone(), Some(hybrid as Arc<dyn ScoringSearcher>), ScoreType::Hybrid)
        } else if let Some(searcher) = options.searcher {
            (searcher, None, ScoreType::Bm25)
        } else {
            let bm25 = Arc::new(Bm25Searcher::new(options.bm25));
            (bm25, None, ScoreType::Bm25)
        };

        let index = options.index.unwrap_or_else(|| {
            Arc::new(InMemoryIndex::new(IndexOptions {
                searcher: Some(searcher),
                ..IndexOptions::default()
            }))
        });

        let docs = Arc::new(InMemoryDocStore::new(StoreOptions {
            resolver: Some(index.clone() as Arc<dyn ToolResolver>),
            max_examples: options.max_examples,
        }));

        let providers = options
            .provider_store
            .unwrap_or_else(|| Arc::new(InMemoryProviderStore::new()) as Arc<dyn ProviderStore>);

        Ok(Discovery { index, docs, providers, composite, score_type })
    }

    /// Register a tool with its backend and optional documentation. A doc
    /// entry that fails validation aborts the call before the index is
    /// touched.
    pub fn register_tool(
        &self,
        tool: Tool,
        backend: ToolBackend,
        doc: Option<DocEntry>,
    ) -> Result<()> {
        let validated = match doc {
            Some(entry) => Some(entry.validate_and_truncate()?),
            None => None,
        };

        let tool_id = tool.tool_id();
        self.index.register_tool(tool, backend)?;

        if let Some(entry) = validated {
            self.docs.register_doc(&tool_id, entry)?;
        }
        Ok(())
    }

    pub fn register_tools(&self, batch: Vec<ToolRegistration>) -> Result<()> {
        self.index.register_tools(batch)
    }

    pub fn register_doc(&self, tool_id: &str, entry: DocEntry) -> Result<()> {
        self.docs.register_doc(tool_id, entry)
    }

    pub fn register_examples(&self, tool_id: &str, examples: Vec<ToolExample>) -> Result<()> {
        self.docs.register_examples(tool_id, examples)
    }

    /// Search with the configured strategy. Scored results when a composite
    /// strategy is active; otherwise summaries tagged with score 0.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Results> {
        if let Some(composite) = &self.composite {
            let docs = self.search_docs().await?;
            return composite.search_with_scores(query, limit, &docs).await;
        }

        let summaries = self.index.search(query, limit).await?;
        Ok(self.tag_summaries(summaries))
    }

    /// Paginated search through the index's cursor discipline.
    pub async fn search_page(
        &self,
        query: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<(Results, Option<String>)> {
        let (summaries, next) = self.index.search_page(query, limit, cursor).await?;
        Ok((self.tag_summaries(summaries), next))
    }

    pub fn get_tool(&self, id: &str) -> Result<(Tool, ToolBackend)> {
        self.index.get_tool(id)
    }

    pub fn get_all_backends(&self, id: &str) -> Result<Vec<ToolBackend>> {
        self.index.get_all_backends(id)
    }

    pub fn describe_tool(&self, id: &str, level: DetailLevel) -> Result<ToolDoc> {
        self.docs.describe_tool(id, level)
    }

    pub fn list_examples(&self, id: &str, max: usize) -> Result<Vec<ToolExample>> {
        self.docs.list_examples(id, max)
    }

    pub fn list_namespaces(&self) -> Result<Vec<String>> {
        self.index.list_namespaces()
    }

    pub fn register_provider(&self, id: &str, provider: ProviderInfo) -> Result<String> {
        self.providers.register_provider(id, provider)
    }

    pub fn describe_provider(&self, id: &str) -> Result<ProviderInfo> {
        self.providers.describe_provider(id)
    }

    pub fn list_providers(&self) -> Result<Vec<ProviderInfo>> {
        self.providers.list_providers()
    }

    pub fn on_change(&self, listener: ChangeListener) -> ListenerId {
        self.index.on_change(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.index.unsubscribe(id)
    }

    pub fn refresh(&self) -> u64 {
        self.index.refresh()
    }

    /// The underlying index, for advanced operations.
    pub fn index(&self) -> &Arc<InMemoryIndex> {
        &self.index
    }

    /// The underlying documentation store.
    pub fn doc_store(&self) -> &Arc<InMemoryDocStore> {
        &self.docs
    }

    /// The underlying provider store.
    pub fn provider_store(&self) -> &Arc<dyn ProviderStore> {
        &self.providers
    }

    fn tag_summaries(&self, summaries: Vec<Summary>) -> Results {
        Results(
            summaries
                .into_iter()
                .map(|summary| ScoredResult { summary, score: 0.0, score_type: self.score_type })
                .collect(),
        )
    }

    /// Current search docs for composite scoring, rebuilt from summaries.
    async fn search_docs(&self) -> Result<Vec<SearchDoc>> {
        let summaries = self.index.search("", usize::MAX).await?;
        Ok(summaries
            .into_iter()
            .map(|summary| SearchDoc {
                id: summary.id.clone(),
                doc_text: String::new(),
                summary,
            })
            .collect())
    }
}
