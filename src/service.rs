//! The assembled retrieval service: one explicit context object built at
//! process start and passed to request handlers, instead of process-wide
//! singletons. Fresh instances per test are cheap.

use std::sync::Arc;

use crate::config::RagConfig;
use crate::embeddings::EmbeddingProvider;
use crate::ingestion::{
    ComponentRecord, DesignTokens, FileRecord, Ingestor, PageRecord, PresentationRecord,
};
use crate::resolver::{self, DesignNode};
use crate::retrieval::RetrievalManager;
use crate::store::{EmbeddingStore, MetadataFilter, StoreStats, VectorBackend};
use crate::types::{Citation, RagError, RetrievalResult};

/// Everything a request handler needs: ingestion, retrieval, and asset
/// resolution over one shared store.
#[derive(Clone)]
pub struct DesignRag {
    store: EmbeddingStore,
    retrieval: RetrievalManager,
    ingestor: Ingestor,
    config: RagConfig,
}

impl DesignRag {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn VectorBackend>,
        config: RagConfig,
    ) -> Self {
        let store = EmbeddingStore::new(provider, backend);
        let retrieval = RetrievalManager::new(store.clone(), config.clone());
        let ingestor = Ingestor::new(store.clone(), config.chunk_size, config.batch_size);
        Self {
            store,
            retrieval,
            ingestor,
            config,
        }
    }

    // --- ingestion -------------------------------------------------------

    pub async fn ingest_styles(&self, tokens: &DesignTokens) -> Result<(), RagError> {
        self.ingestor.ingest_styles(tokens).await
    }

    pub async fn ingest_components(&self, components: &[ComponentRecord]) -> Result<(), RagError> {
        self.ingestor.ingest_components(components).await
    }

    pub async fn ingest_pages(&self, pages: &[PageRecord]) -> Result<(), RagError> {
        self.ingestor.ingest_pages(pages).await
    }

    pub async fn ingest_file_index(&self, files: &[FileRecord]) -> Result<(), RagError> {
        self.ingestor.ingest_file_index(files).await
    }

    pub async fn ingest_slides(&self, presentation: &PresentationRecord) -> Result<(), RagError> {
        self.ingestor.ingest_slides(presentation).await
    }

    // --- retrieval -------------------------------------------------------

    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        filter: Option<&MetadataFilter>,
    ) -> Result<RetrievalResult, RagError> {
        self.retrieval.search(query, top_k, filter).await
    }

    pub async fn search_by_source(
        &self,
        query: &str,
        source: &str,
        top_k: Option<usize>,
    ) -> Result<RetrievalResult, RagError> {
        self.retrieval.search_by_source(query, source, top_k).await
    }

    pub async fn search_by_type(
        &self,
        query: &str,
        doc_type: &str,
        top_k: Option<usize>,
    ) -> Result<RetrievalResult, RagError> {
        self.retrieval.search_by_type(query, doc_type, top_k).await
    }

    pub async fn search_examples(
        &self,
        example_type: &str,
        top_k: usize,
    ) -> Result<RetrievalResult, RagError> {
        self.retrieval.search_examples(example_type, top_k).await
    }

    /// Builds the LLM context; the configured budget applies when
    /// `max_context_length` is omitted.
    pub async fn build_context(
        &self,
        query: &str,
        max_context_length: Option<usize>,
    ) -> Result<String, RagError> {
        let budget = max_context_length.unwrap_or(self.config.max_context_length);
        self.retrieval.build_context(query, budget).await
    }

    pub async fn get_sources(&self, query: &str) -> Result<Vec<Citation>, RagError> {
        self.retrieval.get_sources(query).await
    }

    // --- asset resolution ------------------------------------------------

    /// Resolves the best-matching exportable node for a requested name.
    /// `None` is a normal outcome the caller must handle.
    pub fn resolve_asset<'a>(&self, tree: &'a DesignNode, name: &str) -> Option<&'a str> {
        resolver::resolve_asset(tree, name)
    }

    // --- store lifecycle -------------------------------------------------

    pub async fn stats(&self) -> Result<StoreStats, RagError> {
        self.store.stats().await
    }

    pub async fn clear(&self) -> Result<(), RagError> {
        self.store.clear().await
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }
}
