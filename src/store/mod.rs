//! Vector storage: the backend trait, the embedding store that fronts it,
//! metadata filters, and deterministic document ids.
//!
//! ```text
//!                  ┌──────────────────────┐
//!                  │    EmbeddingStore    │
//!                  │ (embed + id + upsert)│
//!                  └──────────┬───────────┘
//!                             │ VectorBackend (async CRUD)
//!               ┌─────────────┴─────────────┐
//!               ▼                           ▼
//!        ┌─────────────┐            ┌──────────────┐
//!        │   SQLite    │            │  In-memory   │
//!        │ sqlite-vec  │            │ (tests, dev) │
//!        └─────────────┘            └──────────────┘
//! ```

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::types::{DocMetadata, RagError, RetrievalHit, RetrievalResult};

// Re-exports for convenience
pub use memory::MemoryVectorBackend;
pub use sqlite::SqliteVectorBackend;

/// How many leading characters of the document body feed the id hash.
const ID_TEXT_PREFIX_CHARS: usize = 200;

/// A document ready for (or read back from) persistent storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    pub metadata: DocMetadata,
    pub embedding: Vec<f32>,
}

/// Conjunctive equality predicate over serialized metadata fields.
///
/// Every clause must hold for a document to match; values compare against
/// the document's tagged-JSON metadata form (so `"type"` and `"source"` are
/// both filterable fields).
#[derive(Clone, Debug, Default)]
pub struct MetadataFilter {
    clauses: Vec<(String, serde_json::Value)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality clause.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    /// Shorthand for filtering on the provenance system.
    #[must_use]
    pub fn source(self, source: impl Into<String>) -> Self {
        self.eq("source", source.into())
    }

    /// Shorthand for filtering on the document category.
    #[must_use]
    pub fn doc_type(self, doc_type: impl Into<String>) -> Self {
        self.eq("type", doc_type.into())
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(String, serde_json::Value)] {
        &self.clauses
    }

    /// Evaluates the predicate against a serialized metadata object.
    pub fn matches(&self, metadata: &serde_json::Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| metadata.get(field) == Some(expected))
    }
}

/// Persistence layer for (id, text, vector, metadata) tuples.
///
/// Mutations are durable before the call returns; there is no async flush.
/// Inserting an existing id replaces the stored tuple (upsert semantics).
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Inserts or replaces a batch of documents.
    async fn insert(&self, documents: Vec<StoredDocument>) -> Result<(), RagError>;

    /// Returns up to `top_k` nearest neighbors by cosine distance, ascending,
    /// restricted to documents matching `filter` when present.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalHit>, RagError>;

    /// Destroys all stored documents.
    async fn clear(&self) -> Result<(), RagError>;

    /// Total number of stored documents.
    async fn count(&self) -> Result<usize, RagError>;
}

/// Collection statistics, for observability rather than correctness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_documents: usize,
}

/// Derives a stable document id from ingestion position, provenance
/// metadata, and a content prefix.
///
/// Pure function of its inputs: re-ingesting identical content produces the
/// same id (idempotent upsert), while the index and content prefix keep
/// unrelated records apart even when names collide.
pub fn generate_id(index: usize, metadata: &DocMetadata, content: &str) -> String {
    let slide_number = metadata.slide_number().map(|n| n.to_string());
    let prefix: String = content.chars().take(ID_TEXT_PREFIX_CHARS).collect();

    let fields = [
        Some(index.to_string()),
        Some(metadata.source().to_string()),
        Some(metadata.type_name().to_string()),
        metadata.file_key().map(str::to_string),
        metadata.presentation_id().map(str::to_string),
        Some(metadata.name().to_string()),
        slide_number,
        Some(prefix),
    ];
    let parts: Vec<&str> = fields
        .iter()
        .flatten()
        .map(String::as_str)
        .filter(|part| !part.is_empty())
        .collect();

    blake3::hash(parts.join("_").as_bytes()).to_hex().to_string()
}

/// Fronts a [`VectorBackend`] with an [`EmbeddingProvider`]: computes ids,
/// embeds document batches, and persists the resulting tuples.
#[derive(Clone)]
pub struct EmbeddingStore {
    provider: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn VectorBackend>,
}

impl EmbeddingStore {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, backend: Arc<dyn VectorBackend>) -> Self {
        Self { provider, backend }
    }

    /// Embeds a single text via the configured provider.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.provider.embed_one(text).await
    }

    /// Embeds a batch of texts, preserving input order.
    pub async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        self.provider.embed_many(texts).await
    }

    /// Embeds and persists a batch of (text, metadata) documents.
    ///
    /// When `ids` is omitted, deterministic ids are derived before embedding.
    /// The whole batch is embedded in one provider call; provider failures
    /// abort the upsert without touching the backend.
    pub async fn upsert(
        &self,
        documents: Vec<(String, DocMetadata)>,
        ids: Option<Vec<String>>,
    ) -> Result<(), RagError> {
        if documents.is_empty() {
            return Ok(());
        }

        let ids = match ids {
            Some(ids) if ids.len() != documents.len() => {
                return Err(RagError::Validation(format!(
                    "{} ids supplied for {} documents",
                    ids.len(),
                    documents.len()
                )));
            }
            Some(ids) => ids,
            None => documents
                .iter()
                .enumerate()
                .map(|(index, (content, metadata))| generate_id(index, metadata, content))
                .collect(),
        };

        let texts: Vec<String> = documents.iter().map(|(content, _)| content.clone()).collect();
        let embeddings = self.provider.embed_many(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(RagError::Provider(format!(
                "provider returned {} embeddings for {} documents",
                embeddings.len(),
                documents.len()
            )));
        }

        let records: Vec<StoredDocument> = documents
            .into_iter()
            .zip(ids)
            .zip(embeddings)
            .map(|(((content, metadata), id), embedding)| StoredDocument {
                id,
                content,
                metadata,
                embedding,
            })
            .collect();

        debug!(count = records.len(), "persisting document batch");
        self.backend.insert(records).await
    }

    /// Nearest-neighbor query over stored documents.
    pub async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<RetrievalResult, RagError> {
        let hits = self.backend.search(vector, top_k, filter).await?;
        Ok(RetrievalResult { hits })
    }

    /// Destroys all stored documents.
    pub async fn clear(&self) -> Result<(), RagError> {
        self.backend.clear().await
    }

    /// Current collection statistics.
    pub async fn stats(&self) -> Result<StoreStats, RagError> {
        Ok(StoreStats {
            total_documents: self.backend.count().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComponentMeta, SlideMeta, StyleMeta};

    fn style(name: &str) -> DocMetadata {
        DocMetadata::Color(StyleMeta {
            source: "figma".into(),
            name: name.into(),
            file_key: "file-1".into(),
            style_id: "s:1".into(),
            url: "https://www.figma.com/file/file-1".into(),
        })
    }

    #[test]
    fn id_generation_is_deterministic() {
        let meta = style("Primary/Blue");
        let a = generate_id(3, &meta, "Color Style: Primary/Blue\n");
        let b = generate_id(3, &meta, "Color Style: Primary/Blue\n");
        assert_eq!(a, b);
    }

    #[test]
    fn id_changes_with_index_metadata_and_content() {
        let meta = style("Primary/Blue");
        let base = generate_id(0, &meta, "body");
        assert_ne!(base, generate_id(1, &meta, "body"));
        assert_ne!(base, generate_id(0, &style("Primary/Red"), "body"));
        assert_ne!(base, generate_id(0, &meta, "different body"));
    }

    #[test]
    fn id_hashes_only_the_content_prefix() {
        let meta = style("Primary/Blue");
        let long_a = format!("{}{}", "x".repeat(200), "tail one");
        let long_b = format!("{}{}", "x".repeat(200), "tail two");
        assert_eq!(generate_id(0, &meta, &long_a), generate_id(0, &meta, &long_b));
    }

    #[test]
    fn slide_ids_include_presentation_and_slide_number() {
        let slide = |n: u32| {
            DocMetadata::Slide(SlideMeta {
                source: "google_slides".into(),
                presentation_name: "Q1 Review".into(),
                presentation_id: "pres-1".into(),
                slide_number: n,
                url: "https://docs.google.com".into(),
            })
        };
        assert_ne!(
            generate_id(0, &slide(1), "Slide body"),
            generate_id(0, &slide(2), "Slide body")
        );
    }

    #[test]
    fn filter_matches_serialized_metadata() {
        let meta = DocMetadata::Component(ComponentMeta {
            source: "figma".into(),
            name: "Button".into(),
            file_key: "file-1".into(),
            component_id: "1:2".into(),
            url: "https://www.figma.com/file/file-1?node-id=1:2".into(),
        });
        let value = serde_json::to_value(&meta).unwrap();

        assert!(MetadataFilter::new().source("figma").matches(&value));
        assert!(MetadataFilter::new()
            .source("figma")
            .doc_type("component")
            .matches(&value));
        assert!(!MetadataFilter::new().doc_type("color").matches(&value));
        assert!(!MetadataFilter::new()
            .eq("name", "Card")
            .matches(&value));
    }
}
