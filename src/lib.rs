//! Retrieval-augmented generation core for design-system assistants.
//!
//! ```text
//! External records ──► ingestion transformers ──► (text, metadata) batches
//!   (styles, components,            │
//!    pages, files, slides)          ▼
//!                        EmbeddingStore ──► EmbeddingProvider (OpenAI API)
//!                                │
//!                                ▼
//!                        VectorBackend (sqlite-vec | in-memory)
//!                                │
//! User query ──► RetrievalManager┴─► ranked hits ──► context + citations
//!
//! Export request ──► resolver::resolve_asset over a design-node tree
//! ```
//!
//! The crate is the retrieval core only: HTTP serving, auth, response
//! streaming, and the design-tool/LLM API clients are external
//! collaborators that feed records in and consume ranked text, citations,
//! and resolved node ids.

pub mod cache;
pub mod config;
pub mod embeddings;
pub mod ingestion;
pub mod resolver;
pub mod retrieval;
pub mod service;
pub mod store;
pub mod types;

pub use cache::SnapshotCache;
pub use config::RagConfig;
pub use embeddings::{
    EmbeddingProvider, MockEmbeddingProvider, OpenAiEmbeddingConfig, OpenAiEmbeddingProvider,
};
pub use ingestion::{
    ComponentRecord, DesignTokens, FileRecord, Ingestor, PageRecord, PresentationRecord,
    SlideRecord, StyleToken, chunk_text, collect_text,
};
pub use resolver::{DesignNode, NodeKind, resolve_asset};
pub use retrieval::{RetrievalManager, assemble_context, format_citation};
pub use service::DesignRag;
pub use store::{
    EmbeddingStore, MemoryVectorBackend, MetadataFilter, SqliteVectorBackend, StoreStats,
    StoredDocument, VectorBackend, generate_id,
};
pub use types::{Citation, DocMetadata, RagError, RetrievalHit, RetrievalResult};
