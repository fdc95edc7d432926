//! Retrieval over the embedding store: searches, example filtering,
//! context assembly under a length budget, and source citations.

use tracing::debug;

use crate::config::RagConfig;
use crate::store::{EmbeddingStore, MetadataFilter};
use crate::types::{Citation, DocMetadata, RagError, RetrievalHit, RetrievalResult};

/// Header preceding the first citation block in assembled context.
pub const CONTEXT_HEADER: &str = "Relevant information from the design system:\n";

/// Query-side facade over an [`EmbeddingStore`].
#[derive(Clone)]
pub struct RetrievalManager {
    store: EmbeddingStore,
    config: RagConfig,
}

impl RetrievalManager {
    pub fn new(store: EmbeddingStore, config: RagConfig) -> Self {
        Self { store, config }
    }

    /// Semantic search; `top_k` defaults to the configured value.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        filter: Option<&MetadataFilter>,
    ) -> Result<RetrievalResult, RagError> {
        let top_k = top_k.unwrap_or(self.config.top_k_results);
        let vector = self.store.embed_one(query).await?;
        let result = self.store.query(&vector, top_k, filter).await?;
        debug!(query, hits = result.len(), "search complete");
        Ok(result)
    }

    /// Search restricted to one provenance system (`figma`, `google_slides`).
    pub async fn search_by_source(
        &self,
        query: &str,
        source: &str,
        top_k: Option<usize>,
    ) -> Result<RetrievalResult, RagError> {
        let filter = MetadataFilter::new().source(source);
        self.search(query, top_k, Some(&filter)).await
    }

    /// Search restricted to one document category (`component`, `color`, ...).
    pub async fn search_by_type(
        &self,
        query: &str,
        doc_type: &str,
        top_k: Option<usize>,
    ) -> Result<RetrievalResult, RagError> {
        let filter = MetadataFilter::new().doc_type(doc_type);
        self.search(query, top_k, Some(&filter)).await
    }

    /// Finds approved design examples of the given type (`email`, `ad`).
    ///
    /// Runs a synthetic semantic query, over-fetches candidates, then
    /// post-filters on the example tags. Sparse tagging means this can
    /// return fewer than `top_k` hits; there is no second fetch round.
    pub async fn search_examples(
        &self,
        example_type: &str,
        top_k: usize,
    ) -> Result<RetrievalResult, RagError> {
        let query = format!("{example_type} design template example");
        let vector = self.store.embed_one(&query).await?;
        let overfetch = top_k.saturating_mul(self.config.example_overfetch_factor.max(1));
        let candidates = self.store.query(&vector, overfetch, None).await?;

        let hits: Vec<RetrievalHit> = candidates
            .hits
            .into_iter()
            .filter(|hit| {
                hit.metadata.is_example() && hit.metadata.example_type() == Some(example_type)
            })
            .take(top_k)
            .collect();
        debug!(example_type, hits = hits.len(), "example search complete");
        Ok(RetrievalResult { hits })
    }

    /// Builds the LLM context string for a query, bounded by
    /// `max_context_length` characters (plus the header).
    pub async fn build_context(
        &self,
        query: &str,
        max_context_length: usize,
    ) -> Result<String, RagError> {
        let results = self.search(query, None, None).await?;
        Ok(assemble_context(&results.hits, max_context_length))
    }

    /// Ranked source citations for a query.
    pub async fn get_sources(&self, query: &str) -> Result<Vec<Citation>, RagError> {
        let results = self.search(query, None, None).await?;
        Ok(results
            .hits
            .iter()
            .map(|hit| Citation {
                name: hit.metadata.name().to_string(),
                source: hit.metadata.source().to_string(),
                doc_type: hit.metadata.type_name().to_string(),
                url: hit.metadata.url().to_string(),
            })
            .collect())
    }
}

/// Greedily packs ranked hits into a context string.
///
/// Appends whole `"\n{citation}\n{text}\n"` blocks in order and stops at the
/// first block that would push the total past `max_context_length`
/// characters; blocks are never truncated mid-text. Deterministic and
/// order-preserving, not an optimal bin-pack.
pub fn assemble_context(hits: &[RetrievalHit], max_context_length: usize) -> String {
    let mut context = String::from(CONTEXT_HEADER);
    let mut current_length = CONTEXT_HEADER.chars().count();

    for hit in hits {
        let block = format!("\n{}\n{}\n", format_citation(&hit.metadata), hit.document);
        let block_length = block.chars().count();
        if current_length + block_length > max_context_length {
            break;
        }
        context.push_str(&block);
        current_length += block_length;
    }

    context
}

/// Renders a metadata record as a readable source citation.
///
/// Pure function of the metadata: Figma documents cite their type and name,
/// slides cite presentation and slide number, anything else falls back to
/// `[source: name]`.
pub fn format_citation(metadata: &DocMetadata) -> String {
    match metadata {
        DocMetadata::Slide(slide) if slide.source == "google_slides" => format!(
            "[Google Slides - {}, Slide {}]",
            slide.presentation_name, slide.slide_number
        ),
        other if other.source() == "figma" => format!(
            "[Figma {}: {}]",
            title_case(other.type_name()),
            other.name()
        ),
        other => format!("[{}: {}]", other.source(), other.name()),
    }
}

/// Capitalizes the first letter of every alphabetic run, lowercasing the
/// rest (`page_content` becomes `Page_Content`).
fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut prev_alpha = false;
    for c in input.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                output.extend(c.to_lowercase());
            } else {
                output.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            output.push(c);
            prev_alpha = false;
        }
    }
    output
}
