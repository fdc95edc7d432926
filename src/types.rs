//! Shared types: the error taxonomy, document metadata, and retrieval results.

use serde::{Deserialize, Serialize};

/// Errors surfaced by the retrieval core.
///
/// "Not found" outcomes (asset resolution, empty searches) are modeled as
/// `Option`/empty results, not as errors: they are normal control flow the
/// caller is expected to handle.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// The embedding provider call failed. Propagated as-is, never retried.
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// The vector persistence layer failed. Aborts the whole operation;
    /// partial-batch state would be worse than failing clearly.
    #[error("storage error: {0}")]
    Storage(String),

    /// A single input record was malformed. Ingestion skips the record and
    /// continues with the remainder of the batch.
    #[error("invalid record: {0}")]
    Validation(String),

    /// Metadata could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Provenance metadata attached to every stored document.
///
/// One variant per ingestion path, internally tagged on `"type"` so the
/// serialized form is the flat object shape the vector backend filters over
/// (`{"type": "component", "source": "figma", ...}`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocMetadata {
    Color(StyleMeta),
    Typography(StyleMeta),
    Effect(StyleMeta),
    Component(ComponentMeta),
    PageContent(PageMeta),
    FileMetadata(FileMeta),
    Slide(SlideMeta),
}

/// Metadata for a color/typography/effect style token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StyleMeta {
    pub source: String,
    pub name: String,
    pub file_key: String,
    pub style_id: String,
    pub url: String,
}

/// Metadata for a published component, including its deep link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentMeta {
    pub source: String,
    pub name: String,
    pub file_key: String,
    pub component_id: String,
    pub url: String,
}

/// Metadata for (possibly chunked) page text content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    pub source: String,
    /// Page name, suffixed with `(Part i)` when the page was chunked.
    pub name: String,
    pub file_key: String,
    pub file_name: String,
    pub url: String,
    pub is_example: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_type: Option<String>,
    pub content_category: String,
}

/// Metadata summarizing a design file for full-text-free searchability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub source: String,
    pub name: String,
    pub file_key: String,
    pub project: String,
    pub url: String,
    pub last_modified: String,
}

/// Metadata for one presentation slide.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlideMeta {
    pub source: String,
    pub presentation_name: String,
    pub presentation_id: String,
    pub slide_number: u32,
    pub url: String,
}

impl DocMetadata {
    /// Category tag, matching the serialized `"type"` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            DocMetadata::Color(_) => "color",
            DocMetadata::Typography(_) => "typography",
            DocMetadata::Effect(_) => "effect",
            DocMetadata::Component(_) => "component",
            DocMetadata::PageContent(_) => "page_content",
            DocMetadata::FileMetadata(_) => "file_metadata",
            DocMetadata::Slide(_) => "slide",
        }
    }

    /// Provenance system this document came from (e.g. `figma`).
    pub fn source(&self) -> &str {
        match self {
            DocMetadata::Color(m) | DocMetadata::Typography(m) | DocMetadata::Effect(m) => {
                &m.source
            }
            DocMetadata::Component(m) => &m.source,
            DocMetadata::PageContent(m) => &m.source,
            DocMetadata::FileMetadata(m) => &m.source,
            DocMetadata::Slide(m) => &m.source,
        }
    }

    /// Display name. Slides report their presentation name.
    pub fn name(&self) -> &str {
        match self {
            DocMetadata::Color(m) | DocMetadata::Typography(m) | DocMetadata::Effect(m) => &m.name,
            DocMetadata::Component(m) => &m.name,
            DocMetadata::PageContent(m) => &m.name,
            DocMetadata::FileMetadata(m) => &m.name,
            DocMetadata::Slide(m) => &m.presentation_name,
        }
    }

    /// Deep link back to the originating artifact.
    pub fn url(&self) -> &str {
        match self {
            DocMetadata::Color(m) | DocMetadata::Typography(m) | DocMetadata::Effect(m) => &m.url,
            DocMetadata::Component(m) => &m.url,
            DocMetadata::PageContent(m) => &m.url,
            DocMetadata::FileMetadata(m) => &m.url,
            DocMetadata::Slide(m) => &m.url,
        }
    }

    /// Design-file key, when the document originates from a file.
    pub fn file_key(&self) -> Option<&str> {
        match self {
            DocMetadata::Color(m) | DocMetadata::Typography(m) | DocMetadata::Effect(m) => {
                Some(&m.file_key)
            }
            DocMetadata::Component(m) => Some(&m.file_key),
            DocMetadata::PageContent(m) => Some(&m.file_key),
            DocMetadata::FileMetadata(m) => Some(&m.file_key),
            DocMetadata::Slide(_) => None,
        }
    }

    /// Presentation id, for slide documents.
    pub fn presentation_id(&self) -> Option<&str> {
        match self {
            DocMetadata::Slide(m) => Some(&m.presentation_id),
            _ => None,
        }
    }

    /// Slide number, for slide documents.
    pub fn slide_number(&self) -> Option<u32> {
        match self {
            DocMetadata::Slide(m) => Some(m.slide_number),
            _ => None,
        }
    }

    /// True when the document is tagged as an approved design example.
    pub fn is_example(&self) -> bool {
        matches!(self, DocMetadata::PageContent(m) if m.is_example)
    }

    /// The example category (`email`, `ad`, ...) when tagged.
    pub fn example_type(&self) -> Option<&str> {
        match self {
            DocMetadata::PageContent(m) => m.example_type.as_deref(),
            _ => None,
        }
    }
}

/// One similarity hit: the stored text, its metadata, and the vector distance.
#[derive(Clone, Debug)]
pub struct RetrievalHit {
    pub document: String,
    pub metadata: DocMetadata,
    /// Cosine distance to the query vector; smaller is more similar.
    pub distance: f32,
}

/// Ordered similarity results, ascending by distance. Constructed fresh per
/// query and never persisted.
#[derive(Clone, Debug, Default)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievalHit>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// A structured pointer back to the origin of retrieved text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub name: String,
    pub source: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component_meta() -> DocMetadata {
        DocMetadata::Component(ComponentMeta {
            source: "figma".into(),
            name: "Button".into(),
            file_key: "abc123".into(),
            component_id: "1:2".into(),
            url: "https://www.figma.com/file/abc123?node-id=1:2".into(),
        })
    }

    #[test]
    fn metadata_serializes_with_flat_type_tag() {
        let value = serde_json::to_value(component_meta()).unwrap();
        assert_eq!(value["type"], "component");
        assert_eq!(value["source"], "figma");
        assert_eq!(value["name"], "Button");
        assert_eq!(value["component_id"], "1:2");
    }

    #[test]
    fn metadata_round_trips() {
        let meta = DocMetadata::Slide(SlideMeta {
            source: "google_slides".into(),
            presentation_name: "Q1 Review".into(),
            presentation_id: "pres-1".into(),
            slide_number: 4,
            url: "https://docs.google.com/presentation/d/pres-1".into(),
        });
        let json = serde_json::to_string(&meta).unwrap();
        let back: DocMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
        assert_eq!(back.name(), "Q1 Review");
        assert_eq!(back.type_name(), "slide");
    }

    #[test]
    fn example_accessors_only_apply_to_pages() {
        let page = DocMetadata::PageContent(PageMeta {
            source: "figma".into(),
            name: "Email Hero".into(),
            file_key: "k".into(),
            file_name: "Email Templates".into(),
            url: "https://www.figma.com/file/k".into(),
            is_example: true,
            example_type: Some("email".into()),
            content_category: "email_example".into(),
        });
        assert!(page.is_example());
        assert_eq!(page.example_type(), Some("email"));
        assert!(!component_meta().is_example());
        assert_eq!(component_meta().example_type(), None);
    }
}
