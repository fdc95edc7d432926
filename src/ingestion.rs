//! Transforms raw external records into store-ready documents.
//!
//! One transformer per record type (style tokens, components, page text,
//! file metadata, slides), each yielding `(document text, metadata)` pairs
//! for [`EmbeddingStore::upsert`](crate::store::EmbeddingStore::upsert).
//! Oversized page text is split into fixed-size character chunks, and
//! upserts run in fixed-size batches to bound request payloads.
//!
//! Malformed records are skipped with a warning; the rest of the batch
//! continues. Store failures abort the whole operation.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::resolver::{DesignNode, NodeKind};
use crate::store::EmbeddingStore;
use crate::types::{
    ComponentMeta, DocMetadata, FileMeta, PageMeta, RagError, SlideMeta, StyleMeta,
};

const FIGMA_SOURCE: &str = "figma";
const SLIDES_SOURCE: &str = "google_slides";

/// One named style token (color, typography, or effect).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StyleToken {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Style tokens extracted from one design file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DesignTokens {
    pub file_key: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub colors: Vec<StyleToken>,
    #[serde(default)]
    pub typography: Vec<StyleToken>,
    #[serde(default)]
    pub effects: Vec<StyleToken>,
}

/// A published component descriptor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub file_key: String,
}

/// Assembled text content of one design-file page.
///
/// The example/category flags are derived by the external collaborator
/// (classification by file name lives there); the core only threads them
/// through as metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageRecord {
    pub page_name: String,
    pub content: String,
    pub file_key: String,
    pub file_name: String,
    #[serde(default)]
    pub is_example: bool,
    #[serde(default)]
    pub example_type: Option<String>,
    #[serde(default)]
    pub content_category: String,
}

/// Summary metadata for one design file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRecord {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub project: String,
    pub url: String,
    #[serde(default)]
    pub last_modified: String,
}

/// Text content of one presentation slide.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlideRecord {
    pub slide_number: u32,
    #[serde(default)]
    pub texts: Vec<String>,
    #[serde(default)]
    pub speaker_notes: String,
}

/// One presentation and its slides.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PresentationRecord {
    pub presentation_id: String,
    pub name: String,
    #[serde(default)]
    pub web_view_link: String,
    #[serde(default)]
    pub slides: Vec<SlideRecord>,
}

/// Concatenates all text found in a node subtree.
///
/// Pre-order traversal: leaf TEXT characters are collected in traversal
/// order and joined with newlines.
pub fn collect_text(node: &DesignNode) -> String {
    let mut texts = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.kind == NodeKind::Text {
            if let Some(characters) = current.characters.as_deref() {
                if !characters.is_empty() {
                    texts.push(characters);
                }
            }
        }
        for child in current.children.iter().rev() {
            stack.push(child);
        }
    }
    texts.join("\n")
}

/// Splits `text` into sequential chunks of at most `chunk_size` characters.
///
/// Boundaries are plain character offsets, not sentence-aware; the chunks
/// concatenate back to the original text exactly.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    if chunk_size == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn file_url(file_key: &str) -> String {
    format!("https://www.figma.com/file/{file_key}")
}

/// Builds one document per style token.
pub fn style_documents(tokens: &DesignTokens) -> Vec<(String, DocMetadata)> {
    let groups: [(&str, &[StyleToken], fn(StyleMeta) -> DocMetadata); 3] = [
        ("Color", &tokens.colors, DocMetadata::Color),
        ("Typography", &tokens.typography, DocMetadata::Typography),
        ("Effect", &tokens.effects, DocMetadata::Effect),
    ];

    let mut documents = Vec::new();
    for (kind, styles, wrap) in groups {
        for style in styles {
            if style.name.is_empty() {
                warn!(kind, style_id = %style.id, "skipping style token with empty name");
                continue;
            }
            let mut text = format!("{kind} Style: {}\n", style.name);
            if !style.description.is_empty() {
                text.push_str(&format!("Description: {}\n", style.description));
            }
            documents.push((
                text,
                wrap(StyleMeta {
                    source: FIGMA_SOURCE.into(),
                    name: style.name.clone(),
                    file_key: tokens.file_key.clone(),
                    style_id: style.id.clone(),
                    url: file_url(&tokens.file_key),
                }),
            ));
        }
    }
    documents
}

/// Builds one document per component, with its deep link.
pub fn component_documents(components: &[ComponentRecord]) -> Vec<(String, DocMetadata)> {
    let mut documents = Vec::new();
    for component in components {
        if component.name.is_empty() {
            warn!(component_id = %component.id, "skipping component with empty name");
            continue;
        }
        let mut text = format!("Component: {}\n", component.name);
        if !component.description.is_empty() {
            text.push_str(&format!("Description: {}\n", component.description));
        }
        documents.push((
            text,
            DocMetadata::Component(ComponentMeta {
                source: FIGMA_SOURCE.into(),
                name: component.name.clone(),
                file_key: component.file_key.clone(),
                component_id: component.id.clone(),
                url: format!(
                    "https://www.figma.com/file/{}?node-id={}",
                    component.file_key, component.id
                ),
            }),
        ));
    }
    documents
}

/// Builds documents for page text content, chunking oversized pages.
pub fn page_documents(pages: &[PageRecord], chunk_size: usize) -> Vec<(String, DocMetadata)> {
    let mut documents = Vec::new();
    for page in pages {
        if page.content.trim().is_empty() {
            warn!(page = %page.page_name, "skipping page with no text content");
            continue;
        }

        let page_meta = |name: String| {
            DocMetadata::PageContent(PageMeta {
                source: FIGMA_SOURCE.into(),
                name,
                file_key: page.file_key.clone(),
                file_name: page.file_name.clone(),
                url: file_url(&page.file_key),
                is_example: page.is_example,
                example_type: page.example_type.clone(),
                content_category: page.content_category.clone(),
            })
        };

        if page.content.chars().count() > chunk_size {
            let chunks = chunk_text(&page.content, chunk_size);
            let total = chunks.len();
            for (idx, chunk) in chunks.into_iter().enumerate() {
                let part = idx + 1;
                let text = format!(
                    "Page: {} from {} (Part {part}/{total})\n\n{chunk}",
                    page.page_name, page.file_name
                );
                documents.push((text, page_meta(format!("{} (Part {part})", page.page_name))));
            }
        } else {
            let text = format!(
                "Page: {} from {}\n\n{}",
                page.page_name, page.file_name, page.content
            );
            documents.push((text, page_meta(page.page_name.clone())));
        }
    }
    documents
}

/// Builds one summary document per file, so files are searchable without
/// their full text.
pub fn file_documents(files: &[FileRecord]) -> Vec<(String, DocMetadata)> {
    let mut documents = Vec::new();
    for file in files {
        if file.name.is_empty() {
            warn!(file_key = %file.key, "skipping file record with empty name");
            continue;
        }
        let last_modified = if file.last_modified.is_empty() {
            "Unknown"
        } else {
            &file.last_modified
        };
        let text = format!(
            "Figma File: {}\nProject: {}\nLast modified: {last_modified}\nURL: {}\n",
            file.name, file.project, file.url
        );
        documents.push((
            text,
            DocMetadata::FileMetadata(FileMeta {
                source: FIGMA_SOURCE.into(),
                name: file.name.clone(),
                file_key: file.key.clone(),
                project: file.project.clone(),
                url: file.url.clone(),
                last_modified: file.last_modified.clone(),
            }),
        ));
    }
    documents
}

/// Builds one document per slide carrying any text or speaker notes.
pub fn slide_documents(presentation: &PresentationRecord) -> Vec<(String, DocMetadata)> {
    let mut documents = Vec::new();
    for slide in &presentation.slides {
        let body = slide.texts.join(" ");
        if body.is_empty() && slide.speaker_notes.is_empty() {
            continue;
        }
        let mut text = format!(
            "Slide {} from '{}'\n",
            slide.slide_number, presentation.name
        );
        if !body.is_empty() {
            text.push_str(&format!("Content: {body}\n"));
        }
        if !slide.speaker_notes.is_empty() {
            text.push_str(&format!("Notes: {}\n", slide.speaker_notes));
        }
        documents.push((
            text,
            DocMetadata::Slide(SlideMeta {
                source: SLIDES_SOURCE.into(),
                presentation_name: presentation.name.clone(),
                presentation_id: presentation.presentation_id.clone(),
                slide_number: slide.slide_number,
                url: presentation.web_view_link.clone(),
            }),
        ));
    }
    documents
}

/// Runs transformers and persists their output in fixed-size batches.
#[derive(Clone)]
pub struct Ingestor {
    store: EmbeddingStore,
    chunk_size: usize,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(store: EmbeddingStore, chunk_size: usize, batch_size: usize) -> Self {
        Self {
            store,
            chunk_size,
            batch_size,
        }
    }

    async fn upsert_batched(
        &self,
        documents: Vec<(String, DocMetadata)>,
        label: &str,
    ) -> Result<(), RagError> {
        if documents.is_empty() {
            return Ok(());
        }
        let total = documents.len();
        let batch_size = self.batch_size.max(1);
        let mut iter = documents.into_iter();
        loop {
            let batch: Vec<_> = iter.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            self.store.upsert(batch, None).await?;
        }
        info!(count = total, kind = label, "ingested documents");
        Ok(())
    }

    /// Ingests color/typography/effect style tokens.
    pub async fn ingest_styles(&self, tokens: &DesignTokens) -> Result<(), RagError> {
        self.upsert_batched(style_documents(tokens), "styles").await
    }

    /// Ingests component descriptors.
    pub async fn ingest_components(&self, components: &[ComponentRecord]) -> Result<(), RagError> {
        self.upsert_batched(component_documents(components), "components")
            .await
    }

    /// Ingests page text content, chunking oversized pages.
    pub async fn ingest_pages(&self, pages: &[PageRecord]) -> Result<(), RagError> {
        self.upsert_batched(page_documents(pages, self.chunk_size), "pages")
            .await
    }

    /// Ingests file metadata summaries.
    pub async fn ingest_file_index(&self, files: &[FileRecord]) -> Result<(), RagError> {
        self.upsert_batched(file_documents(files), "files").await
    }

    /// Ingests slide text and speaker notes for one presentation.
    pub async fn ingest_slides(&self, presentation: &PresentationRecord) -> Result<(), RagError> {
        self.upsert_batched(slide_documents(presentation), "slides")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_reconstruct_the_original_text() {
        let text = "abcdefghij".repeat(37); // 370 chars
        let chunks = chunk_text(&text, 100);
        assert_eq!(chunks.len(), 4); // ceil(370 / 100)
        assert_eq!(chunks.concat(), text);
        assert!(chunks[..3].iter().all(|c| c.chars().count() == 100));
        assert_eq!(chunks[3].chars().count(), 70);
    }

    #[test]
    fn chunking_respects_char_boundaries() {
        let text = "héllo wörld ".repeat(30);
        let chunks = chunk_text(&text, 50);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
    }

    #[test]
    fn short_text_yields_a_single_chunk() {
        assert_eq!(chunk_text("short", 2000), vec!["short".to_string()]);
    }

    #[test]
    fn style_documents_cover_all_kinds_and_skip_unnamed() {
        let tokens = DesignTokens {
            file_key: "file-1".into(),
            file_name: "DS".into(),
            colors: vec![
                StyleToken {
                    id: "c1".into(),
                    name: "Primary/Blue".into(),
                    description: "Brand blue".into(),
                },
                StyleToken {
                    id: "c2".into(),
                    name: String::new(),
                    description: String::new(),
                },
            ],
            typography: vec![StyleToken {
                id: "t1".into(),
                name: "Heading/H1".into(),
                description: String::new(),
            }],
            effects: vec![StyleToken {
                id: "e1".into(),
                name: "Shadow/Soft".into(),
                description: String::new(),
            }],
        };

        let documents = style_documents(&tokens);
        assert_eq!(documents.len(), 3);
        assert_eq!(
            documents[0].0,
            "Color Style: Primary/Blue\nDescription: Brand blue\n"
        );
        assert_eq!(documents[0].1.type_name(), "color");
        assert_eq!(documents[1].0, "Typography Style: Heading/H1\n");
        assert_eq!(documents[2].1.type_name(), "effect");
    }

    #[test]
    fn component_documents_build_deep_links() {
        let components = vec![ComponentRecord {
            id: "1:2".into(),
            name: "Button".into(),
            description: String::new(),
            file_key: "abc".into(),
        }];
        let documents = component_documents(&components);
        assert_eq!(documents.len(), 1);
        assert_eq!(
            documents[0].1.url(),
            "https://www.figma.com/file/abc?node-id=1:2"
        );
    }

    #[test]
    fn oversized_pages_split_into_labeled_parts() {
        let page = PageRecord {
            page_name: "Landing".into(),
            content: "x".repeat(4500),
            file_key: "k".into(),
            file_name: "Site".into(),
            is_example: false,
            example_type: None,
            content_category: "general".into(),
        };
        let documents = page_documents(&[page], 2000);
        assert_eq!(documents.len(), 3);
        assert!(documents[0].0.starts_with("Page: Landing from Site (Part 1/3)\n\n"));
        assert_eq!(documents[0].1.name(), "Landing (Part 1)");
        assert_eq!(documents[2].1.name(), "Landing (Part 3)");
    }

    #[test]
    fn small_pages_stay_whole_and_blank_pages_are_skipped() {
        let pages = vec![
            PageRecord {
                page_name: "About".into(),
                content: "Who we are".into(),
                file_key: "k".into(),
                file_name: "Site".into(),
                is_example: true,
                example_type: Some("email".into()),
                content_category: "email_example".into(),
            },
            PageRecord {
                page_name: "Empty".into(),
                content: "   ".into(),
                file_key: "k".into(),
                file_name: "Site".into(),
                is_example: false,
                example_type: None,
                content_category: "general".into(),
            },
        ];
        let documents = page_documents(&pages, 2000);
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].0, "Page: About from Site\n\nWho we are");
        assert_eq!(documents[0].1.name(), "About");
        assert!(documents[0].1.is_example());
    }

    #[test]
    fn slide_documents_skip_textless_slides() {
        let presentation = PresentationRecord {
            presentation_id: "pres-1".into(),
            name: "Q1 Review".into(),
            web_view_link: "https://docs.google.com/presentation/d/pres-1".into(),
            slides: vec![
                SlideRecord {
                    slide_number: 1,
                    texts: vec!["Welcome".into(), "Agenda".into()],
                    speaker_notes: "Keep it short".into(),
                },
                SlideRecord {
                    slide_number: 2,
                    texts: vec![],
                    speaker_notes: String::new(),
                },
            ],
        };
        let documents = slide_documents(&presentation);
        assert_eq!(documents.len(), 1);
        assert_eq!(
            documents[0].0,
            "Slide 1 from 'Q1 Review'\nContent: Welcome Agenda\nNotes: Keep it short\n"
        );
        assert_eq!(documents[0].1.slide_number(), Some(1));
    }

    #[test]
    fn collect_text_walks_in_preorder() {
        let tree = DesignNode {
            id: "0:0".into(),
            name: "Page".into(),
            kind: NodeKind::Canvas,
            characters: None,
            children: vec![
                DesignNode {
                    id: "1:0".into(),
                    name: "Header".into(),
                    kind: NodeKind::Frame,
                    characters: None,
                    children: vec![DesignNode {
                        id: "1:1".into(),
                        name: "Title".into(),
                        kind: NodeKind::Text,
                        characters: Some("First".into()),
                        children: vec![],
                    }],
                },
                DesignNode {
                    id: "2:0".into(),
                    name: "Body".into(),
                    kind: NodeKind::Text,
                    characters: Some("Second".into()),
                    children: vec![],
                },
            ],
        };
        assert_eq!(collect_text(&tree), "First\nSecond");
    }
}
