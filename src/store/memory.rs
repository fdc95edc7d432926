//! In-process vector backend.
//!
//! Useful for tests and small corpora; shares the sqlite backend's cosine
//! metric and filter semantics so the two are interchangeable behind
//! [`VectorBackend`](super::VectorBackend).

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{MetadataFilter, StoredDocument, VectorBackend};
use crate::types::{RagError, RetrievalHit};

/// Vector store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryVectorBackend {
    documents: RwLock<Vec<StoredDocument>>,
}

impl MemoryVectorBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorBackend for MemoryVectorBackend {
    async fn insert(&self, documents: Vec<StoredDocument>) -> Result<(), RagError> {
        let mut store = self.documents.write();
        for incoming in documents {
            if let Some(existing) = store.iter_mut().find(|doc| doc.id == incoming.id) {
                *existing = incoming;
            } else {
                store.push(incoming);
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalHit>, RagError> {
        let store = self.documents.read();
        let mut scored = Vec::new();
        for doc in store.iter() {
            if let Some(filter) = filter {
                let value = serde_json::to_value(&doc.metadata)?;
                if !filter.matches(&value) {
                    continue;
                }
            }
            scored.push(RetrievalHit {
                document: doc.content.clone(),
                metadata: doc.metadata.clone(),
                distance: cosine_distance(query, &doc.embedding),
            });
        }
        // Stable sort keeps insertion order among equal distances.
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn clear(&self) -> Result<(), RagError> {
        self.documents.write().clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.documents.read().len())
    }
}
