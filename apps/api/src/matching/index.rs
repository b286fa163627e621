//! Context index: an ephemeral, request-scoped embedding index over CV chunks.
//!
//! Built fresh for every analysis, queried once, then dropped. Vectors are
//! normalized, so cosine similarity is a plain dot product. Ties keep chunk order,
//! which makes retrieval deterministic for a fixed embedder.

use tracing::debug;
use uuid::Uuid;

use crate::matching::embeddings::{
    normalize_vectors, truncate_chars, Embedder, EmbeddingError, MAX_EMBED_CHARS,
};
use crate::matching::error::AnalysisError;
use crate::matching::segmenter::TextChunk;

/// Retrieval depth. Fixed for determinism.
pub const TOP_K: usize = 5;

/// The top-k chunks most similar to the query, most relevant first.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalContext {
    pub chunks: Vec<TextChunk>,
}

impl RetrievalContext {
    /// Blank-line-joined chunk text, fed to the prompt as `cv_text`.
    pub fn render(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

struct IndexedChunk {
    chunk: TextChunk,
    vector: Vec<f32>,
}

pub struct ContextIndex {
    name: String,
    entries: Vec<IndexedChunk>,
}

impl ContextIndex {
    /// Embeds every chunk. Any embedding failure aborts the build.
    pub async fn build(
        embedder: &dyn Embedder,
        chunks: Vec<TextChunk>,
        request_id: Uuid,
    ) -> Result<Self, AnalysisError> {
        if let Some((index, chunk)) = chunks
            .iter()
            .enumerate()
            .find(|(_, c)| c.content.chars().count() > MAX_EMBED_CHARS)
        {
            return Err(EmbeddingError::InputTooLarge {
                index,
                len: chunk.content.chars().count(),
                max: MAX_EMBED_CHARS,
            }
            .into());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let mut vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                got: vectors.len(),
            }
            .into());
        }
        normalize_vectors(&mut vectors)?;

        let name = format!("cv_analysis_{}", request_id.simple());
        debug!(
            "built context index {} with {} chunks ({})",
            name,
            chunks.len(),
            embedder.model_name()
        );

        Ok(Self {
            name,
            entries: chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexedChunk { chunk, vector })
                .collect(),
        })
    }

    /// Returns the `k` chunks closest to `query`, or all of them when fewer exist.
    pub async fn retrieve(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> Result<RetrievalContext, AnalysisError> {
        let query = truncate_chars(query, MAX_EMBED_CHARS).to_string();
        let mut query_vecs = embedder.embed_batch(&[query]).await?;
        if query_vecs.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                got: query_vecs.len(),
            }
            .into());
        }
        normalize_vectors(&mut query_vecs)?;
        let query_vec = &query_vecs[0];

        if let Some(first) = self.entries.first() {
            if first.vector.len() != query_vec.len() {
                return Err(EmbeddingError::DimensionMismatch {
                    index: 0,
                    expected: first.vector.len(),
                    got: query_vec.len(),
                }
                .into());
            }
        }

        let mut scored: Vec<(f32, &TextChunk)> = self
            .entries
            .iter()
            .map(|e| (dot(&e.vector, query_vec), &e.chunk))
            .collect();
        // Stable sort: equal scores keep sequence order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!(
            "index {} returned {} of {} chunks",
            self.name,
            scored.len(),
            self.entries.len()
        );

        Ok(RetrievalContext {
            chunks: scored.into_iter().map(|(_, c)| c.clone()).collect(),
        })
    }
}

impl Drop for ContextIndex {
    fn drop(&mut self) {
        self.entries.clear();
        debug!("released context index {}", self.name);
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
