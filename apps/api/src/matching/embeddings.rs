//! Embedding backend for the context index.
//!
//! The index only needs a fixed-dimension sentence embedding with normalized
//! vectors; which model produces it is swappable. `HttpEmbedder` talks to either
//! an Ollama `/api/embed` endpoint or an OpenAI-compatible `/v1/embeddings`
//! endpoint and L2-normalizes whatever comes back.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_EMBEDDING_BASE_URL: &str = "http://localhost:11434";
/// all-MiniLM-L6-v2 as served by Ollama.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";
/// Longest input accepted by the backend, in characters.
pub const MAX_EMBED_CHARS: usize = 8_000;
const BATCH_SIZE: usize = 32;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("embedding backend returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("input {index} is {len} characters, above the {max} character limit")]
    InputTooLarge { index: usize, len: usize, max: usize },

    #[error("embedding {index} has dimension {got}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },

    #[error("embedding {0} is a zero vector")]
    ZeroVector(usize),
}

/// A sentence-embedding model. Shared read-only across concurrent requests.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns one raw vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    Ollama,
    OpenAi,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(EmbeddingProvider::Ollama),
            "openai" => Ok(EmbeddingProvider::OpenAi),
            other => Err(format!("unknown embedding provider '{other}'")),
        }
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    provider: EmbeddingProvider,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(
        provider: EmbeddingProvider,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            provider,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    async fn embed_ollama(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let resp = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&OllamaEmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body: OllamaEmbedResponse = resp.json().await?;
        Ok(body.embeddings)
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut request = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .json(&OpenAiEmbedRequest {
                model: &self.model,
                input: texts,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let resp = check_status(request.send().await?).await?;
        let body: OpenAiEmbedResponse = resp.json().await?;
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, EmbeddingError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(EmbeddingError::Backend { status, body })
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            debug!(
                "embedding batch of {} via {:?} ({})",
                batch.len(),
                self.provider,
                self.model
            );
            let vectors = match self.provider {
                EmbeddingProvider::Ollama => self.embed_ollama(batch).await?,
                EmbeddingProvider::OpenAi => self.embed_openai(batch).await?,
            };
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    got: vectors.len(),
                });
            }
            all.extend(vectors);
        }
        Ok(all)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Truncates `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// L2-normalizes every vector in place and checks they share one dimension.
pub fn normalize_vectors(vectors: &mut [Vec<f32>]) -> Result<(), EmbeddingError> {
    let expected = vectors.first().map(Vec::len).unwrap_or(0);
    for (index, v) in vectors.iter_mut().enumerate() {
        if v.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                index,
                expected,
                got: v.len(),
            });
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Err(EmbeddingError::ZeroVector(index));
        }
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    Ok(())
}
