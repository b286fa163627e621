use std::str::FromStr;

use anyhow::{Context, Result};

use crate::llm_client::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::matching::embeddings::{
    EmbeddingProvider, DEFAULT_EMBEDDING_BASE_URL, DEFAULT_EMBEDDING_MODEL,
};
use crate::matching::segmenter::{SegmenterConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

/// Application configuration loaded from environment variables.
/// Everything has a default except the two API keys.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent is allowed; analyses then fail pre-flight.
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub llm_timeout_secs: u64,
    pub embedding_provider: EmbeddingProvider,
    pub embedding_base_url: String,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,
    pub segmenter: SegmenterConfig,
    pub analyze_max_attempts: u32,
    pub max_upload_mb: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let chunk_size = parse_env("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap = parse_env("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        let segmenter = SegmenterConfig::new(chunk_size, chunk_overlap).with_context(|| {
            format!("CHUNK_OVERLAP ({chunk_overlap}) must be smaller than CHUNK_SIZE ({chunk_size})")
        })?;

        let embedding_provider = std::env::var("EMBEDDING_PROVIDER")
            .unwrap_or_else(|_| "ollama".to_string())
            .parse::<EmbeddingProvider>()
            .map_err(anyhow::Error::msg)?;

        Ok(Config {
            google_api_key: optional_env("GOOGLE_API_KEY"),
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_MODEL),
            gemini_api_base: env_or("GEMINI_API_BASE", DEFAULT_API_BASE),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
            embedding_provider,
            embedding_base_url: env_or("EMBEDDING_BASE_URL", DEFAULT_EMBEDDING_BASE_URL),
            embedding_model: env_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_api_key: optional_env("EMBEDDING_API_KEY"),
            segmenter,
            analyze_max_attempts: parse_env("ANALYZE_MAX_ATTEMPTS", 1)?,
            max_upload_mb: parse_env("MAX_UPLOAD_MB", 10)?,
            port: parse_env("PORT", 8000)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and blank are both `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{key} has invalid value '{raw}': {e}"))
}
