mod config;
mod errors;
mod llm_client;
mod matching;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::GeminiClient;
use crate::matching::embeddings::HttpEmbedder;
use crate::matching::pipeline::{MatchPipeline, PipelineSettings};
use crate::matching::retry::RetryPolicy;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values, never on missing keys)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobMatchr API v{}", env!("CARGO_PKG_VERSION"));

    // Generative model client (one per process)
    let model_timeout = Duration::from_secs(config.llm_timeout_secs);
    let generator = GeminiClient::new(
        config.google_api_key.clone(),
        &config.gemini_api_base,
        &config.gemini_model,
        model_timeout,
    )?;
    if config.google_api_key.is_some() {
        info!("LLM client initialized (model: {})", config.gemini_model);
    } else {
        error!("GOOGLE_API_KEY is not set; every analysis will fail until it is configured");
    }

    // Embedding backend (one per process)
    let embedder = HttpEmbedder::new(
        config.embedding_provider,
        &config.embedding_base_url,
        &config.embedding_model,
        config.embedding_api_key.clone(),
    )?;
    info!(
        "Embedding backend: {:?} at {} (model: {})",
        config.embedding_provider, config.embedding_base_url, config.embedding_model
    );

    let pipeline = MatchPipeline::new(
        Arc::new(embedder),
        Arc::new(generator),
        PipelineSettings {
            segmenter: config.segmenter,
            model_timeout,
        },
    );

    // Build app state
    let state = AppState {
        pipeline: Arc::new(pipeline),
        retry: RetryPolicy::new(config.analyze_max_attempts),
    };

    // Build router
    let app = build_router(state, config.max_upload_mb * 1024 * 1024)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
