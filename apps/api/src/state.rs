use std::sync::Arc;

use crate::matching::pipeline::MatchPipeline;
use crate::matching::retry::RetryPolicy;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup; holds the embedding backend and the model client.
    pub pipeline: Arc<MatchPipeline>,
    /// Applied around each analysis. Default: a single attempt.
    pub retry: RetryPolicy,
}
