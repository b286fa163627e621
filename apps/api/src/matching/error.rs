//! Typed failures of the matching pipeline.
//!
//! Every step-level failure is converted into one of these variants at the
//! orchestrator boundary. Nothing here is retried internally; callers decide
//! retry policy via [`AnalysisError::is_retryable`].

use thiserror::Error;

use crate::llm_client::LlmError;
use crate::matching::embeddings::EmbeddingError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Missing credential or invalid process configuration. Raised pre-flight.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Could not read document: {0}")]
    DocumentRead(String),

    #[error("Document contains no extractable text: {0}")]
    EmptyContent(String),

    /// The job description yields no requirement lines.
    #[error("Invalid job description: {0}")]
    InvalidJobDescription(String),

    #[error("Failed to build retrieval index: {0}")]
    IndexBuild(String),

    #[error("Generative model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Generative model call failed: {0}")]
    ModelInvocation(String),

    #[error("Model returned invalid output, retry: {0}")]
    MalformedOutput(String),

    #[error("Analysis cancelled before {0}")]
    Cancelled(String),
}

impl AnalysisError {
    /// Whether re-running the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::IndexBuild(_)
                | AnalysisError::ModelUnavailable(_)
                | AnalysisError::ModelInvocation(_)
                | AnalysisError::MalformedOutput(_)
        )
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Configuration(_) => "CONFIGURATION_ERROR",
            AnalysisError::DocumentRead(_) => "DOCUMENT_READ_ERROR",
            AnalysisError::EmptyContent(_) => "EMPTY_CONTENT_ERROR",
            AnalysisError::InvalidJobDescription(_) => "INVALID_JOB_DESCRIPTION",
            AnalysisError::IndexBuild(_) => "INDEX_BUILD_ERROR",
            AnalysisError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            AnalysisError::ModelInvocation(_) => "MODEL_INVOCATION_ERROR",
            AnalysisError::MalformedOutput(_) => "MALFORMED_OUTPUT",
            AnalysisError::Cancelled(_) => "CANCELLED",
        }
    }
}

impl From<LlmError> for AnalysisError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingCredential => AnalysisError::Configuration(err.to_string()),
            LlmError::Unavailable { .. } => AnalysisError::ModelUnavailable(err.to_string()),
            LlmError::EmptyContent | LlmError::Blocked(_) => {
                AnalysisError::MalformedOutput(err.to_string())
            }
            LlmError::Http(_) | LlmError::Api { .. } | LlmError::Timeout(_) => {
                AnalysisError::ModelInvocation(err.to_string())
            }
        }
    }
}

impl From<EmbeddingError> for AnalysisError {
    fn from(err: EmbeddingError) -> Self {
        AnalysisError::IndexBuild(err.to_string())
    }
}
