//! Pipeline orchestrator: one sequential run per analysis request.
//!
//! ```text
//! Idle → Loading → Segmenting → Retrieving → Assembling → Invoking → Sanitizing → Done
//! ```
//!
//! Any stage may end the run with an [`AnalysisError`]. Nothing is retried here
//! (see `matching::retry`). The context index lives inside the `Retrieving` stage
//! and is dropped on every exit path.
//!
//! Cancellation is checked before entering each stage up to and including
//! `Invoking`. Once the model request is sent the run completes.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm_client::{LlmError, TextGenerator};
use crate::matching::embeddings::Embedder;
use crate::matching::error::AnalysisError;
use crate::matching::index::{ContextIndex, TOP_K};
use crate::matching::loader::{join_pages, load_pdf};
use crate::matching::normalize::normalize_text;
use crate::matching::prompts::build_match_prompt;
use crate::matching::requirements::{parse_requirements, LexicalEvidenceMatcher};
use crate::matching::result::MatchResult;
use crate::matching::sanitizer::parse_match_result;
use crate::matching::segmenter::{segment, SegmenterConfig};

pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    Loading,
    Segmenting,
    Retrieving,
    Assembling,
    Invoking,
    Sanitizing,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Loading => "loading",
            Stage::Segmenting => "segmenting",
            Stage::Retrieving => "retrieving",
            Stage::Assembling => "assembling",
            Stage::Invoking => "invoking",
            Stage::Sanitizing => "sanitizing",
            Stage::Done => "done",
        }
    }

    /// Stages that may still be skipped when the caller goes away.
    fn is_cancellable(&self) -> bool {
        *self <= Stage::Invoking
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cooperative cancellation flag shared between a caller and a running analysis.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns a guard that raises the signal when dropped.
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

pub struct CancelOnDrop(CancelSignal);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub segmenter: SegmenterConfig,
    pub model_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }
}

enum CvSource<'a> {
    Pdf(&'a Path),
    Text(&'a str),
}

/// Per-run bookkeeping: identity, current stage, cancellation.
struct Run<'a> {
    id: Uuid,
    stage: Stage,
    cancel: &'a CancelSignal,
}

impl Run<'_> {
    fn enter(&mut self, next: Stage) -> Result<(), AnalysisError> {
        if next.is_cancellable() && self.cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled(next.to_string()));
        }
        debug!("analysis {}: {} -> {}", self.id, self.stage, next);
        self.stage = next;
        Ok(())
    }
}

/// The CV/JD matching pipeline. Holds only shared, read-only dependencies, so one
/// instance serves all concurrent requests.
pub struct MatchPipeline {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn TextGenerator>,
    settings: PipelineSettings,
}

impl MatchPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn TextGenerator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedder,
            generator,
            settings,
        }
    }

    /// Analyzes the PDF at `path` against `jd_text`.
    pub async fn analyze(
        &self,
        path: &Path,
        jd_text: &str,
        cancel: &CancelSignal,
    ) -> Result<MatchResult, AnalysisError> {
        self.run(CvSource::Pdf(path), jd_text, cancel).await
    }

    /// Same as [`analyze`](Self::analyze) for CV text that is already extracted.
    pub async fn analyze_text(
        &self,
        cv_text: &str,
        jd_text: &str,
        cancel: &CancelSignal,
    ) -> Result<MatchResult, AnalysisError> {
        self.run(CvSource::Text(cv_text), jd_text, cancel).await
    }

    async fn run(
        &self,
        source: CvSource<'_>,
        jd_text: &str,
        cancel: &CancelSignal,
    ) -> Result<MatchResult, AnalysisError> {
        let started = Instant::now();
        let mut run = Run {
            id: Uuid::new_v4(),
            stage: Stage::Idle,
            cancel,
        };

        match self.execute(source, jd_text, &mut run).await {
            Ok(result) => {
                info!(
                    "analysis {} done: {}% in {}ms",
                    run.id,
                    result.matching_score.percentage,
                    started.elapsed().as_millis()
                );
                Ok(result)
            }
            Err(e) => {
                warn!(
                    "analysis {} failed during {} after {}ms: {}",
                    run.id,
                    run.stage,
                    started.elapsed().as_millis(),
                    e
                );
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        source: CvSource<'_>,
        jd_text: &str,
        run: &mut Run<'_>,
    ) -> Result<MatchResult, AnalysisError> {
        // Pre-flight: nothing is read until the request is known to be runnable.
        self.generator.ensure_configured()?;
        let jd = normalize_text(jd_text);
        let lines = parse_requirements(&jd);
        if lines.is_empty() {
            return Err(AnalysisError::InvalidJobDescription(
                "job description has no non-empty lines".to_string(),
            ));
        }

        run.enter(Stage::Loading)?;
        let raw = match source {
            CvSource::Pdf(path) => load_pdf(path).await?,
            CvSource::Text(text) => join_pages([text])?,
        };
        let cv = normalize_text(&raw);

        run.enter(Stage::Segmenting)?;
        let chunks = segment(&cv, self.settings.segmenter);
        debug!("analysis {}: {} chunks", run.id, chunks.len());

        run.enter(Stage::Retrieving)?;
        let context = {
            let index = ContextIndex::build(self.embedder.as_ref(), chunks, run.id).await?;
            index.retrieve(self.embedder.as_ref(), &jd, TOP_K).await?
        };

        run.enter(Stage::Assembling)?;
        let prompt = build_match_prompt(&context, &jd, &lines);

        run.enter(Stage::Invoking)?;
        let timeout = self.settings.model_timeout;
        let raw_output = tokio::time::timeout(timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| LlmError::Timeout(timeout.as_secs()))??;
        debug!(
            "analysis {}: {} returned {} characters",
            run.id,
            self.generator.model_name(),
            raw_output.len()
        );

        run.enter(Stage::Sanitizing)?;
        let mut result = parse_match_result(&raw_output)?;
        result
            .reconcile(&lines)
            .map_err(AnalysisError::MalformedOutput)?;
        if result.bilingual_content.comparison_table.len() != lines.len() {
            // No per-line verdicts to check against; log a lexical estimate instead.
            let estimate = LexicalEvidenceMatcher::new(&context.render()).tally(&lines);
            debug!(
                "analysis {}: model says {}%, lexical estimate {:?}% ({} / {})",
                run.id,
                result.matching_score.percentage,
                estimate.percentage(),
                estimate.must_have_ratio(),
                estimate.nice_to_have_ratio()
            );
        }

        run.enter(Stage::Done)?;
        Ok(result)
    }
}
