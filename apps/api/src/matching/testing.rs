// Deterministic fakes for the embedding and generation seams, plus a canonical
// model response. Test-only.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::llm_client::{LlmError, TextGenerator};
use crate::matching::embeddings::{Embedder, EmbeddingError};
use crate::matching::pipeline::CancelSignal;
use crate::matching::requirements::{parse_requirements, LexicalEvidenceMatcher, RequirementKind};

/// A well-formed model response with two comparison rows (Matched, Not Matched).
pub fn sample_result_json(percentage: i64, must_have_ratio: &str, nice_to_have_ratio: &str) -> String {
    format!(
        r#"{{
    "personal_info": {{
        "name": "Nguyen Van A",
        "position": "Backend Developer",
        "experience": "5 years"
    }},
    "matching_score": {{
        "percentage": {percentage},
        "explanation": "Matched 1/2 requirements"
    }},
    "requirements_breakdown": {{
        "must_have_ratio": "{must_have_ratio}",
        "nice_to_have_ratio": "{nice_to_have_ratio}"
    }},
    "matched_keywords": ["Python", "AWS"],
    "radar_chart": {{
        "Hard Skills": 8,
        "Soft Skills": 7,
        "Experience": 8,
        "Education": 6,
        "Domain Knowledge": 7
    }},
    "radar_reasoning": {{
        "Hard Skills": {{ "en": "Solid stack", "vi": "Nền tảng vững" }},
        "Soft Skills": {{ "en": "Team lead examples", "vi": "Có ví dụ dẫn dắt nhóm" }},
        "Experience": {{ "en": "Five years", "vi": "Năm năm" }},
        "Education": {{ "en": "BSc in CS", "vi": "Cử nhân CNTT" }},
        "Domain Knowledge": {{ "en": "Knows the process", "vi": "Hiểu quy trình" }}
    }},
    "bilingual_content": {{
        "general_assessment": {{ "en": "Good fit", "vi": "Phù hợp" }},
        "comparison_table": [
            {{
                "jd_requirement": "Python",
                "cv_evidence": "5 years experience in Python",
                "status": "Matched"
            }},
            {{
                "jd_requirement": "Docker is a plus",
                "cv_evidence": "Not found",
                "status": "Not Matched"
            }}
        ],
        "strengths": {{ "en": ["Python"], "vi": ["Python"] }},
        "weaknesses_missing_skills": {{ "en": ["Docker"], "vi": ["Docker"] }},
        "interview_questions": {{ "en": ["Q1 en", "Q2 en"], "vi": ["Q1 vi", "Q2 vi"] }}
    }}
}}"#
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Embedders
// ────────────────────────────────────────────────────────────────────────────

const VOCABULARY: &[&str] = &[
    "python", "docker", "aws", "rust", "tokio", "axum", "serde", "kubernetes", "sql", "java",
    "react", "go", "kafka", "linux", "cooking", "pasta", "gardening",
];

/// Bag-of-words over a fixed vocabulary plus a constant bias component, so no
/// vector is ever zero and texts without known words embed identically.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    fn embed_one(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; VOCABULARY.len() + 1];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            if let Some(i) = VOCABULARY.iter().position(|w| *w == token) {
                v[i] += 1.0;
            }
        }
        v[VOCABULARY.len()] = 0.1;
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::embed_one(t)).collect())
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Backend {
            status: 503,
            body: "model not loaded".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "failing-test"
    }
}

/// Embeds normally but raises `signal` on the first call.
pub struct CancellingEmbedder {
    pub signal: CancelSignal,
}

#[async_trait]
impl Embedder for CancellingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.signal.cancel();
        Ok(texts.iter().map(|t| KeywordEmbedder::embed_one(t)).collect())
    }

    fn model_name(&self) -> &str {
        "cancelling-test"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generators
// ────────────────────────────────────────────────────────────────────────────

/// Replays queued responses in order; an exhausted queue yields `EmptyContent`.
pub struct ScriptedGenerator {
    configured: bool,
    delay: Option<Duration>,
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
}

impl ScriptedGenerator {
    pub fn replying(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            configured: true,
            delay: None,
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::replying(Vec::new())
        }
    }

    pub fn slow(delay: Duration, response: String) -> Self {
        Self {
            delay: Some(delay),
            ..Self::replying(vec![Ok(response)])
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn ensure_configured(&self) -> Result<(), LlmError> {
        if self.configured {
            Ok(())
        } else {
            Err(LlmError::MissingCredential)
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }

    fn model_name(&self) -> &str {
        "scripted-test"
    }
}

/// Reads the CV excerpt and JD back out of the prompt and answers with a
/// lexical judgement, wrapped the way real models misbehave: prose, code
/// fences and a trailing comma. With `misreport_score` the headline numbers are
/// deliberately wrong so reconciliation has something to fix.
#[derive(Default)]
pub struct LexicalGenerator {
    pub misreport_score: bool,
}

fn section<'a>(prompt: &'a str, start: &str, end: &str) -> &'a str {
    let from = prompt.find(start).map(|i| i + start.len()).unwrap_or(0);
    let to = prompt[from..].find(end).map(|i| from + i).unwrap_or(prompt.len());
    &prompt[from..to]
}

#[async_trait]
impl TextGenerator for LexicalGenerator {
    fn ensure_configured(&self) -> Result<(), LlmError> {
        Ok(())
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let cv = section(prompt, "1. CV text:\n", "\n\n2. JD text");
        let jd = section(prompt, "2. JD text (one criterion per line):\n", "\n\nTASKS:");
        let lines = parse_requirements(jd);
        let matcher = LexicalEvidenceMatcher::new(cv);

        let rows: Vec<_> = lines
            .iter()
            .map(|l| {
                let hit = matcher.is_matched(l);
                json!({
                    "jd_requirement": l.text,
                    "cv_evidence": if hit { "Found in CV" } else { "Not found" },
                    "status": if hit { "Matched" } else { "Not Matched" },
                })
            })
            .collect();
        let tally = matcher.tally(&lines);
        let (percentage, must, nice) = if self.misreport_score {
            (99, "9/9".to_string(), "9/9".to_string())
        } else {
            (
                tally.percentage().unwrap_or(0),
                tally.must_have_ratio(),
                tally.nice_to_have_ratio(),
            )
        };
        let nice_lines = lines
            .iter()
            .filter(|l| l.kind == RequirementKind::NiceToHave)
            .count();
        let reason = |en: &str| json!({ "en": en, "vi": en });

        let body = json!({
            "personal_info": { "name": "Test Candidate", "position": "Engineer", "experience": 5 },
            "matching_score": {
                "percentage": percentage,
                "explanation": format!("Matched {}/{} requirements", tally.matched(), tally.total()),
            },
            "requirements_breakdown": { "must_have_ratio": must, "nice_to_have_ratio": nice },
            "matched_keywords": [],
            "radar_chart": {
                "Hard Skills": 7, "Soft Skills": 5, "Experience": 6, "Education": 5, "Domain Knowledge": 5,
            },
            "radar_reasoning": {
                "Hard Skills": reason("skills"),
                "Soft Skills": reason("soft"),
                "Experience": reason("experience"),
                "Education": reason("education"),
                "Domain Knowledge": reason("domain"),
            },
            "bilingual_content": {
                "general_assessment": reason(&format!("{nice_lines} nice-to-have lines")),
                "comparison_table": rows,
                "strengths": { "en": [], "vi": [] },
                "weaknesses_missing_skills": { "en": [], "vi": [] },
                "interview_questions": { "en": ["Why Rust?"], "vi": ["Tại sao Rust?"] },
            },
        });

        let pretty = serde_json::to_string_pretty(&body).unwrap();
        let with_trailing_comma = format!("{},\n}}", &pretty[..pretty.len() - 2]);
        Ok(format!(
            "Here is the analysis:\n```json\n{with_trailing_comma}\n```"
        ))
    }

    fn model_name(&self) -> &str {
        "lexical-test"
    }
}
