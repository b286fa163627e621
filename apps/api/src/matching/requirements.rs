//! Requirement lines: lexical classification and the exact scoring arithmetic.
//!
//! Every non-empty JD line is one requirement. A line is `NiceToHave` iff it
//! contains (case-insensitive substring) one of the markers below, otherwise it
//! is a `Requirement`. The rule is purely lexical: the prompt states it, the
//! service applies it, and both must agree.
//!
//! `percentage = round(100 * matched / total)`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Markers that downgrade a line to nice-to-have. Stored lowercase.
pub const NICE_TO_HAVE_MARKERS: &[&str] = &[
    // English
    "nice to have",
    "plus",
    "preferred",
    "advantage",
    "desired",
    "bonus",
    "optional",
    "willing to",
    // Vietnamese
    "ưu tiên",
    "lợi thế",
    "điểm cộng",
    "không bắt buộc",
    "mong muốn",
    "nếu có",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequirementKind {
    Requirement,
    NiceToHave,
}

impl RequirementKind {
    pub fn label(&self) -> &'static str {
        match self {
            RequirementKind::Requirement => "Requirement",
            RequirementKind::NiceToHave => "Nice-to-have",
        }
    }
}

/// One non-empty line of the job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequirementLine {
    /// 1-based position among the non-empty lines.
    pub number: usize,
    pub text: String,
    pub kind: RequirementKind,
}

pub fn classify_line(line: &str) -> RequirementKind {
    let lower = line.to_lowercase();
    if NICE_TO_HAVE_MARKERS.iter().any(|m| lower.contains(m)) {
        RequirementKind::NiceToHave
    } else {
        RequirementKind::Requirement
    }
}

/// Splits a JD into trimmed, non-empty, classified lines.
pub fn parse_requirements(jd_text: &str) -> Vec<JobRequirementLine> {
    jd_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(i, text)| JobRequirementLine {
            number: i + 1,
            text: text.to_string(),
            kind: classify_line(text),
        })
        .collect()
}

/// Matched/total counts per requirement class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequirementTally {
    pub must_have_matched: usize,
    pub must_have_total: usize,
    pub nice_to_have_matched: usize,
    pub nice_to_have_total: usize,
}

impl RequirementTally {
    /// Tallies `lines` with `matched[i]` telling whether line `i` has evidence.
    pub fn from_matches(lines: &[JobRequirementLine], matched: &[bool]) -> Self {
        let mut tally = Self::default();
        for (line, &hit) in lines.iter().zip(matched) {
            match line.kind {
                RequirementKind::Requirement => {
                    tally.must_have_total += 1;
                    tally.must_have_matched += usize::from(hit);
                }
                RequirementKind::NiceToHave => {
                    tally.nice_to_have_total += 1;
                    tally.nice_to_have_matched += usize::from(hit);
                }
            }
        }
        tally
    }

    pub fn matched(&self) -> usize {
        self.must_have_matched + self.nice_to_have_matched
    }

    pub fn total(&self) -> usize {
        self.must_have_total + self.nice_to_have_total
    }

    /// `None` when there are no lines; zero lines is invalid input, not a 0% match.
    pub fn percentage(&self) -> Option<u32> {
        match_percentage(self.matched(), self.total())
    }

    pub fn must_have_ratio(&self) -> String {
        format!("{}/{}", self.must_have_matched, self.must_have_total)
    }

    pub fn nice_to_have_ratio(&self) -> String {
        format!("{}/{}", self.nice_to_have_matched, self.nice_to_have_total)
    }
}

/// `round(100 * matched / total)`, rounding halves away from zero.
pub fn match_percentage(matched: usize, total: usize) -> Option<u32> {
    if total == 0 || matched > total {
        return None;
    }
    Some((100.0 * matched as f64 / total as f64).round() as u32)
}

// ────────────────────────────────────────────────────────────────────────────
// Non-model evidence matcher
// ────────────────────────────────────────────────────────────────────────────

/// Words that never count as evidence on their own.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "at", "be", "by", "can", "candidate", "experience",
    "experienced", "for", "from", "good", "have", "in", "is", "it", "knowledge", "least",
    "must", "of", "on", "or", "our", "required", "requirement", "skills", "strong", "the", "to",
    "understanding", "with", "work", "working", "year", "years", "you", "your", "có", "và",
    "với", "kinh", "nghiệm", "năm", "kỹ", "năng", "trên", "biết", "sử", "dụng",
];

/// Fallback scorer: a line is matched when one of its significant tokens appears
/// in the evidence text. Deterministic; used where no model judgement is wanted.
pub struct LexicalEvidenceMatcher {
    evidence_tokens: HashSet<String>,
}

impl LexicalEvidenceMatcher {
    pub fn new(evidence: &str) -> Self {
        Self {
            evidence_tokens: tokenize(evidence).collect(),
        }
    }

    pub fn is_matched(&self, line: &JobRequirementLine) -> bool {
        significant_tokens(&line.text).any(|t| self.evidence_tokens.contains(&t))
    }

    pub fn tally(&self, lines: &[JobRequirementLine]) -> RequirementTally {
        let matched: Vec<bool> = lines.iter().map(|l| self.is_matched(l)).collect();
        RequirementTally::from_matches(lines, &matched)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#')))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn significant_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    tokenize(text).filter(|t| {
        t.chars().count() >= 2
            && !t.chars().all(|c| c.is_ascii_digit() || c == '+')
            && !STOPWORDS.contains(&t.as_str())
            && !NICE_TO_HAVE_MARKERS.contains(&t.as_str())
    })
}
