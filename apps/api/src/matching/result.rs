//! MatchResult: the structured output contract handed back to callers.
//!
//! Field names (including the space-separated radar keys) are compatibility-bearing:
//! callers may store this value verbatim and the frontend reads it.
//! Free-text leaves stay plain strings; only the container shape is typed.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::matching::requirements::{match_percentage, JobRequirementLine, RequirementTally};

pub const RADAR_DIMENSIONS: [&str; 5] = [
    "Hard Skills",
    "Soft Skills",
    "Experience",
    "Education",
    "Domain Knowledge",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub personal_info: PersonalInfo,
    pub matching_score: MatchingScore,
    pub requirements_breakdown: RequirementsBreakdown,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    pub radar_chart: RadarChart,
    pub radar_reasoning: RadarReasoning,
    pub bilingual_content: BilingualContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub experience: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingScore {
    #[serde(deserialize_with = "lenient_int")]
    pub percentage: i64,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementsBreakdown {
    pub must_have_ratio: String,
    pub nice_to_have_ratio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarChart {
    #[serde(rename = "Hard Skills", deserialize_with = "lenient_int")]
    pub hard_skills: i64,
    #[serde(rename = "Soft Skills", deserialize_with = "lenient_int")]
    pub soft_skills: i64,
    #[serde(rename = "Experience", deserialize_with = "lenient_int")]
    pub experience: i64,
    #[serde(rename = "Education", deserialize_with = "lenient_int")]
    pub education: i64,
    #[serde(rename = "Domain Knowledge", deserialize_with = "lenient_int")]
    pub domain_knowledge: i64,
}

impl RadarChart {
    pub fn scores(&self) -> [(&'static str, i64); 5] {
        [
            (RADAR_DIMENSIONS[0], self.hard_skills),
            (RADAR_DIMENSIONS[1], self.soft_skills),
            (RADAR_DIMENSIONS[2], self.experience),
            (RADAR_DIMENSIONS[3], self.education),
            (RADAR_DIMENSIONS[4], self.domain_knowledge),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BilingualText {
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub vi: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BilingualList {
    #[serde(default)]
    pub en: Vec<String>,
    #[serde(default)]
    pub vi: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarReasoning {
    #[serde(rename = "Hard Skills")]
    pub hard_skills: BilingualText,
    #[serde(rename = "Soft Skills")]
    pub soft_skills: BilingualText,
    #[serde(rename = "Experience")]
    pub experience: BilingualText,
    #[serde(rename = "Education")]
    pub education: BilingualText,
    #[serde(rename = "Domain Knowledge")]
    pub domain_knowledge: BilingualText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BilingualContent {
    pub general_assessment: BilingualText,
    #[serde(default)]
    pub comparison_table: Vec<ComparisonRow>,
    #[serde(default)]
    pub strengths: BilingualList,
    #[serde(default)]
    pub weaknesses_missing_skills: BilingualList,
    #[serde(default)]
    pub interview_questions: BilingualList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub jd_requirement: String,
    #[serde(default)]
    pub cv_evidence: String,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    #[serde(alias = "matched", alias = "MATCHED")]
    Matched,
    #[serde(
        rename = "Not Matched",
        alias = "Not matched",
        alias = "not matched",
        alias = "NotMatched"
    )]
    NotMatched,
}

// ────────────────────────────────────────────────────────────────────────────
// Validation and reconciliation
// ────────────────────────────────────────────────────────────────────────────

impl MatchResult {
    /// Structural checks the type system cannot express.
    pub fn validate(&self) -> Result<(), String> {
        let pct = self.matching_score.percentage;
        if !(0..=100).contains(&pct) {
            return Err(format!("matching_score.percentage {pct} is outside 0..=100"));
        }
        for (name, score) in self.radar_chart.scores() {
            if !(1..=10).contains(&score) {
                return Err(format!("radar_chart.{name} = {score} is outside 1..=10"));
            }
        }
        parse_ratio(&self.requirements_breakdown.must_have_ratio)
            .map_err(|e| format!("must_have_ratio: {e}"))?;
        parse_ratio(&self.requirements_breakdown.nice_to_have_ratio)
            .map_err(|e| format!("nice_to_have_ratio: {e}"))?;
        Ok(())
    }

    /// Makes score and ratios agree with the classified requirement lines.
    ///
    /// With exactly one table row per line, everything is recomputed from the row
    /// statuses. Otherwise the model's ratios must have the lexical denominators and
    /// the percentage is recomputed from their numerators. Returns whether anything
    /// was corrected; an `Err` means the figures cannot describe this JD.
    pub fn reconcile(&mut self, lines: &[JobRequirementLine]) -> Result<bool, String> {
        if lines.is_empty() {
            return Ok(false);
        }
        let rows = &self.bilingual_content.comparison_table;
        if rows.len() != lines.len() {
            if !rows.is_empty() {
                warn!(
                    "comparison_table has {} rows for {} requirement lines; checking ratios instead",
                    rows.len(),
                    lines.len()
                );
            }
            return self.reconcile_from_ratios(lines);
        }

        let matched: Vec<bool> = rows.iter().map(|r| r.status == MatchStatus::Matched).collect();
        let tally = RequirementTally::from_matches(lines, &matched);
        let Some(percentage) = tally.percentage() else {
            return Ok(false);
        };
        let percentage = i64::from(percentage);
        let must = tally.must_have_ratio();
        let nice = tally.nice_to_have_ratio();

        let breakdown = &self.requirements_breakdown;
        let changed = self.matching_score.percentage != percentage
            || breakdown.must_have_ratio != must
            || breakdown.nice_to_have_ratio != nice;
        if changed {
            warn!(
                "model score {}% ({} / {}) disagrees with table; using {}% ({} / {})",
                self.matching_score.percentage,
                breakdown.must_have_ratio,
                breakdown.nice_to_have_ratio,
                percentage,
                must,
                nice
            );
            self.matching_score.percentage = percentage;
            self.requirements_breakdown.must_have_ratio = must;
            self.requirements_breakdown.nice_to_have_ratio = nice;
        }
        Ok(changed)
    }

    fn reconcile_from_ratios(&mut self, lines: &[JobRequirementLine]) -> Result<bool, String> {
        let expected = RequirementTally::from_matches(lines, &vec![false; lines.len()]);
        let (must_m, must_n) = parse_ratio(&self.requirements_breakdown.must_have_ratio)?;
        let (nice_m, nice_n) = parse_ratio(&self.requirements_breakdown.nice_to_have_ratio)?;
        if must_n as usize != expected.must_have_total
            || nice_n as usize != expected.nice_to_have_total
        {
            return Err(format!(
                "ratios {must_m}/{must_n} and {nice_m}/{nice_n} do not match {} required and {} nice-to-have lines",
                expected.must_have_total, expected.nice_to_have_total
            ));
        }

        let matched = (must_m + nice_m) as usize;
        let Some(percentage) = match_percentage(matched, expected.total()) else {
            return Ok(false);
        };
        let percentage = i64::from(percentage);
        if self.matching_score.percentage == percentage {
            return Ok(false);
        }
        warn!(
            "model score {}% disagrees with its ratios ({}/{} lines); using {}%",
            self.matching_score.percentage,
            matched,
            expected.total(),
            percentage
        );
        self.matching_score.percentage = percentage;
        Ok(true)
    }
}

/// Parses `"m/n"` with `0 <= m <= n`.
pub fn parse_ratio(ratio: &str) -> Result<(u32, u32), String> {
    let (m, n) = ratio
        .trim()
        .split_once('/')
        .ok_or_else(|| format!("'{ratio}' is not of the form m/n"))?;
    let m: u32 = m
        .trim()
        .parse()
        .map_err(|_| format!("'{ratio}' has a non-integer numerator"))?;
    let n: u32 = n
        .trim()
        .parse()
        .map_err(|_| format!("'{ratio}' has a non-integer denominator"))?;
    if m > n {
        return Err(format!("'{ratio}' has numerator above denominator"));
    }
    Ok((m, n))
}

/// Accepts `85`, `85.0` or `"85"`; rejects fractional values.
fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    let as_float = match &value {
        serde_json::Value::Number(n) => n.as_i64().map(|i| i as f64).or_else(|| n.as_f64()),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match as_float {
        Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
        _ => Err(D::Error::custom(format!("expected an integer, got {value}"))),
    }
}

/// Models sometimes emit `"experience": 5`; keep it as text.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
