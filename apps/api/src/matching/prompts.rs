// Prompt template for the CV/JD match. Slots are filled by plain substitution,
// so both inputs must have been through `normalize_text` first.

use crate::llm_client::prompts::{BILINGUAL_RULE, JSON_OUTPUT_RULES};
use crate::matching::index::RetrievalContext;
use crate::matching::requirements::{JobRequirementLine, NICE_TO_HAVE_MARKERS};

/// Placeholders: {cv_text}, {jd_text}, {classified_lines}, {markers_en}, {markers_vi},
/// {json_rules}, {bilingual_rule}
pub const MATCH_PROMPT_TEMPLATE: &str = r#"You are JobMatchr, a professional AI recruiting assistant. Analyse the candidate CV (given as retrieved text excerpts) against the Job Description (JD). Each line of the JD is one separate criterion.

INPUT DATA
1. CV text:
{cv_text}

2. JD text (one criterion per line):
{jd_text}

TASKS: follow these steps in order.

STEP 1: PERSONAL INFORMATION
- Extract Name, Position (current or applied-for title, single title only) and Experience (total years of experience, the number only, e.g. "2 years").

STEP 2: REQUIREMENT MATCHING (one line = one point)
- Split the JD into its non-empty lines. Total requirements = number of non-empty lines.
- Classify every line as "Requirement" or "Nice-to-have". A line is Nice-to-have if and only if it contains (case-insensitive) any of:
  * English: {markers_en}
  * Vietnamese: {markers_vi}
  Every other line is a Requirement.
- The classification has already been applied and MUST be used as-is:
{classified_lines}
- For each line, decide whether the CV text contains evidence that satisfies it. A satisfied line counts as 1 point (Matched).
- Extract the technical keywords (hard skills) that appear in both CV and JD.
- percentage = round(100 * matched_lines / total_lines).
- must_have_ratio = "matched Requirement lines/total Requirement lines"; nice_to_have_ratio = "matched Nice-to-have lines/total Nice-to-have lines".
- comparison_table MUST contain exactly one row per JD line, in JD order.

STEP 3: BILINGUAL ASSESSMENT (English and Vietnamese)
- Write the general assessment, strengths, weaknesses (missing skills) and interview questions.
- {bilingual_rule}

STEP 4: RADAR SCORES (integers 1-10) WITH REASONING
Score strictly against these bands:
1. Hard Skills: 1-4 (many missing), 5-7 (basic), 8-10 (complete/advanced).
2. Soft Skills: 1-4 (sketchy), 5-7 (mentioned), 8-10 (backed by concrete examples).
3. Experience: 1-4 (little or unrelated), 5-7 (reasonable), 8-10 (exceeds the requirement).
4. Education: 1-4 (unrelated), 5-7 (relevant field), 8-10 (advanced degree or strong certifications).
5. Domain Knowledge: 1-4 (generic), 5-7 (understands the processes), 8-10 (deep business expertise).
Each dimension needs a justification in both English ("en") and Vietnamese ("vi").

OUTPUT FORMAT
{json_rules}

The object MUST have exactly this structure:
{
    "personal_info": {
        "name": "String",
        "position": "String (single title only, e.g. 'Backend Developer')",
        "experience": "String (single value only, e.g. '2 years')"
    },
    "matching_score": {
        "percentage": Integer,
        "explanation": "String (e.g. 'Matched 8/10 requirements')"
    },
    "requirements_breakdown": {
        "must_have_ratio": "String (e.g. '5/7')",
        "nice_to_have_ratio": "String (e.g. '3/3')"
    },
    "matched_keywords": ["String", "String"],
    "radar_chart": {
        "Hard Skills": Integer,
        "Soft Skills": Integer,
        "Experience": Integer,
        "Education": Integer,
        "Domain Knowledge": Integer
    },
    "radar_reasoning": {
        "Hard Skills": { "en": "English explanation", "vi": "Giải thích tiếng Việt" },
        "Soft Skills": { "en": "...", "vi": "..." },
        "Experience": { "en": "...", "vi": "..." },
        "Education": { "en": "...", "vi": "..." },
        "Domain Knowledge": { "en": "...", "vi": "..." }
    },
    "bilingual_content": {
        "general_assessment": { "en": "String", "vi": "String" },
        "comparison_table": [
            {
                "jd_requirement": "String (original JD line)",
                "cv_evidence": "String (evidence from the CV or 'Not found')",
                "status": "Matched" or "Not Matched"
            }
        ],
        "strengths": { "en": ["String"], "vi": ["String"] },
        "weaknesses_missing_skills": { "en": ["String"], "vi": ["String"] },
        "interview_questions": { "en": ["String"], "vi": ["String"] }
    }
}"#;

/// Renders the instruction payload. Pure function of its inputs.
pub fn build_match_prompt(
    context: &RetrievalContext,
    jd_text: &str,
    lines: &[JobRequirementLine],
) -> String {
    let (markers_en, markers_vi) = marker_lists();
    let classified_lines = lines
        .iter()
        .map(|l| format!("  {}. [{}] {}", l.number, l.kind.label(), l.text))
        .collect::<Vec<_>>()
        .join("\n");

    // Fixed slots first; user text last so it can never introduce a slot.
    MATCH_PROMPT_TEMPLATE
        .replace("{markers_en}", &markers_en)
        .replace("{markers_vi}", &markers_vi)
        .replace("{json_rules}", JSON_OUTPUT_RULES)
        .replace("{bilingual_rule}", BILINGUAL_RULE)
        .replace("{classified_lines}", &classified_lines)
        .replace("{jd_text}", jd_text)
        .replace("{cv_text}", &context.render())
}

/// English markers come first in `NICE_TO_HAVE_MARKERS`; the rest are Vietnamese.
fn marker_lists() -> (String, String) {
    let quote = |m: &&str| format!("\"{m}\"");
    let (en, vi): (Vec<&str>, Vec<&str>) = NICE_TO_HAVE_MARKERS
        .iter()
        .partition(|m| m.is_ascii());
    (
        en.iter().map(quote).collect::<Vec<_>>().join(", "),
        vi.iter().map(quote).collect::<Vec<_>>().join(", "),
    )
}
