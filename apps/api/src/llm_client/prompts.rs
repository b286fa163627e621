// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting output-format rules.

/// Output-format rules appended to every prompt that expects a JSON object back.
pub const JSON_OUTPUT_RULES: &str = "\
    Return exactly ONE JSON object and nothing else. \
    Do NOT wrap it in markdown code fences (no ```json). \
    Do NOT put a comma after the last element of any array or object (NO TRAILING COMMAS). \
    Make sure every opening brace and bracket has a matching closing one.";

/// Reminder that both languages are required wherever `en`/`vi` keys appear.
pub const BILINGUAL_RULE: &str = "\
    Every field with `en` and `vi` keys MUST be filled in both languages: \
    write the English text first, then a faithful Vietnamese translation.";
