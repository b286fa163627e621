//! Text normalizer: neutralises curly braces before templating.
//!
//! The prompt template shows the output schema with literal braces and fills its
//! slots by placeholder substitution. User text containing `{`/`}` could either
//! collide with a placeholder or be mistaken for schema, so both the CV text and
//! the job description pass through [`normalize_text`] before any rendering.
//! Nothing else (case, whitespace) is touched.

pub fn normalize_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '{' => '(',
            '}' => ')',
            other => other,
        })
        .collect()
}
