//! Output sanitizer/repairer: recovers a `MatchResult` from near-valid model text.
//!
//! Two-stage decode:
//! 1. tolerant extraction: keep only the span from the first `{` to the last `}`,
//!    then drop any comma directly followed (ignoring whitespace) by `]` or `}`;
//! 2. strict decode: deserialize into the typed schema and validate it.
//!
//! Anything that still fails is `MalformedOutput`; partial results are never returned.

use std::sync::LazyLock;

use regex::Regex;

use crate::matching::error::AnalysisError;
use crate::matching::result::MatchResult;

/// A comma followed, after optional whitespace, by a closing bracket.
const TRAILING_COMMA_PATTERN: &str = r",\s*([\]}])";

static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(TRAILING_COMMA_PATTERN)
        .expect("unreachable error: failed to compile trailing comma pattern")
});

/// Stage 1a: the text between the first `{` and the last `}` inclusive.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Stage 1b: removes trailing commas before closing brackets.
pub fn strip_trailing_commas(json: &str) -> String {
    TRAILING_COMMA.replace_all(json, "$1").into_owned()
}

/// Extracts and repairs the JSON object embedded in `raw`.
pub fn repair(raw: &str) -> Result<String, AnalysisError> {
    let object = extract_json_object(raw).ok_or_else(|| {
        AnalysisError::MalformedOutput("response contains no JSON object".to_string())
    })?;
    Ok(strip_trailing_commas(object))
}

/// Full decode: repair, deserialize, validate.
pub fn parse_match_result(raw: &str) -> Result<MatchResult, AnalysisError> {
    let repaired = repair(raw)?;
    let result: MatchResult = serde_json::from_str(&repaired)
        .map_err(|e| AnalysisError::MalformedOutput(format!("JSON parse failed: {e}")))?;
    result.validate().map_err(AnalysisError::MalformedOutput)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::testing::sample_result_json;
    use proptest::prelude::*;
    use serde_json::Value;

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z ]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn json_object() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-z]{1,6}", json_value(), 0..5)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    /// Puts a comma before each closing bracket whose `mask` bit is set.
    fn inject_trailing_commas(json: &str, mask: &[bool]) -> String {
        let mut out = String::with_capacity(json.len() + mask.len());
        let mut closers = 0;
        for c in json.chars() {
            if c == ']' || c == '}' {
                if mask[closers % mask.len()] {
                    out.push(',');
                }
                closers += 1;
            }
            out.push(c);
        }
        out
    }

    #[test]
    fn test_trailing_comma_pattern_compiles() {
        assert!(Regex::new(TRAILING_COMMA_PATTERN).is_ok());
        assert_eq!(strip_trailing_commas("[1,]"), "[1]");
    }

    #[test]
    fn test_extracts_object_from_prose_and_fences() {
        let raw = "Sure! Here is the analysis:\n```json\n{\"a\": {\"b\": 1}}\n```\nHope this helps.";
        assert_eq!(extract_json_object(raw), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_no_braces_is_none() {
        assert_eq!(extract_json_object("I cannot help with that."), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_strips_trailing_commas() {
        let fixed = strip_trailing_commas("{\"a\": [1, 2, ], \"b\": {\"c\": 3,\n\t}, }");
        assert_eq!(fixed, "{\"a\": [1, 2], \"b\": {\"c\": 3}}");
    }

    #[test]
    fn test_trailing_comma_repair_matches_clean_parse() {
        let clean = sample_result_json(85, "3/4", "1/1");
        let dirty = clean
            .replace("\"Domain Knowledge\": 7\n", "\"Domain Knowledge\": 7,\n")
            .replace("\"Q2 vi\"]", "\"Q2 vi\",\n]");
        assert_ne!(clean, dirty);
        let a: Value = serde_json::from_str(&repair(&clean).unwrap()).unwrap();
        let b: Value = serde_json::from_str(&repair(&dirty).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_interior_commas_survive() {
        let json = "{\"list\": [\"a, b\", \"c\"]}";
        assert_eq!(strip_trailing_commas(json), json);
    }

    #[test]
    fn test_parse_fenced_result() {
        let raw = format!("```json\n{}\n```", sample_result_json(85, "3/4", "1/1"));
        let result = parse_match_result(&raw).unwrap();
        assert_eq!(result.matching_score.percentage, 85);
    }

    #[test]
    fn test_unrepairable_output_is_malformed() {
        let err = parse_match_result("{\"personal_info\": ").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedOutput(_)));

        let err = parse_match_result("no json at all").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedOutput(_)));

        let err = parse_match_result("{\"unexpected\": true}").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedOutput(_)));
    }

    #[test]
    fn test_invalid_ranges_are_malformed() {
        let raw = sample_result_json(140, "3/4", "1/1");
        let err = parse_match_result(&raw).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedOutput(m) if m.contains("percentage")));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn repair_restores_any_object(
            value in json_object(),
            mask in prop::collection::vec(any::<bool>(), 1..32),
            pretty in any::<bool>(),
        ) {
            let clean = if pretty {
                serde_json::to_string_pretty(&value).unwrap()
            } else {
                serde_json::to_string(&value).unwrap()
            };
            let dirty = inject_trailing_commas(&clean, &mask);
            let repaired: Value = serde_json::from_str(&repair(&dirty).unwrap()).unwrap();
            prop_assert_eq!(repaired, value);
        }
    }
}
