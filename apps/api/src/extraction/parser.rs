//! Result parser: turns raw model output into a `JobPostingRecord`.
//!
//! Two tiers:
//! 1. Strict: find a JSON object in the output and validate it against the
//!    schema contract.
//! 2. Fallback: pull `"field": "value"` pairs out of the raw text with regexes
//!    and fill anything missing with fixed defaults.
//!
//! `parse` never fails. A bad document degrades to the fallback tier instead
//! of failing the request.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::extraction::record::JobPostingRecord;
use crate::extraction::schema::{SchemaContract, SchemaValidationError};

pub const DEFAULT_POSITION: &str = "Unknown Position";
pub const DEFAULT_COMPANY: &str = "Unknown Company";
pub const DEFAULT_DESCRIPTION: &str = "No description available";

static POSITION_FIELD: LazyLock<Regex> = LazyLock::new(|| field_pattern("position"));
static COMPANY_FIELD: LazyLock<Regex> = LazyLock::new(|| field_pattern("company"));
static DESCRIPTION_FIELD: LazyLock<Regex> = LazyLock::new(|| field_pattern("description"));

fn field_pattern(name: &str) -> Regex {
    // "name": "value", tolerating escaped quotes inside the value.
    Regex::new(&format!(r#""{name}"\s*:\s*"((?:[^"\\]|\\.)*)""#)).unwrap()
}

/// Which tier produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseTier {
    Strict,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct ParsedResult {
    pub record: JobPostingRecord,
    pub tier: ParseTier,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultParser {
    schema: SchemaContract,
}

#[derive(Debug, thiserror::Error)]
enum StrictError {
    #[error("no JSON object found in model output")]
    NoJsonObject,
    #[error(transparent)]
    Schema(#[from] SchemaValidationError),
}

impl ResultParser {
    pub fn new(schema: SchemaContract) -> Self {
        Self { schema }
    }

    /// Parses model output, guaranteeing a record whose `url` is usable.
    /// The returned tier says which path produced it.
    pub fn parse(&self, raw_text: &str, original_url: &str) -> ParsedResult {
        match self.parse_strict(raw_text) {
            Ok(record) => {
                debug!("Strict parse succeeded for {}", original_url);
                ParsedResult {
                    record: record.with_url_fallback(original_url),
                    tier: ParseTier::Strict,
                }
            }
            Err(e) => {
                warn!(url = %original_url, error = %e, "Strict parse failed, using regex fallback");
                ParsedResult {
                    record: parse_fallback(raw_text, original_url),
                    tier: ParseTier::Fallback,
                }
            }
        }
    }

    fn parse_strict(&self, raw_text: &str) -> Result<JobPostingRecord, StrictError> {
        let candidate = locate_json_object(raw_text).ok_or(StrictError::NoJsonObject)?;
        Ok(self.schema.validate(&candidate)?)
    }
}

/// Regex tier. Keywords are not recovered here; they come back empty.
fn parse_fallback(raw_text: &str, original_url: &str) -> JobPostingRecord {
    JobPostingRecord {
        position: capture_field(&POSITION_FIELD, raw_text)
            .unwrap_or_else(|| DEFAULT_POSITION.to_string()),
        company: capture_field(&COMPANY_FIELD, raw_text)
            .unwrap_or_else(|| DEFAULT_COMPANY.to_string()),
        description: capture_field(&DESCRIPTION_FIELD, raw_text)
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        keywords: Vec::new(),
        url: original_url.to_string(),
        deadline: None,
        start_date: None,
    }
}

fn capture_field(pattern: &Regex, text: &str) -> Option<String> {
    let raw = pattern.captures(text)?.get(1)?.as_str();
    // Decode JSON escapes when they are well formed; keep the raw slice otherwise.
    let value = serde_json::from_str::<String>(&format!("\"{raw}\""))
        .unwrap_or_else(|_| raw.to_string());
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Finds the first JSON object in model output.
///
/// Handles bare JSON, JSON inside code fences, and JSON surrounded by prose.
fn locate_json_object(text: &str) -> Option<Value> {
    let text = strip_json_fences(text);

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    // Try each '{' in turn and let serde stop at the end of the first complete value.
    for (start, _) in text.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(value @ Value::Object(_))) = stream.next() {
            return Some(value);
        }
    }
    None
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::record::DateValue;
    use crate::extraction::schema::SchemaVariant;

    fn parser() -> ResultParser {
        ResultParser::new(SchemaContract::new(SchemaVariant::WithDates))
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strict_tier_fills_empty_url() {
        let raw = r#"{"position":"Engineer","company":"Acme","description":"Build things","keywords":["Go","SQL"],"url":""}"#;
        let result = parser().parse(raw, "https://x.test/job/1");
        assert_eq!(result.tier, ParseTier::Strict);
        assert_eq!(result.record.url, "https://x.test/job/1");
        assert_eq!(result.record.keywords, vec!["Go", "SQL"]);
        assert_eq!(result.record.position, "Engineer");
    }

    #[test]
    fn test_strict_tier_keeps_model_url() {
        let raw = r#"{"position":"E","company":"A","description":"D","keywords":[],"url":"https://acme.test/careers/9"}"#;
        let record = parser().parse(raw, "https://x.test/job/1").record;
        assert_eq!(record.url, "https://acme.test/careers/9");
    }

    #[test]
    fn test_strict_tier_fills_missing_url() {
        let raw = r#"{"position":"E","company":"A","description":"D","keywords":[]}"#;
        let record = parser().parse(raw, "https://x.test/job/3").record;
        assert_eq!(record.url, "https://x.test/job/3");
    }

    #[test]
    fn test_strict_tier_reads_fenced_json_with_prose() {
        let raw = "Here is the result:\n```json\n{\"position\":\"E\",\"company\":\"A\",\"description\":\"D\",\"keywords\":[\"Rust\"],\"deadline\":\"ASAP\"}\n```\nLet me know!";
        let result = parser().parse(raw, "https://x.test/job/4");
        assert_eq!(result.tier, ParseTier::Strict);
        assert_eq!(result.record.deadline, Some(DateValue::Asap));
    }

    #[test]
    fn test_strict_tier_reads_json_after_prose() {
        let raw = r#"Sure! {"position":"E","company":"A","description":"D {x}","keywords":[]} trailing"#;
        let result = parser().parse(raw, "https://x.test/job/5");
        assert_eq!(result.tier, ParseTier::Strict);
        assert_eq!(result.record.description, "D {x}");
    }

    #[test]
    fn test_fallback_tier_scenario() {
        let raw = r#"garbage not json "position": "Eng" "company": "Acme""#;
        let result = parser().parse(raw, "https://x.test/job/2");
        assert_eq!(result.tier, ParseTier::Fallback);
        let record = result.record;
        assert_eq!(record.position, "Eng");
        assert_eq!(record.company, "Acme");
        assert_eq!(record.description, DEFAULT_DESCRIPTION);
        assert!(record.keywords.is_empty());
        assert_eq!(record.url, "https://x.test/job/2");
    }

    #[test]
    fn test_fallback_on_wrong_schema_json() {
        let raw = r#"{"position": "Eng", "company": 5, "url": "https://model.test/x"}"#;
        let result = parser().parse(raw, "https://x.test/job/6");
        assert_eq!(result.tier, ParseTier::Fallback);
        assert_eq!(result.record.position, "Eng");
        assert_eq!(result.record.company, DEFAULT_COMPANY);
        // The fallback tier always uses the caller's URL.
        assert_eq!(result.record.url, "https://x.test/job/6");
    }

    #[test]
    fn test_fallback_decodes_escaped_quotes() {
        let raw = r#"oops "position": "Staff \"Platform\" Engineer""#;
        let record = parser().parse(raw, "https://x.test/job/7").record;
        assert_eq!(record.position, "Staff \"Platform\" Engineer");
    }

    #[test]
    fn test_never_fails_on_odd_inputs() {
        let inputs = [
            "",
            "   ",
            "not json at all",
            "{",
            "}{",
            "[1,2,3]",
            "null",
            "```json\n```",
            r#"{"position": null}"#,
            "\u{0}\u{1}binary",
        ];
        for raw in inputs {
            let record = parser().parse(raw, "https://x.test/job/8").record;
            assert_eq!(record.url, "https://x.test/job/8", "input {raw:?}");
            assert!(!record.position.is_empty());
            assert!(!record.company.is_empty());
            assert!(!record.description.is_empty());
        }
    }

    #[test]
    fn test_empty_string_uses_all_defaults() {
        let record = parser().parse("", "https://x.test/job/9").record;
        assert_eq!(record.position, DEFAULT_POSITION);
        assert_eq!(record.company, DEFAULT_COMPANY);
        assert_eq!(record.description, DEFAULT_DESCRIPTION);
        assert!(record.keywords.is_empty());
        assert!(record.deadline.is_none());
    }
}
