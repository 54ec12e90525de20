//! Schema contract for extracted job postings.
//!
//! `describe()` renders the field list that gets embedded in prompts; it is a
//! pure function of the variant so identical requests produce identical
//! prompts. `validate()` turns a model-produced JSON object into a
//! `JobPostingRecord`, reporting every problem it finds rather than only the
//! first.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::extraction::record::{DateValue, JobPostingRecord};

/// Which fields the model is asked to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// position, company, description, keywords, url
    Core,
    /// Core plus the optional `deadline` and `start_date`.
    #[default]
    WithDates,
}

struct FieldSpec {
    name: &'static str,
    type_label: &'static str,
    required: bool,
    note: &'static str,
}

const CORE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "position",
        type_label: "string",
        required: true,
        note: "the job title",
    },
    FieldSpec {
        name: "company",
        type_label: "string",
        required: true,
        note: "the hiring company's name",
    },
    FieldSpec {
        name: "description",
        type_label: "string",
        required: true,
        note: "a one-sentence summary of the role",
    },
    FieldSpec {
        name: "keywords",
        type_label: "array<string>",
        required: true,
        note: "5-12 key skills, technologies or requirements",
    },
    FieldSpec {
        name: "url",
        type_label: "string (URL format)",
        required: true,
        note: "the posting's URL",
    },
];

const DATE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "deadline",
        type_label: "string",
        required: false,
        note: "application deadline as YYYY-MM-DD, or \"ASAP\"",
    },
    FieldSpec {
        name: "start_date",
        type_label: "string",
        required: false,
        note: "start date as YYYY-MM-DD, or \"ASAP\"",
    },
];

/// One problem found while validating a candidate object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum FieldIssue {
    NotAnObject { found: String },
    Missing { field: String },
    Mistyped { field: String, expected: String, found: String },
    Invalid { field: String, reason: String },
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldIssue::NotAnObject { found } => write!(f, "expected a JSON object, found {found}"),
            FieldIssue::Missing { field } => write!(f, "`{field}` is missing"),
            FieldIssue::Mistyped {
                field,
                expected,
                found,
            } => write!(f, "`{field}` should be {expected}, found {found}"),
            FieldIssue::Invalid { field, reason } => write!(f, "`{field}` is invalid: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("schema validation failed: {}", join_issues(.issues))]
pub struct SchemaValidationError {
    pub issues: Vec<FieldIssue>,
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaContract {
    variant: SchemaVariant,
}

impl SchemaContract {
    pub fn new(variant: SchemaVariant) -> Self {
        Self { variant }
    }

    fn fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        let dates: &'static [FieldSpec] = match self.variant {
            SchemaVariant::Core => &[],
            SchemaVariant::WithDates => DATE_FIELDS,
        };
        CORE_FIELDS.iter().chain(dates.iter())
    }

    /// Renders the schema as text for prompt injection.
    pub fn describe(&self) -> String {
        let mut out = String::from(
            "Return a JSON object with these EXACT field names (no extra fields):\n{\n",
        );
        let fields: Vec<_> = self.fields().collect();
        for (i, field) in fields.iter().enumerate() {
            let presence = if field.required { "required" } else { "optional" };
            let comma = if i + 1 < fields.len() { "," } else { "" };
            out.push_str(&format!(
                "  \"{}\": {}{}  // {}, {}\n",
                field.name, field.type_label, comma, presence, field.note
            ));
        }
        out.push('}');
        if self.variant == SchemaVariant::WithDates {
            out.push_str(
                "\nOmit an optional field (or set it to null) when the posting does not state it.",
            );
        }
        out
    }

    /// Validates a candidate JSON value and builds a record from it.
    ///
    /// A missing or empty `url` is accepted and left empty; the caller decides
    /// what to put there.
    pub fn validate(&self, candidate: &Value) -> Result<JobPostingRecord, SchemaValidationError> {
        let Some(obj) = candidate.as_object() else {
            return Err(SchemaValidationError {
                issues: vec![FieldIssue::NotAnObject {
                    found: type_name(candidate).to_string(),
                }],
            });
        };

        let mut issues = Vec::new();

        let position = required_string(obj, "position", &mut issues);
        let company = required_string(obj, "company", &mut issues);
        let description = required_string(obj, "description", &mut issues);
        let keywords = string_array(obj, "keywords", &mut issues);
        let url = url_field(obj, &mut issues);

        let (deadline, start_date) = match self.variant {
            SchemaVariant::Core => (None, None),
            SchemaVariant::WithDates => (
                date_field(obj, "deadline", &mut issues),
                date_field(obj, "start_date", &mut issues),
            ),
        };

        if !issues.is_empty() {
            return Err(SchemaValidationError { issues });
        }

        Ok(JobPostingRecord {
            position: position.unwrap_or_default(),
            company: company.unwrap_or_default(),
            description: description.unwrap_or_default(),
            keywords: keywords.unwrap_or_default(),
            url: url.unwrap_or_default(),
            deadline,
            start_date,
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required_string(
    obj: &Map<String, Value>,
    field: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => {
            issues.push(FieldIssue::Missing {
                field: field.to_string(),
            });
            None
        }
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(other) => {
            issues.push(FieldIssue::Mistyped {
                field: field.to_string(),
                expected: "string".to_string(),
                found: type_name(other).to_string(),
            });
            None
        }
    }
}

fn string_array(
    obj: &Map<String, Value>,
    field: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<Vec<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => {
            issues.push(FieldIssue::Missing {
                field: field.to_string(),
            });
            None
        }
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => out.push(s.trim().to_string()),
                    other => issues.push(FieldIssue::Mistyped {
                        field: format!("{field}[{i}]"),
                        expected: "string".to_string(),
                        found: type_name(other).to_string(),
                    }),
                }
            }
            Some(out)
        }
        Some(other) => {
            issues.push(FieldIssue::Mistyped {
                field: field.to_string(),
                expected: "array<string>".to_string(),
                found: type_name(other).to_string(),
            });
            None
        }
    }
}

fn url_field(obj: &Map<String, Value>, issues: &mut Vec<FieldIssue>) -> Option<String> {
    match obj.get("url") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => {
            let s = s.trim();
            match Url::parse(s) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Some(s.to_string()),
                Ok(parsed) => {
                    issues.push(FieldIssue::Invalid {
                        field: "url".to_string(),
                        reason: format!("unsupported scheme '{}'", parsed.scheme()),
                    });
                    None
                }
                Err(e) => {
                    issues.push(FieldIssue::Invalid {
                        field: "url".to_string(),
                        reason: e.to_string(),
                    });
                    None
                }
            }
        }
        Some(other) => {
            issues.push(FieldIssue::Mistyped {
                field: "url".to_string(),
                expected: "string".to_string(),
                found: type_name(other).to_string(),
            });
            None
        }
    }
}

fn date_field(
    obj: &Map<String, Value>,
    field: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<DateValue> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => match s.parse::<DateValue>() {
            Ok(date) => Some(date),
            Err(e) => {
                issues.push(FieldIssue::Invalid {
                    field: field.to_string(),
                    reason: e.to_string(),
                });
                None
            }
        },
        Some(other) => {
            issues.push(FieldIssue::Mistyped {
                field: field.to_string(),
                expected: "string".to_string(),
                found: type_name(other).to_string(),
            });
            None
        }
    }
}
