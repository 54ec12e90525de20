//! The extracted job posting and its date fields.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel used by postings that want applications "as soon as possible".
pub const ASAP: &str = "ASAP";

/// A deadline or start date: either a calendar date or the `ASAP` sentinel.
///
/// Serialized as `"ASAP"` or `"YYYY-MM-DD"`; free text never survives parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DateValue {
    Asap,
    Date(NaiveDate),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is neither an ISO-8601 date nor \"ASAP\"")]
pub struct InvalidDateValue(pub String);

impl FromStr for DateValue {
    type Err = InvalidDateValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(ASAP) {
            return Ok(DateValue::Asap);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(DateValue::Date(date));
        }
        // Models sometimes answer with a full timestamp; keep only the date.
        if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(DateValue::Date(ts.date_naive()));
        }
        Err(InvalidDateValue(s.to_string()))
    }
}

impl TryFrom<String> for DateValue {
    type Error = InvalidDateValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateValue> for String {
    fn from(value: DateValue) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Asap => f.write_str(ASAP),
            DateValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Structured fields extracted from a single job posting.
///
/// Built fresh per extraction and handed to the caller as-is. `url` always
/// holds a usable URL: the model's value when it gave one, otherwise the URL
/// the caller asked about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPostingRecord {
    pub position: String,
    pub company: String,
    /// One-sentence summary of the role.
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateValue>,
}

impl JobPostingRecord {
    /// Replaces a missing or blank `url` with `original_url`.
    pub fn with_url_fallback(mut self, original_url: &str) -> Self {
        if self.url.trim().is_empty() {
            self.url = original_url.to_string();
        }
        self
    }
}
