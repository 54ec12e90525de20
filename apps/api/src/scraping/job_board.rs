//! LinkedIn job postings via the board's internal (voyager) API.
//!
//! The API is private: header values and response shape can change without
//! notice, and some deployments need a live session cookie. Every failure
//! here ends in the generic page fetch, never in a caller-visible error.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::page::DESKTOP_USER_AGENT;
use super::{FetchError, JobBoardSource};

pub const DEFAULT_HOST: &str = "linkedin.com";
pub const DEFAULT_API_BASE: &str = "https://www.linkedin.com/voyager/api/jobs/jobPostings";
pub const DEFAULT_CSRF_TOKEN: &str = "ajax:0000000000000000000";

const ACCEPT_NORMALIZED: &str = "application/vnd.linkedin.normalized+json+2.1";
const CLIENT_TRACK: &str = r#"{"clientVersion":"1.13.8031","mpVersion":"1.13.8031","osName":"web","timezoneOffset":0,"deviceFormFactor":"DESKTOP","mpName":"voyager-web"}"#;

// /jobs/view/1234567890 or /jobs/view/senior-engineer-at-acme-1234567890
static VIEW_PATH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/jobs/view/(?:[^/?#]*-)?(\d+)/?(?:$|[?#])").unwrap());
// /jobs/collections/recommended/?currentJobId=1234567890
static CURRENT_JOB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]currentJobId=(\d+)").unwrap());

#[derive(Debug, Clone)]
pub struct JobBoardSettings {
    /// Registrable domain of the board; subdomains match too.
    pub host: String,
    /// Job postings endpoint; the job id is appended as a path segment.
    pub api_base: String,
    pub csrf_token: String,
    /// Optional `li_at` session cookie value.
    pub session_cookie: Option<String>,
    pub timeout: Duration,
}

impl Default for JobBoardSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            csrf_token: DEFAULT_CSRF_TOKEN.to_string(),
            session_cookie: None,
            timeout: Duration::from_secs(20),
        }
    }
}

pub struct LinkedInJobBoard {
    client: reqwest::Client,
    settings: JobBoardSettings,
}

impl LinkedInJobBoard {
    pub fn new(settings: JobBoardSettings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_NORMALIZED));
        headers.insert("x-li-lang", HeaderValue::from_static("en_US"));
        headers.insert("x-li-track", HeaderValue::from_static(CLIENT_TRACK));
        headers.insert(
            "x-restli-protocol-version",
            HeaderValue::from_static("2.0.0"),
        );
        headers.insert("csrf-token", header_value(&settings.csrf_token)?);

        let mut cookie = format!("JSESSIONID=\"{}\"", settings.csrf_token);
        if let Some(session) = &settings.session_cookie {
            cookie.push_str(&format!("; li_at={session}"));
        }
        headers.insert(header::COOKIE, header_value(&cookie)?);

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(DESKTOP_USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, settings })
    }
}

fn header_value(value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value).map_err(|e| FetchError::MalformedResponse {
        url: "job board configuration".to_string(),
        reason: format!("invalid header value: {e}"),
    })
}

#[async_trait]
impl JobBoardSource for LinkedInJobBoard {
    fn name(&self) -> &str {
        "linkedin"
    }

    fn handles(&self, url: &Url) -> bool {
        let host = self.settings.host.as_str();
        url.host_str()
            .map(|h| h == host || h.ends_with(&format!(".{host}")))
            .unwrap_or(false)
    }

    fn job_id(&self, url: &Url) -> Option<String> {
        extract_job_id(url.as_str())
    }

    async fn fetch_posting(&self, job_id: &str) -> Result<String, FetchError> {
        let endpoint = format!("{}/{}", self.settings.api_base.trim_end_matches('/'), job_id);
        debug!(endpoint = %endpoint, "Calling job board API");

        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: endpoint,
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedResponse {
                url: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let data = body
            .get("data")
            .filter(|d| d.is_object())
            .ok_or_else(|| FetchError::MalformedResponse {
                url: endpoint.clone(),
                reason: "missing `data` object".to_string(),
            })?;

        Ok(compose_posting(data))
    }
}

/// Pulls the numeric job id out of either job-view URL shape.
pub fn extract_job_id(url: &str) -> Option<String> {
    VIEW_PATH_ID
        .captures(url)
        .or_else(|| CURRENT_JOB_ID.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Renders the posting as fixed labeled lines. Missing fields render empty.
fn compose_posting(data: &Value) -> String {
    let text = |pointer: &str| -> String {
        data.pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    let company = data
        .get("companyDetails")
        .and_then(|details| find_string(details, "name"))
        .unwrap_or_default();

    let industries = data
        .get("formattedIndustries")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    format!(
        "Title: {}\nCompany: {}\nDescription: {}\nRequirements: {}\nLocation: {}\nEmployment Type: {}\nExperience Level: {}\nIndustries: {}",
        text("/title"),
        company,
        text("/description/text"),
        text("/skillsDescription/text"),
        text("/formattedLocation"),
        text("/formattedEmploymentStatus"),
        text("/formattedExperienceLevel"),
        industries,
    )
}

/// Depth-first search for the first string value under `key`.
///
/// Company details are wrapped in versioned type keys that change between API
/// releases, so the name is looked up by key rather than by fixed path.
fn find_string(value: &Value, key: &str) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get(key) {
                return Some(s.clone());
            }
            map.values().find_map(|v| find_string(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_string(v, key)),
        _ => None,
    }
}
