use std::time::Duration;

use anyhow::{Context, Result};

use crate::extraction::extractor::ExtractionProfile;
use crate::scraping::job_board::{JobBoardSettings, DEFAULT_API_BASE, DEFAULT_CSRF_TOKEN, DEFAULT_HOST};

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional so the service can boot without it; extraction then reports
    /// a configuration error per request.
    pub anthropic_api_key: Option<String>,
    /// Overrides the Anthropic Messages endpoint (proxies, gateways).
    pub anthropic_api_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub extraction_profile: ExtractionProfile,
    pub fetch_timeout: Duration,
    pub model_timeout: Duration,
    pub job_board_enabled: bool,
    pub job_board_host: String,
    pub job_board_api_base: String,
    pub job_board_csrf_token: String,
    pub job_board_session_cookie: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_api_url: None,
            port: 8080,
            rust_log: "info".to_string(),
            extraction_profile: ExtractionProfile::default(),
            fetch_timeout: Duration::from_secs(20),
            model_timeout: Duration::from_secs(60),
            job_board_enabled: true,
            job_board_host: DEFAULT_HOST.to_string(),
            job_board_api_base: DEFAULT_API_BASE.to_string(),
            job_board_csrf_token: DEFAULT_CSRF_TOKEN.to_string(),
            job_board_session_cookie: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_api_url: get("ANTHROPIC_API_URL"),
            port: get("PORT")
                .map(|v| v.trim().parse::<u16>())
                .transpose()
                .context("PORT must be a valid port number")?
                .unwrap_or(defaults.port),
            rust_log: get("RUST_LOG").unwrap_or(defaults.rust_log),
            extraction_profile: get("EXTRACTION_PROFILE")
                .map(|v| v.parse::<ExtractionProfile>())
                .transpose()
                .map_err(anyhow::Error::msg)
                .context("EXTRACTION_PROFILE is invalid")?
                .unwrap_or(defaults.extraction_profile),
            fetch_timeout: seconds(get("FETCH_TIMEOUT_SECS"), "FETCH_TIMEOUT_SECS")?
                .unwrap_or(defaults.fetch_timeout),
            model_timeout: seconds(get("MODEL_TIMEOUT_SECS"), "MODEL_TIMEOUT_SECS")?
                .unwrap_or(defaults.model_timeout),
            job_board_enabled: get("JOB_BOARD_ENABLED")
                .map(|v| parse_bool(&v))
                .transpose()
                .context("JOB_BOARD_ENABLED must be true or false")?
                .unwrap_or(defaults.job_board_enabled),
            job_board_host: get("JOB_BOARD_HOST").unwrap_or(defaults.job_board_host),
            job_board_api_base: get("JOB_BOARD_API_BASE").unwrap_or(defaults.job_board_api_base),
            job_board_csrf_token: get("JOB_BOARD_CSRF_TOKEN")
                .unwrap_or(defaults.job_board_csrf_token),
            job_board_session_cookie: get("JOB_BOARD_SESSION_COOKIE"),
        })
    }

    pub fn job_board_settings(&self) -> JobBoardSettings {
        JobBoardSettings {
            host: self.job_board_host.clone(),
            api_base: self.job_board_api_base.clone(),
            csrf_token: self.job_board_csrf_token.clone(),
            session_cookie: self.job_board_session_cookie.clone(),
            timeout: self.fetch_timeout,
        }
    }
}

fn seconds(value: Option<String>, key: &str) -> Result<Option<Duration>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let secs = value
        .trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of seconds"))?;
    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
    Ok(Some(Duration::from_secs(secs)))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognized boolean '{other}'"),
    }
}
