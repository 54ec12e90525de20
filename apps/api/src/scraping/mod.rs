//! Content fetching for job posting URLs.
//!
//! Two strategies:
//! - job board: a structured-data call to a known board's internal API, used
//!   when the URL carries a numeric job id.
//! - generic page: plain HTTP fetch with text extraction, usable for any URL.
//!
//! The job-board path is best-effort. Any failure there is logged as a
//! fallback event and the generic path runs instead; only a generic-path
//! failure reaches the caller.

pub mod job_board;
pub mod page;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("unexpected response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Generic page fetch: returns the page's content (possibly empty).
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Whether `fetch_text` hands back raw markup or already-extracted text.
    fn content_format(&self) -> ContentFormat;

    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError>;
}

/// A job board with a structured-data API.
#[async_trait]
pub trait JobBoardSource: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the URL belongs to this board at all.
    fn handles(&self, url: &Url) -> bool;

    /// Numeric job id embedded in a job-view URL, if any.
    fn job_id(&self, url: &Url) -> Option<String>;

    /// Fetches the posting and renders it as a labeled text block.
    async fn fetch_posting(&self, job_id: &str) -> Result<String, FetchError>;
}

/// Which path produced the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    JobBoard,
    GenericPage,
}

/// Shape of fetched content. Tag stripping only applies to `Markup`; plain
/// text may legitimately contain `<` and `>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    Markup,
    Text,
}

#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub text: String,
    pub strategy: FetchStrategy,
    pub format: ContentFormat,
}

enum Plan {
    JobBoard { job_id: String },
    Generic,
}

#[derive(Clone)]
pub struct ContentFetcher {
    page: Arc<dyn PageSource>,
    job_board: Option<Arc<dyn JobBoardSource>>,
}

impl ContentFetcher {
    pub fn new(page: Arc<dyn PageSource>) -> Self {
        Self {
            page,
            job_board: None,
        }
    }

    pub fn with_job_board(mut self, board: Arc<dyn JobBoardSource>) -> Self {
        self.job_board = Some(board);
        self
    }

    fn plan(&self, url: &Url) -> Plan {
        let Some(board) = self.job_board.as_ref().filter(|b| b.handles(url)) else {
            return Plan::Generic;
        };
        match board.job_id(url) {
            Some(job_id) => Plan::JobBoard { job_id },
            None => {
                info!(url = %url, board = board.name(), "No job id in board URL, using generic fetch");
                Plan::Generic
            }
        }
    }

    pub async fn fetch(&self, url: &Url) -> Result<FetchedContent, FetchError> {
        if let Plan::JobBoard { job_id } = self.plan(url) {
            if let Some(board) = &self.job_board {
                match board.fetch_posting(&job_id).await {
                    Ok(text) => {
                        info!(url = %url, board = board.name(), job_id = %job_id, "Fetched posting from job board API");
                        return Ok(FetchedContent {
                            text,
                            strategy: FetchStrategy::JobBoard,
                            format: ContentFormat::Text,
                        });
                    }
                    Err(e) => {
                        warn!(
                            url = %url,
                            board = board.name(),
                            job_id = %job_id,
                            error = %e,
                            "Job board fetch failed, falling back to generic fetch"
                        );
                    }
                }
            }
        }

        let text = self.page.fetch_text(url).await?;
        info!(url = %url, chars = text.chars().count(), "Fetched page");
        Ok(FetchedContent {
            text,
            strategy: FetchStrategy::GenericPage,
            format: self.page.content_format(),
        })
    }
}
