//! Generic page fetch: reqwest for HTTP, scraper for text extraction.
//!
//! No JavaScript rendering; pages that build their content client-side come
//! back thin or empty, which the rest of the pipeline tolerates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use scraper::{Html, Node, Selector};
use tracing::{debug, warn};
use url::Url;

use super::{ContentFormat, FetchError, PageSource};

/// Browser-like User-Agent; many career sites reject default client strings.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 5;

/// Elements whose text is never visible content.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,text/plain;q=0.8,*/*;q=0.5",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DESKTOP_USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    /// Markup is reduced to visible text here, so callers never see tags.
    fn content_format(&self) -> ContentFormat {
        ContentFormat::Text
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if response.url() != url {
            debug!(from = %url, to = %response.url(), "Followed redirect");
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        if content_type.contains("html") || content_type.contains("xml") {
            Ok(extract_visible_text(&body))
        } else if content_type.starts_with("text/") || content_type.contains("json") {
            Ok(body)
        } else {
            warn!(url = %url, content_type = %content_type, "Unsupported content type, treating page as empty");
            Ok(String::new())
        }
    }
}

/// Collects the text of `body` (or the whole document when there is no body),
/// skipping script/style/noscript/template subtrees.
pub fn extract_visible_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut parts = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    parts.join(" ")
}
