//! Job extraction: orchestrates the full pipeline for one URL.
//!
//! Flow: validate URL → fetch (job board or generic page) → normalize →
//!       build prompt → model call → parse (strict, then regex fallback).
//!
//! Only the steps before parsing can fail. Nothing here retries: a second
//! paid model call is the caller's decision.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::extraction::normalize::{normalize, normalize_text, ContentBudget};
use crate::extraction::parser::{ParseTier, ResultParser};
use crate::extraction::prompts::{PromptBuilder, PromptVariant, EXTRACTION_SYSTEM};
use crate::extraction::record::JobPostingRecord;
use crate::extraction::schema::{SchemaContract, SchemaVariant};
use crate::llm_client::{CompletionModel, LlmError, ModelErrorKind};
use crate::scraping::{ContentFetcher, ContentFormat, FetchError, FetchStrategy};

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to fetch posting: {0}")]
    Fetch(#[from] FetchError),

    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("extraction cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionErrorKind {
    InvalidInput,
    Fetch,
    Model(ModelErrorKind),
    Cancelled,
}

impl ExtractionError {
    pub fn kind(&self) -> ExtractionErrorKind {
        match self {
            ExtractionError::InvalidInput(_) => ExtractionErrorKind::InvalidInput,
            ExtractionError::Fetch(_) => ExtractionErrorKind::Fetch,
            ExtractionError::Model(e) => ExtractionErrorKind::Model(e.kind()),
            ExtractionError::Cancelled => ExtractionErrorKind::Cancelled,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Profiles
// ────────────────────────────────────────────────────────────────────────────

/// Budget, schema and prompt choices for one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionProfile {
    /// Budget for generically fetched pages. Job-board content always gets
    /// `ContentBudget::Full`.
    pub content_budget: ContentBudget,
    pub schema_variant: SchemaVariant,
    pub prompt_variant: PromptVariant,
}

impl ExtractionProfile {
    pub const fn compact() -> Self {
        Self {
            content_budget: ContentBudget::Compact,
            schema_variant: SchemaVariant::Core,
            prompt_variant: PromptVariant::Standard,
        }
    }

    pub const fn detailed() -> Self {
        Self {
            content_budget: ContentBudget::Full,
            schema_variant: SchemaVariant::WithDates,
            prompt_variant: PromptVariant::Detailed,
        }
    }

    fn budget_for(&self, strategy: FetchStrategy) -> ContentBudget {
        match strategy {
            FetchStrategy::JobBoard => ContentBudget::Full,
            FetchStrategy::GenericPage => self.content_budget,
        }
    }
}

impl Default for ExtractionProfile {
    fn default() -> Self {
        Self::detailed()
    }
}

impl FromStr for ExtractionProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::compact()),
            "detailed" => Ok(Self::detailed()),
            other => Err(format!(
                "unknown extraction profile '{other}' (expected 'compact' or 'detailed')"
            )),
        }
    }
}

/// The record plus how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub record: JobPostingRecord,
    pub strategy: FetchStrategy,
    pub content_budget: usize,
    pub content_chars: usize,
    pub parse_tier: ParseTier,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Holds no per-call state, so one instance serves concurrent requests.
pub struct JobExtractor {
    fetcher: ContentFetcher,
    model: Arc<dyn CompletionModel>,
    profile: ExtractionProfile,
    schema: SchemaContract,
    prompts: PromptBuilder,
    parser: ResultParser,
}

impl JobExtractor {
    pub fn new(
        fetcher: ContentFetcher,
        model: Arc<dyn CompletionModel>,
        profile: ExtractionProfile,
    ) -> Self {
        let schema = SchemaContract::new(profile.schema_variant);
        Self {
            fetcher,
            model,
            profile,
            schema,
            prompts: PromptBuilder::new(profile.prompt_variant),
            parser: ResultParser::new(schema),
        }
    }

    pub fn profile(&self) -> ExtractionProfile {
        self.profile
    }

    pub async fn extract_job(&self, url: &str) -> Result<JobPostingRecord, ExtractionError> {
        Ok(self.extract_job_with_report(url).await?.record)
    }

    /// Like `extract_job`, but gives up with `Cancelled` as soon as `cancel`
    /// fires. In-flight fetch and model requests are dropped.
    pub async fn extract_job_cancellable(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<JobPostingRecord, ExtractionError> {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Extraction cancelled for {}", url);
                Err(ExtractionError::Cancelled)
            }
            result = self.extract_job(url) => result,
        }
    }

    /// Steps:
    /// 1. validate URL
    /// 2. fetch (strategy picked from URL shape)
    /// 3. normalize with the budget for that strategy
    /// 4. build prompt and call the model
    /// 5. parse (never fails)
    pub async fn extract_job_with_report(
        &self,
        url: &str,
    ) -> Result<ExtractionReport, ExtractionError> {
        // Step 1: Validate before any network activity
        // The parsed form is only for fetching; the record reports the URL as sent.
        let target = parse_target_url(url)?;
        let original_url = url.trim();

        // Step 2: Fetch
        let fetched = self.fetcher.fetch(&target).await?;

        // Step 3: Normalize
        let budget = self.profile.budget_for(fetched.strategy).chars();
        let content = match fetched.format {
            ContentFormat::Markup => normalize(&fetched.text, budget),
            ContentFormat::Text => normalize_text(&fetched.text, budget),
        };
        if content.is_empty() {
            warn!("No usable content fetched from {}; the model sees an empty posting", original_url);
        }
        info!(
            "Normalized content for {}: strategy={:?} budget={} chars={}",
            original_url,
            fetched.strategy,
            budget,
            content.char_len()
        );

        // Step 4: Prompt + model call
        let prompt = self.prompts.build(&content, &self.schema.describe());
        let raw_output = self.model.complete(&prompt, EXTRACTION_SYSTEM).await?;

        // Step 5: Parse
        let parsed = self.parser.parse(&raw_output, original_url);
        info!(
            "Extracted '{}' at '{}' from {} (tier={:?})",
            parsed.record.position, parsed.record.company, original_url, parsed.tier
        );

        Ok(ExtractionReport {
            content_chars: content.char_len(),
            record: parsed.record,
            strategy: fetched.strategy,
            content_budget: budget,
            parse_tier: parsed.tier,
        })
    }
}

/// Accepts absolute http(s) URLs; a bare host/path gets `https://`.
fn parse_target_url(input: &str) -> Result<Url, ExtractionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::InvalidInput("url is required".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ExtractionError::InvalidInput(format!("malformed url '{trimmed}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ExtractionError::InvalidInput(format!(
            "unsupported url scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(ExtractionError::InvalidInput(format!(
            "url '{trimmed}' has no host"
        )));
    }
    Ok(url)
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::{FakeModel, HangingModel};
    use super::*;
    use crate::scraping::testing::{FakeJobBoard, FakePageSource};

    const GOOD_REPLY: &str = r#"{"position":"Rust Engineer","company":"Acme","description":"Builds the platform.","keywords":["Rust","Tokio","SQL","AWS","Kafka"],"url":"","deadline":"2025-09-01"}"#;

    fn extractor_with(
        page: Arc<FakePageSource>,
        board: Option<Arc<FakeJobBoard>>,
        model: Arc<dyn CompletionModel>,
        profile: ExtractionProfile,
    ) -> JobExtractor {
        let mut fetcher = ContentFetcher::new(page);
        if let Some(board) = board {
            fetcher = fetcher.with_job_board(board);
        }
        JobExtractor::new(fetcher, model, profile)
    }

    #[tokio::test]
    async fn test_empty_url_is_invalid_input_without_network() {
        let page = Arc::new(FakePageSource::returning("x"));
        let model = Arc::new(FakeModel::replying(GOOD_REPLY));
        let extractor = extractor_with(page.clone(), None, model.clone(), ExtractionProfile::default());

        for input in ["", "   "] {
            let err = extractor.extract_job(input).await.unwrap_err();
            assert_eq!(err.kind(), ExtractionErrorKind::InvalidInput);
        }
        assert_eq!(page.call_count(), 0);
        assert_eq!(model.call_count(), 0);
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!(
            "Compact".parse::<ExtractionProfile>().unwrap(),
            ExtractionProfile::compact()
        );
        assert_eq!(
            " detailed ".parse::<ExtractionProfile>().unwrap(),
            ExtractionProfile::detailed()
        );
        assert!("verbose".parse::<ExtractionProfile>().is_err());
    }

    #[test]
    fn test_parse_target_url() {
        assert_eq!(
            parse_target_url("acme.test/jobs/1").unwrap().as_str(),
            "https://acme.test/jobs/1"
        );
        assert!(parse_target_url("ftp://acme.test/x").is_err());
        assert!(parse_target_url("https://").is_err());
        assert!(parse_target_url("http://exa mple.com").is_err());
    }

    #[tokio::test]
    async fn test_full_pipeline_returns_record_with_caller_url() {
        let page = Arc::new(FakePageSource::returning(
            "<h1>Rust Engineer</h1><script>x()</script><p>Acme</p>",
        ));
        let model = Arc::new(FakeModel::replying(GOOD_REPLY));
        let extractor = extractor_with(page, None, model.clone(), ExtractionProfile::detailed());

        let report = extractor
            .extract_job_with_report("https://careers.acme.test/jobs/7")
            .await
            .unwrap();
        assert_eq!(report.record.url, "https://careers.acme.test/jobs/7");
        assert_eq!(report.record.position, "Rust Engineer");
        assert_eq!(report.record.keywords.len(), 5);
        assert_eq!(report.record.deadline.unwrap().to_string(), "2025-09-01");
        assert_eq!(report.parse_tier, ParseTier::Strict);
        assert_eq!(report.strategy, FetchStrategy::GenericPage);
        assert_eq!(report.content_budget, 8_000);

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Rust Engineer Acme"));
        assert!(!prompts[0].contains("x()"));
    }

    #[tokio::test]
    async fn test_record_url_is_the_url_as_sent() {
        for input in ["https://x.test", "  https://X.test/Job?q=a b ", "acme.test/jobs/1"] {
            let page = Arc::new(FakePageSource::returning("text"));
            let model = Arc::new(FakeModel::replying("garbage"));
            let extractor = extractor_with(page, None, model, ExtractionProfile::default());

            let record = extractor.extract_job(input).await.unwrap();
            assert_eq!(record.url, input.trim());
        }
    }

    #[tokio::test]
    async fn test_strict_record_without_url_gets_url_as_sent() {
        let page = Arc::new(FakePageSource::returning("text"));
        let model = Arc::new(FakeModel::replying(GOOD_REPLY));
        let extractor = extractor_with(page, None, model, ExtractionProfile::default());

        let report = extractor.extract_job_with_report("https://x.test").await.unwrap();
        assert_eq!(report.parse_tier, ParseTier::Strict);
        assert_eq!(report.record.url, "https://x.test");
    }

    #[tokio::test]
    async fn test_plain_text_content_keeps_angle_brackets() {
        let page = Arc::new(FakePageSource::returning_text("Salary <100k, 3+ years > exp"));
        let model = Arc::new(FakeModel::replying(GOOD_REPLY));
        let extractor = extractor_with(page, None, model.clone(), ExtractionProfile::default());

        extractor.extract_job("https://acme.test/jobs/8").await.unwrap();
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Salary <100k, 3+ years > exp"));
    }

    #[tokio::test]
    async fn test_compact_profile_uses_small_budget_for_pages() {
        let long = "word ".repeat(3_000);
        let page = Arc::new(FakePageSource::returning(&long));
        let model = Arc::new(FakeModel::replying(GOOD_REPLY));
        let extractor = extractor_with(page, None, model, ExtractionProfile::compact());

        let report = extractor
            .extract_job_with_report("https://acme.test/jobs/1")
            .await
            .unwrap();
        assert_eq!(report.content_budget, 4_000);
        assert!(report.content_chars <= 4_000);
        // Core schema ignores dates even when the model sends them.
        assert!(report.record.deadline.is_none());
    }

    #[tokio::test]
    async fn test_job_board_content_gets_full_budget() {
        let page = Arc::new(FakePageSource::returning("unused"));
        let board = Arc::new(FakeJobBoard::new("boards.test", Some("Title: Rust Engineer")));
        let model = Arc::new(FakeModel::replying(GOOD_REPLY));
        let extractor = extractor_with(page.clone(), Some(board), model, ExtractionProfile::compact());

        let report = extractor
            .extract_job_with_report("https://boards.test/jobs/view/99")
            .await
            .unwrap();
        assert_eq!(report.strategy, FetchStrategy::JobBoard);
        assert_eq!(report.content_budget, 8_000);
        assert_eq!(page.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_model_output_still_returns_record() {
        let page = Arc::new(FakePageSource::returning("text"));
        let model = Arc::new(FakeModel::replying("I could not find a job here."));
        let extractor = extractor_with(page, None, model, ExtractionProfile::default());

        let report = extractor
            .extract_job_with_report("https://acme.test/jobs/2")
            .await
            .unwrap();
        assert_eq!(report.parse_tier, ParseTier::Fallback);
        assert_eq!(report.record.url, "https://acme.test/jobs/2");
        assert_eq!(report.record.position, "Unknown Position");
    }

    #[tokio::test]
    async fn test_empty_page_is_not_an_error() {
        let page = Arc::new(FakePageSource::returning(""));
        let model = Arc::new(FakeModel::replying(GOOD_REPLY));
        let extractor = extractor_with(page, None, model, ExtractionProfile::default());
        let record = extractor.extract_job("https://acme.test/jobs/3").await.unwrap();
        assert_eq!(record.company, "Acme");
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces() {
        let page = Arc::new(FakePageSource::failing(503));
        let model = Arc::new(FakeModel::replying(GOOD_REPLY));
        let extractor = extractor_with(page, None, model.clone(), ExtractionProfile::default());

        let err = extractor.extract_job("https://acme.test/jobs/4").await.unwrap_err();
        assert_eq!(err.kind(), ExtractionErrorKind::Fetch);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_auth_error_surfaces_without_retry() {
        let page = Arc::new(FakePageSource::returning("text"));
        let model = Arc::new(FakeModel::failing(LlmError::Auth {
            status: 401,
            message: "bad key".to_string(),
        }));
        let extractor = extractor_with(page, None, model.clone(), ExtractionProfile::default());

        let err = extractor.extract_job("https://acme.test/jobs/5").await.unwrap_err();
        assert_eq!(err.kind(), ExtractionErrorKind::Model(ModelErrorKind::Auth));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_hanging_extraction() {
        let page = Arc::new(FakePageSource::returning("text"));
        let extractor = extractor_with(page, None, Arc::new(HangingModel), ExtractionProfile::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = extractor
            .extract_job_cancellable("https://acme.test/jobs/6", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Cancelled));
    }

    #[tokio::test]
    async fn test_concurrent_extractions_are_independent() {
        let page = Arc::new(FakePageSource::returning("text"));
        let model = Arc::new(FakeModel::replying(GOOD_REPLY));
        let extractor = Arc::new(extractor_with(page, None, model, ExtractionProfile::default()));

        let a = extractor.clone();
        let b = extractor.clone();
        let (ra, rb) = tokio::join!(
            async move { a.extract_job("https://acme.test/jobs/a").await },
            async move { b.extract_job("https://acme.test/jobs/b").await },
        );
        // Only the first call gets the canned JSON; both still carry their own URL.
        assert_eq!(ra.unwrap().url, "https://acme.test/jobs/a");
        assert_eq!(rb.unwrap().url, "https://acme.test/jobs/b");
    }
}
