//! Axum route handlers for the job extraction API.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::extraction::record::JobPostingRecord;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractJobRequest {
    /// Optional here so a missing field maps to VALIDATION_ERROR rather than
    /// a body rejection.
    #[serde(default)]
    pub url: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/extract (and the legacy POST /api/scrape-job)
///
/// Fetches the posting at `url` and returns the extracted record. A model
/// reply that cannot be parsed still yields a record with default fields.
pub async fn handle_extract_job(
    State(state): State<AppState>,
    payload: Result<Json<ExtractJobRequest>, JsonRejection>,
) -> Result<Json<JobPostingRecord>, AppError> {
    // Body rejections get the same error envelope as every other failure.
    let Json(request) = payload.map_err(|rejection| {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let url = request
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("URL is required".to_string()))?;

    info!("Extracting job posting from {}", url);
    let record = state
        .extractor
        .extract_job_cancellable(url, &state.shutdown)
        .await?;

    Ok(Json(record))
}
