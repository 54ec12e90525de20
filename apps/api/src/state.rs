use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::extraction::extractor::JobExtractor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// One orchestrator for all requests; it holds no per-call state.
    pub extractor: Arc<JobExtractor>,
    /// Cancelled on shutdown; in-flight extractions stop at their next await.
    pub shutdown: CancellationToken,
}
