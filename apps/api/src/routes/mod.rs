pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::extraction::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job extraction API
        .route("/api/v1/jobs/extract", post(handlers::handle_extract_job))
        // Legacy path still called by the web client
        .route("/api/scrape-job", post(handlers::handle_extract_job))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use super::*;
    use crate::extraction::extractor::testing::FakeModel;
    use crate::extraction::extractor::{ExtractionProfile, JobExtractor};
    use crate::scraping::testing::FakePageSource;
    use crate::scraping::ContentFetcher;

    #[tokio::test]
    async fn test_health() {
        let extractor = JobExtractor::new(
            ContentFetcher::new(Arc::new(FakePageSource::returning(""))),
            Arc::new(FakeModel::replying("")),
            ExtractionProfile::default(),
        );
        let app = build_router(AppState {
            extractor: Arc::new(extractor),
            shutdown: CancellationToken::new(),
        });

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "jobtrack-api");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
