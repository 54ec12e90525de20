mod config;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod scraping;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::extraction::extractor::JobExtractor;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::scraping::job_board::LinkedInJobBoard;
use crate::scraping::page::HttpPageSource;
use crate::scraping::ContentFetcher;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobTrack API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let mut llm = LlmClient::new(config.anthropic_api_key.clone(), config.model_timeout)?;
    if let Some(api_url) = &config.anthropic_api_url {
        info!("Using Anthropic Messages endpoint {}", api_url);
        llm = llm.with_api_url(api_url.clone());
    }
    if llm.has_api_key() {
        info!("LLM client initialized (model: {})", llm_client::MODEL);
    } else {
        warn!("ANTHROPIC_API_KEY is not set; extraction requests will fail until it is configured");
    }

    // Initialize content fetching (job board first when enabled, generic page otherwise)
    let mut fetcher = ContentFetcher::new(Arc::new(HttpPageSource::new(config.fetch_timeout)?));
    if config.job_board_enabled {
        let board = LinkedInJobBoard::new(config.job_board_settings())?;
        info!("Job board fetch enabled for {}", config.job_board_host);
        fetcher = fetcher.with_job_board(Arc::new(board));
    }

    let extractor = JobExtractor::new(fetcher, Arc::new(llm), config.extraction_profile);
    info!("Extraction profile: {:?}", extractor.profile());

    // Build app state
    let shutdown = CancellationToken::new();
    let state = AppState {
        extractor: Arc::new(extractor),
        shutdown: shutdown.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // browser UI calls this cross-origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
