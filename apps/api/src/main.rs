mod analysis;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod recruiting;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::analyzer::ResumeAnalyzer;
use crate::analysis::batch::BatchCoordinator;
use crate::analysis::environment::validate_environment;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::llm_client::{GeminiClient, GenerativeModel};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hirewise API v{}", env!("CARGO_PKG_VERSION"));

    let environment = validate_environment(&config);
    for problem in &environment.errors {
        warn!("Environment check: {problem}");
    }

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Initialize Gemini client; a missing key only disables analysis
    let gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_api_url.clone())
        .context("Failed to build Gemini HTTP client")?;
    info!(
        "Gemini client initialized (api key configured: {})",
        gemini.is_configured()
    );

    let analyzer = ResumeAnalyzer::new(Arc::new(gemini));
    let batch = BatchCoordinator::new(
        analyzer.clone(),
        Duration::from_millis(config.batch_rate_limit_delay_ms),
    );
    info!(
        "Batch coordinator ready (rate limit delay: {}ms)",
        config.batch_rate_limit_delay_ms
    );

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        analyzer,
        batch,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict allowed origins once the web client has a fixed domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
