use sqlx::PgPool;

use crate::analysis::analyzer::ResumeAnalyzer;
use crate::analysis::batch::BatchCoordinator;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Single-resume analysis over the configured generative model.
    pub analyzer: ResumeAnalyzer,
    /// Sequential batch runner sharing `analyzer`'s model.
    pub batch: BatchCoordinator,
}
