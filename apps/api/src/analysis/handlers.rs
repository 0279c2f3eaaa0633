//! Axum route handlers for the Analysis API.

use std::convert::Infallible;
use std::time::Instant;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::analysis::batch::{BatchReport, ResumeInput};
use crate::analysis::environment::{
    api_key_status, validate_environment, ApiKeyStatus, EnvironmentReport,
};
use crate::analysis::types::{AnalysisRequest, AnalysisResult};
use crate::errors::{AppError, AppJson};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default)]
    pub resumes: Vec<ResumeInput>,
    #[serde(default)]
    pub job_description: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analysis
///
/// Single resume against a job description. `processingTime` covers retries.
pub async fn handle_analyze(
    State(state): State<AppState>,
    AppJson(request): AppJson<AnalysisRequest>,
) -> Result<Json<AnalysisResult>, AppError> {
    let started = Instant::now();
    let mut result = state
        .analyzer
        .analyze(&request.resume_text, &request.job_description)
        .await?;
    result.processing_time = started.elapsed().as_millis() as u64;

    info!(
        "Analysis complete: match={}% in {}ms",
        result.match_percentage, result.processing_time
    );
    Ok(Json(result))
}

/// POST /api/v1/analysis/batch
pub async fn handle_batch(
    State(state): State<AppState>,
    AppJson(request): AppJson<BatchRequest>,
) -> Result<Json<BatchReport>, AppError> {
    let report = state
        .batch
        .run_batch(&request.resumes, &request.job_description, |_| {})
        .await?;
    Ok(Json(report))
}

/// POST /api/v1/analysis/batch/stream
///
/// Same batch, delivered as Server-Sent Events: one `progress` event per item,
/// then `complete` with the full report. Precondition failures are returned
/// as a plain error response before the stream opens.
pub async fn handle_batch_stream(
    State(state): State<AppState>,
    AppJson(request): AppJson<BatchRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    state
        .batch
        .check_preconditions(&request.resumes, &request.job_description)?;

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let coordinator = state.batch.clone();

    tokio::spawn(async move {
        let progress_tx = tx.clone();
        let outcome = coordinator
            .run_batch(&request.resumes, &request.job_description, move |progress| {
                // receiver gone means the client disconnected; the batch still finishes
                let _ = progress_tx.send(sse_event("progress", progress));
            })
            .await;

        let last = match outcome {
            Ok(report) => sse_event("complete", &report),
            Err(err) => {
                warn!("Streamed batch failed: {}", err);
                sse_event("error", &json!({ "message": err.to_string() }))
            }
        };
        let _ = tx.send(last);
    });

    let events = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// GET /api/v1/analysis/status
pub async fn handle_status(State(state): State<AppState>) -> Json<ApiKeyStatus> {
    Json(api_key_status(&state.config))
}

/// GET /api/v1/analysis/environment
pub async fn handle_environment(State(state): State<AppState>) -> Json<EnvironmentReport> {
    Json(validate_environment(&state.config))
}

fn sse_event<T: Serialize>(name: &str, payload: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(payload)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}
