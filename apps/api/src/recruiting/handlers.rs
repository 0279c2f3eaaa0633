//! Axum route handlers for the recruiting CRUD API.
//!
//! Every `:id` path segment accepts the UUID or the human-readable id.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::errors::{AppError, AppJson};
use crate::models::application::{
    ApplicationAnalysisResponse, ApplicationFilters, ApplicationRow, CreateApplicationRequest,
    UpdateApplicationRequest,
};
use crate::models::candidate::{
    CandidateFilters, CandidateRow, CreateCandidateRequest, UpdateCandidateRequest,
};
use crate::models::interview::{
    CreateInterviewRequest, InterviewFilters, InterviewRow, UpdateInterviewRequest,
};
use crate::models::job::{CreateJobRequest, JobFilters, JobRow, UpdateJobRequest};
use crate::recruiting::applications::{self, ApplicationChanges, NewApplication};
use crate::recruiting::candidates::{self, CandidateChanges, NewCandidate};
use crate::recruiting::ids::RecordKey;
use crate::recruiting::interviews::{self, InterviewChanges, NewInterview};
use crate::recruiting::jobs::{self, JobChanges, NewJob};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Jobs
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/jobs?status=&department=&limit=&offset=
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(filters): Query<JobFilters>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(jobs::list_jobs(&state.db, &filters).await?))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let job = NewJob::from_request(&request)?;
    let row = jobs::create_job(&state.db, &job).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobRow>, AppError> {
    Ok(Json(jobs::get_job(&state.db, &RecordKey::parse(&id)).await?))
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateJobRequest>,
) -> Result<Json<JobRow>, AppError> {
    let changes = JobChanges::from_request(&request)?;
    let row = jobs::update_job(&state.db, &RecordKey::parse(&id), &changes).await?;
    Ok(Json(row))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    jobs::delete_job(&state.db, &RecordKey::parse(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Candidates
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/candidates?search=&skill=&limit=&offset=
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Query(filters): Query<CandidateFilters>,
) -> Result<Json<Vec<CandidateRow>>, AppError> {
    Ok(Json(candidates::list_candidates(&state.db, &filters).await?))
}

/// POST /api/v1/candidates
///
/// 409 when the email is already registered.
pub async fn handle_create_candidate(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateCandidateRequest>,
) -> Result<(StatusCode, Json<CandidateRow>), AppError> {
    let candidate = NewCandidate::from_request(&request)?;
    let row = candidates::create_candidate(&state.db, &candidate).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CandidateRow>, AppError> {
    Ok(Json(
        candidates::get_candidate(&state.db, &RecordKey::parse(&id)).await?,
    ))
}

/// PATCH /api/v1/candidates/:id
pub async fn handle_update_candidate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateCandidateRequest>,
) -> Result<Json<CandidateRow>, AppError> {
    let changes = CandidateChanges::from_request(&request)?;
    let row = candidates::update_candidate(&state.db, &RecordKey::parse(&id), &changes).await?;
    Ok(Json(row))
}

/// DELETE /api/v1/candidates/:id
pub async fn handle_delete_candidate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    candidates::delete_candidate(&state.db, &RecordKey::parse(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Applications
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/applications?jobId=&candidateId=&status=&limit=&offset=
pub async fn handle_list_applications(
    State(state): State<AppState>,
    Query(filters): Query<ApplicationFilters>,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    Ok(Json(
        applications::list_applications(&state.db, &filters).await?,
    ))
}

/// POST /api/v1/applications
///
/// 404 when the job or candidate does not exist, 409 on a repeat application.
pub async fn handle_create_application(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    let application = NewApplication::from_request(&request)?;
    let row = applications::create_application(&state.db, &application).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApplicationRow>, AppError> {
    Ok(Json(
        applications::get_application(&state.db, &RecordKey::parse(&id)).await?,
    ))
}

/// PATCH /api/v1/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateApplicationRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    let changes = ApplicationChanges::from_request(&request)?;
    let row =
        applications::update_application(&state.db, &RecordKey::parse(&id), &changes).await?;
    Ok(Json(row))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    applications::delete_application(&state.db, &RecordKey::parse(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/applications/:id/analyze
///
/// Runs the resume analyzer on the candidate's stored resume against the
/// job description and saves the outcome on the application.
pub async fn handle_analyze_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApplicationAnalysisResponse>, AppError> {
    let (application, analysis) =
        applications::analyze_application(&state.db, &state.analyzer, &RecordKey::parse(&id))
            .await?;
    Ok(Json(ApplicationAnalysisResponse {
        application,
        analysis,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Interviews
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/interviews?applicationId=&status=&upcoming=&limit=&offset=
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    Query(filters): Query<InterviewFilters>,
) -> Result<Json<Vec<InterviewRow>>, AppError> {
    Ok(Json(interviews::list_interviews(&state.db, &filters).await?))
}

/// POST /api/v1/interviews
pub async fn handle_create_interview(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateInterviewRequest>,
) -> Result<(StatusCode, Json<InterviewRow>), AppError> {
    let interview = NewInterview::from_request(&request)?;
    let row = interviews::create_interview(&state.db, &interview).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InterviewRow>, AppError> {
    Ok(Json(
        interviews::get_interview(&state.db, &RecordKey::parse(&id)).await?,
    ))
}

/// PATCH /api/v1/interviews/:id
pub async fn handle_update_interview(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateInterviewRequest>,
) -> Result<Json<InterviewRow>, AppError> {
    let changes = InterviewChanges::from_request(&request)?;
    let row = interviews::update_interview(&state.db, &RecordKey::parse(&id), &changes).await?;
    Ok(Json(row))
}

/// DELETE /api/v1/interviews/:id
pub async fn handle_delete_interview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    interviews::delete_interview(&state.db, &RecordKey::parse(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
