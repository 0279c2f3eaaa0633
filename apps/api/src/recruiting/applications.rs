use std::time::Instant;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::analysis::analyzer::ResumeAnalyzer;
use crate::analysis::types::AnalysisResult;
use crate::errors::AppError;
use crate::models::application::{
    ApplicationFilters, ApplicationRow, ApplicationStatus, CreateApplicationRequest,
    UpdateApplicationRequest,
};
use crate::models::Choice;
use crate::recruiting::candidates::get_candidate;
use crate::recruiting::ids::{insert_with_public_id, not_found, IdKind, RecordKey};
use crate::recruiting::jobs::get_job;
use crate::recruiting::{classify_write_error, optional_choice, optional_text, parse_choice, Page};

#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub job: RecordKey,
    pub candidate: RecordKey,
    pub status: &'static str,
    pub cover_letter: Option<String>,
    pub notes: Option<String>,
}

impl NewApplication {
    pub fn from_request(req: &CreateApplicationRequest) -> Result<Self, AppError> {
        if req.job_id.trim().is_empty() {
            return Err(AppError::Validation("jobId is required".to_string()));
        }
        if req.candidate_id.trim().is_empty() {
            return Err(AppError::Validation("candidateId is required".to_string()));
        }

        Ok(Self {
            job: RecordKey::parse(&req.job_id),
            candidate: RecordKey::parse(&req.candidate_id),
            status: match req.status.as_deref() {
                Some(raw) => parse_choice::<ApplicationStatus>(raw)?.as_str(),
                None => ApplicationStatus::Applied.as_str(),
            },
            cover_letter: optional_text(req.cover_letter.as_deref()),
            notes: optional_text(req.notes.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationChanges {
    pub status: Option<&'static str>,
    pub cover_letter: Option<String>,
    pub notes: Option<String>,
}

impl ApplicationChanges {
    pub fn from_request(req: &UpdateApplicationRequest) -> Result<Self, AppError> {
        Ok(Self {
            status: optional_choice::<ApplicationStatus>(req.status.as_deref())?,
            cover_letter: optional_text(req.cover_letter.as_deref()),
            notes: optional_text(req.notes.as_deref()),
        })
    }
}

/// Resolves the job and candidate first so a dangling reference is a 404
/// naming the missing record.
pub async fn create_application(
    pool: &PgPool,
    application: &NewApplication,
) -> Result<ApplicationRow, AppError> {
    let job_id = get_job(pool, &application.job).await?.id;
    let candidate_id = get_candidate(pool, &application.candidate).await?.id;

    let row = insert_with_public_id(IdKind::Application, move |public_id| async move {
        sqlx::query_as::<_, ApplicationRow>(
            r#"
            INSERT INTO applications
                (public_id, job_id, candidate_id, status, cover_letter, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(public_id)
        .bind(job_id)
        .bind(candidate_id)
        .bind(application.status)
        .bind(&application.cover_letter)
        .bind(&application.notes)
        .fetch_one(pool)
        .await
    })
    .await?;

    info!(
        "Created application {} (job {}, candidate {})",
        row.public_id, job_id, candidate_id
    );
    Ok(row)
}

pub async fn find_application(
    pool: &PgPool,
    key: &RecordKey,
) -> Result<Option<ApplicationRow>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications WHERE id = $1 OR public_id = $2",
    )
    .bind(key.uuid())
    .bind(key.public_id())
    .fetch_optional(pool)
    .await
}

pub async fn get_application(pool: &PgPool, key: &RecordKey) -> Result<ApplicationRow, AppError> {
    find_application(pool, key)
        .await?
        .ok_or_else(|| not_found(IdKind::Application, key))
}

pub async fn list_applications(
    pool: &PgPool,
    filters: &ApplicationFilters,
) -> Result<Vec<ApplicationRow>, AppError> {
    let status = optional_choice::<ApplicationStatus>(filters.status.as_deref())?;
    let job_id: Option<Uuid> = match optional_text(filters.job_id.as_deref()) {
        Some(raw) => Some(get_job(pool, &RecordKey::parse(&raw)).await?.id),
        None => None,
    };
    let candidate_id: Option<Uuid> = match optional_text(filters.candidate_id.as_deref()) {
        Some(raw) => Some(get_candidate(pool, &RecordKey::parse(&raw)).await?.id),
        None => None,
    };
    let page = Page::new(filters.limit, filters.offset);

    let rows = sqlx::query_as::<_, ApplicationRow>(
        r#"
        SELECT * FROM applications
        WHERE ($1::uuid IS NULL OR job_id = $1)
          AND ($2::uuid IS NULL OR candidate_id = $2)
          AND ($3::text IS NULL OR status = $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(job_id)
    .bind(candidate_id)
    .bind(status)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn update_application(
    pool: &PgPool,
    key: &RecordKey,
    changes: &ApplicationChanges,
) -> Result<ApplicationRow, AppError> {
    let row = sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE applications SET
            status       = COALESCE($3, status),
            cover_letter = COALESCE($4, cover_letter),
            notes        = COALESCE($5, notes),
            updated_at   = NOW()
        WHERE id = $1 OR public_id = $2
        RETURNING *
        "#,
    )
    .bind(key.uuid())
    .bind(key.public_id())
    .bind(changes.status)
    .bind(&changes.cover_letter)
    .bind(&changes.notes)
    .fetch_optional(pool)
    .await
    .map_err(classify_write_error)?;

    row.ok_or_else(|| not_found(IdKind::Application, key))
}

pub async fn delete_application(pool: &PgPool, key: &RecordKey) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM applications WHERE id = $1 OR public_id = $2")
        .bind(key.uuid())
        .bind(key.public_id())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(IdKind::Application, key));
    }
    info!("Deleted application {}", key);
    Ok(())
}

/// Scores the candidate's stored resume against the job description and
/// records match percentage, ATS overall and the full analysis on the row.
pub async fn analyze_application(
    pool: &PgPool,
    analyzer: &ResumeAnalyzer,
    key: &RecordKey,
) -> Result<(ApplicationRow, AnalysisResult), AppError> {
    analyzer.ensure_configured()?;

    let application = get_application(pool, key).await?;
    let job = get_job(pool, &RecordKey::Id(application.job_id)).await?;
    let candidate = get_candidate(pool, &RecordKey::Id(application.candidate_id)).await?;

    let resume_text = candidate
        .resume_text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Candidate {} has no resume text to analyze",
                candidate.public_id
            ))
        })?;

    let started = Instant::now();
    let mut analysis = analyzer.analyze(resume_text, &job.description).await?;
    analysis.processing_time = started.elapsed().as_millis() as u64;

    let analysis_json = serde_json::to_value(&analysis).map_err(anyhow::Error::from)?;

    let row = sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE applications SET
            match_percentage = $2,
            ats_score        = $3,
            analysis         = $4,
            analyzed_at      = NOW(),
            updated_at       = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(application.id)
    .bind(i16::from(analysis.match_percentage))
    .bind(i16::from(analysis.ats_score.overall))
    .bind(analysis_json)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(IdKind::Application, key))?;

    info!(
        "Analyzed application {}: match={}%, ats={}{}",
        row.public_id,
        analysis.match_percentage,
        analysis.ats_score.overall,
        if analysis.fallback_analysis { " (fallback)" } else { "" }
    );
    Ok((row, analysis))
}
