use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::models::job::{
    CreateJobRequest, EmploymentType, JobFilters, JobRow, JobStatus, UpdateJobRequest,
};
use crate::models::Choice;
use crate::recruiting::ids::{insert_with_public_id, not_found, IdKind, RecordKey};
use crate::recruiting::{
    classify_write_error, clean_list, optional_choice, optional_text, parse_choice, required_text,
    Page,
};

/// Validated insert for `jobs`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: &'static str,
    pub description: String,
    pub requirements: Vec<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub status: &'static str,
}

impl NewJob {
    pub fn from_request(req: &CreateJobRequest) -> Result<Self, AppError> {
        check_salary_range(req.salary_min, req.salary_max)?;

        Ok(Self {
            title: required_text("title", &req.title)?,
            department: optional_text(req.department.as_deref()),
            location: optional_text(req.location.as_deref()),
            employment_type: match req.employment_type.as_deref() {
                Some(raw) => parse_choice::<EmploymentType>(raw)?.as_str(),
                None => EmploymentType::FullTime.as_str(),
            },
            description: required_text("description", &req.description)?,
            requirements: clean_list(&req.requirements),
            salary_min: req.salary_min,
            salary_max: req.salary_max,
            status: match req.status.as_deref() {
                Some(raw) => parse_choice::<JobStatus>(raw)?.as_str(),
                None => JobStatus::Open.as_str(),
            },
        })
    }
}

/// Validated partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobChanges {
    pub title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<&'static str>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub status: Option<&'static str>,
}

impl JobChanges {
    pub fn from_request(req: &UpdateJobRequest) -> Result<Self, AppError> {
        check_salary_range(req.salary_min, req.salary_max)?;

        Ok(Self {
            title: req
                .title
                .as_deref()
                .map(|t| required_text("title", t))
                .transpose()?,
            department: optional_text(req.department.as_deref()),
            location: optional_text(req.location.as_deref()),
            employment_type: optional_choice::<EmploymentType>(req.employment_type.as_deref())?,
            description: req
                .description
                .as_deref()
                .map(|d| required_text("description", d))
                .transpose()?,
            requirements: req.requirements.as_deref().map(clean_list),
            salary_min: req.salary_min,
            salary_max: req.salary_max,
            status: optional_choice::<JobStatus>(req.status.as_deref())?,
        })
    }
}

fn check_salary_range(min: Option<i32>, max: Option<i32>) -> Result<(), AppError> {
    if min.is_some_and(|v| v < 0) || max.is_some_and(|v| v < 0) {
        return Err(AppError::Validation(
            "salary bounds must not be negative".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(AppError::Validation(
                "salaryMin must not exceed salaryMax".to_string(),
            ));
        }
    }
    Ok(())
}

pub async fn create_job(pool: &PgPool, job: &NewJob) -> Result<JobRow, AppError> {
    let row = insert_with_public_id(IdKind::Job, move |public_id| async move {
        sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs
                (public_id, title, department, location, employment_type,
                 description, requirements, salary_min, salary_max, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(public_id)
        .bind(&job.title)
        .bind(&job.department)
        .bind(&job.location)
        .bind(job.employment_type)
        .bind(&job.description)
        .bind(&job.requirements)
        .bind(job.salary_min)
        .bind(job.salary_max)
        .bind(job.status)
        .fetch_one(pool)
        .await
    })
    .await?;

    info!("Created job {} ({})", row.public_id, row.title);
    Ok(row)
}

pub async fn find_job(pool: &PgPool, key: &RecordKey) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1 OR public_id = $2")
        .bind(key.uuid())
        .bind(key.public_id())
        .fetch_optional(pool)
        .await
}

pub async fn get_job(pool: &PgPool, key: &RecordKey) -> Result<JobRow, AppError> {
    find_job(pool, key)
        .await?
        .ok_or_else(|| not_found(IdKind::Job, key))
}

pub async fn list_jobs(pool: &PgPool, filters: &JobFilters) -> Result<Vec<JobRow>, AppError> {
    let status = optional_choice::<JobStatus>(filters.status.as_deref())?;
    let department = optional_text(filters.department.as_deref());
    let page = Page::new(filters.limit, filters.offset);

    let rows = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR department ILIKE $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(status)
    .bind(department)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn update_job(
    pool: &PgPool,
    key: &RecordKey,
    changes: &JobChanges,
) -> Result<JobRow, AppError> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET
            title           = COALESCE($3, title),
            department      = COALESCE($4, department),
            location        = COALESCE($5, location),
            employment_type = COALESCE($6, employment_type),
            description     = COALESCE($7, description),
            requirements    = COALESCE($8, requirements),
            salary_min      = COALESCE($9, salary_min),
            salary_max      = COALESCE($10, salary_max),
            status          = COALESCE($11, status),
            updated_at      = NOW()
        WHERE id = $1 OR public_id = $2
        RETURNING *
        "#,
    )
    .bind(key.uuid())
    .bind(key.public_id())
    .bind(&changes.title)
    .bind(&changes.department)
    .bind(&changes.location)
    .bind(changes.employment_type)
    .bind(&changes.description)
    .bind(&changes.requirements)
    .bind(changes.salary_min)
    .bind(changes.salary_max)
    .bind(changes.status)
    .fetch_optional(pool)
    .await
    .map_err(classify_write_error)?;

    row.ok_or_else(|| not_found(IdKind::Job, key))
}

/// Applications and their interviews are removed with the job.
pub async fn delete_job(pool: &PgPool, key: &RecordKey) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1 OR public_id = $2")
        .bind(key.uuid())
        .bind(key.public_id())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(IdKind::Job, key));
    }
    info!("Deleted job {}", key);
    Ok(())
}
