// Recruiting pipeline: jobs, candidates, applications and interviews.
// Persistence lives in the entity modules; handlers.rs maps them onto HTTP.

pub mod applications;
pub mod candidates;
pub mod handlers;
pub mod ids;
pub mod interviews;
pub mod jobs;

use crate::errors::AppError;
use crate::models::Choice;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// `LIMIT`/`OFFSET` pair clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// Maps constraint violations onto client errors; everything else stays a
/// database error.
pub fn classify_write_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let message = match db.constraint() {
                Some("candidates_email_key") => "A candidate with this email already exists",
                Some("applications_job_candidate_key") => {
                    "This candidate has already applied to this job"
                }
                _ => "Record already exists",
            };
            return AppError::Conflict(message.to_string());
        }
        if db.is_foreign_key_violation() {
            return AppError::NotFound("Referenced record does not exist".to_string());
        }
        if db.is_check_violation() {
            return AppError::Validation(format!(
                "Value rejected by constraint {}",
                db.constraint().unwrap_or("unknown")
            ));
        }
    }
    AppError::Database(err)
}

/// Trims a required text field, rejecting blank input.
pub fn required_text(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional text field; blank becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trims each entry and drops blanks and duplicates, keeping first-seen order.
pub fn clean_list(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            out.push(value.to_string());
        }
    }
    out
}

pub fn parse_choice<T: Choice>(raw: &str) -> Result<T, AppError> {
    T::parse(raw).ok_or_else(|| {
        AppError::Validation(format!(
            "{} must be one of: {}",
            T::FIELD,
            T::allowed()
        ))
    })
}

/// Validates an optional choice and returns its stored form.
pub fn optional_choice<T: Choice>(raw: Option<&str>) -> Result<Option<&'static str>, AppError> {
    raw.map(|r| parse_choice::<T>(r).map(T::as_str))
        .transpose()
}
