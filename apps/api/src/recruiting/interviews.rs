use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::{
    CreateInterviewRequest, InterviewFilters, InterviewRow, InterviewStatus, InterviewType,
    UpdateInterviewRequest,
};
use crate::models::Choice;
use crate::recruiting::applications::get_application;
use crate::recruiting::ids::{insert_with_public_id, not_found, IdKind, RecordKey};
use crate::recruiting::{classify_write_error, optional_choice, optional_text, parse_choice, Page};

pub const DEFAULT_DURATION_MINUTES: i32 = 60;
const MAX_DURATION_MINUTES: i32 = 8 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct NewInterview {
    pub application: RecordKey,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub interview_type: &'static str,
    pub interviewer: Option<String>,
    pub location: Option<String>,
}

impl NewInterview {
    pub fn from_request(req: &CreateInterviewRequest) -> Result<Self, AppError> {
        if req.application_id.trim().is_empty() {
            return Err(AppError::Validation("applicationId is required".to_string()));
        }

        Ok(Self {
            application: RecordKey::parse(&req.application_id),
            scheduled_at: req.scheduled_at,
            duration_minutes: check_duration(req.duration_minutes)?
                .unwrap_or(DEFAULT_DURATION_MINUTES),
            interview_type: parse_choice::<InterviewType>(&req.interview_type)?.as_str(),
            interviewer: optional_text(req.interviewer.as_deref()),
            location: optional_text(req.location.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterviewChanges {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub interview_type: Option<&'static str>,
    pub interviewer: Option<String>,
    pub location: Option<String>,
    pub status: Option<&'static str>,
    pub feedback: Option<String>,
    pub rating: Option<i16>,
}

impl InterviewChanges {
    pub fn from_request(req: &UpdateInterviewRequest) -> Result<Self, AppError> {
        if let Some(rating) = req.rating {
            if !(1..=5).contains(&rating) {
                return Err(AppError::Validation(
                    "rating must be between 1 and 5".to_string(),
                ));
            }
        }

        Ok(Self {
            scheduled_at: req.scheduled_at,
            duration_minutes: check_duration(req.duration_minutes)?,
            interview_type: optional_choice::<InterviewType>(req.interview_type.as_deref())?,
            interviewer: optional_text(req.interviewer.as_deref()),
            location: optional_text(req.location.as_deref()),
            status: optional_choice::<InterviewStatus>(req.status.as_deref())?,
            feedback: optional_text(req.feedback.as_deref()),
            rating: req.rating,
        })
    }
}

fn check_duration(minutes: Option<i32>) -> Result<Option<i32>, AppError> {
    match minutes {
        Some(m) if !(1..=MAX_DURATION_MINUTES).contains(&m) => Err(AppError::Validation(
            format!("durationMinutes must be between 1 and {MAX_DURATION_MINUTES}"),
        )),
        other => Ok(other),
    }
}

pub async fn create_interview(
    pool: &PgPool,
    interview: &NewInterview,
) -> Result<InterviewRow, AppError> {
    let application_id = get_application(pool, &interview.application).await?.id;

    let row = insert_with_public_id(IdKind::Interview, move |public_id| async move {
        sqlx::query_as::<_, InterviewRow>(
            r#"
            INSERT INTO interviews
                (public_id, application_id, scheduled_at, duration_minutes,
                 interview_type, interviewer, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(public_id)
        .bind(application_id)
        .bind(interview.scheduled_at)
        .bind(interview.duration_minutes)
        .bind(interview.interview_type)
        .bind(&interview.interviewer)
        .bind(&interview.location)
        .fetch_one(pool)
        .await
    })
    .await?;

    info!(
        "Scheduled interview {} for {} at {}",
        row.public_id, interview.application, row.scheduled_at
    );
    Ok(row)
}

pub async fn find_interview(
    pool: &PgPool,
    key: &RecordKey,
) -> Result<Option<InterviewRow>, sqlx::Error> {
    sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE id = $1 OR public_id = $2")
        .bind(key.uuid())
        .bind(key.public_id())
        .fetch_optional(pool)
        .await
}

pub async fn get_interview(pool: &PgPool, key: &RecordKey) -> Result<InterviewRow, AppError> {
    find_interview(pool, key)
        .await?
        .ok_or_else(|| not_found(IdKind::Interview, key))
}

pub async fn list_interviews(
    pool: &PgPool,
    filters: &InterviewFilters,
) -> Result<Vec<InterviewRow>, AppError> {
    let status = optional_choice::<InterviewStatus>(filters.status.as_deref())?;
    let application_id: Option<Uuid> = match optional_text(filters.application_id.as_deref()) {
        Some(raw) => Some(get_application(pool, &RecordKey::parse(&raw)).await?.id),
        None => None,
    };
    let from: Option<DateTime<Utc>> = filters.upcoming.then(Utc::now);
    let page = Page::new(filters.limit, filters.offset);

    let rows = sqlx::query_as::<_, InterviewRow>(
        r#"
        SELECT * FROM interviews
        WHERE ($1::uuid IS NULL OR application_id = $1)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::timestamptz IS NULL OR scheduled_at >= $3)
        ORDER BY scheduled_at ASC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(application_id)
    .bind(status)
    .bind(from)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn update_interview(
    pool: &PgPool,
    key: &RecordKey,
    changes: &InterviewChanges,
) -> Result<InterviewRow, AppError> {
    let row = sqlx::query_as::<_, InterviewRow>(
        r#"
        UPDATE interviews SET
            scheduled_at     = COALESCE($3, scheduled_at),
            duration_minutes = COALESCE($4, duration_minutes),
            interview_type   = COALESCE($5, interview_type),
            interviewer      = COALESCE($6, interviewer),
            location         = COALESCE($7, location),
            status           = COALESCE($8, status),
            feedback         = COALESCE($9, feedback),
            rating           = COALESCE($10, rating),
            updated_at       = NOW()
        WHERE id = $1 OR public_id = $2
        RETURNING *
        "#,
    )
    .bind(key.uuid())
    .bind(key.public_id())
    .bind(changes.scheduled_at)
    .bind(changes.duration_minutes)
    .bind(changes.interview_type)
    .bind(&changes.interviewer)
    .bind(&changes.location)
    .bind(changes.status)
    .bind(&changes.feedback)
    .bind(changes.rating)
    .fetch_optional(pool)
    .await
    .map_err(classify_write_error)?;

    row.ok_or_else(|| not_found(IdKind::Interview, key))
}

pub async fn delete_interview(pool: &PgPool, key: &RecordKey) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM interviews WHERE id = $1 OR public_id = $2")
        .bind(key.uuid())
        .bind(key.public_id())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(IdKind::Interview, key));
    }
    info!("Deleted interview {}", key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> CreateInterviewRequest {
        CreateInterviewRequest {
            application_id: "app-004242".to_string(),
            scheduled_at: Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap(),
            duration_minutes: None,
            interview_type: "Technical".to_string(),
            interviewer: Some(" Sam Lee ".to_string()),
            location: None,
        }
    }

    #[test]
    fn test_new_interview_defaults() {
        let interview = NewInterview::from_request(&request()).unwrap();
        assert_eq!(interview.application, RecordKey::Public("APP-004242".to_string()));
        assert_eq!(interview.duration_minutes, DEFAULT_DURATION_MINUTES);
        assert_eq!(interview.interview_type, "technical");
        assert_eq!(interview.interviewer.as_deref(), Some("Sam Lee"));
    }

    #[test]
    fn test_interview_type_is_required_and_checked() {
        let mut req = request();
        req.interview_type = "carrier pigeon".to_string();
        assert!(matches!(
            NewInterview::from_request(&req),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_duration_bounds() {
        let mut req = request();
        req.duration_minutes = Some(0);
        assert!(NewInterview::from_request(&req).is_err());
        req.duration_minutes = Some(45);
        assert_eq!(NewInterview::from_request(&req).unwrap().duration_minutes, 45);
    }

    #[test]
    fn test_rating_must_be_one_to_five() {
        for rating in [0, 6] {
            let changes = InterviewChanges::from_request(&UpdateInterviewRequest {
                rating: Some(rating),
                ..Default::default()
            });
            assert!(matches!(changes, Err(AppError::Validation(_))));
        }

        let changes = InterviewChanges::from_request(&UpdateInterviewRequest {
            rating: Some(4),
            status: Some("no-show".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(changes.rating, Some(4));
        assert_eq!(changes.status, Some("no_show"));
    }
}
