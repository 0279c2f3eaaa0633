use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::models::candidate::{
    CandidateFilters, CandidateRow, CreateCandidateRequest, UpdateCandidateRequest,
};
use crate::recruiting::ids::{insert_with_public_id, not_found, IdKind, RecordKey};
use crate::recruiting::{classify_write_error, clean_list, optional_text, required_text, Page};

#[derive(Debug, Clone, PartialEq)]
pub struct NewCandidate {
    pub first_name: String,
    pub last_name: String,
    /// Lower-cased; uniqueness is case-insensitive.
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub current_role: Option<String>,
    pub current_company: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Vec<String>,
    pub resume_text: Option<String>,
}

impl NewCandidate {
    pub fn from_request(req: &CreateCandidateRequest) -> Result<Self, AppError> {
        Ok(Self {
            first_name: required_text("firstName", &req.first_name)?,
            last_name: required_text("lastName", &req.last_name)?,
            email: normalize_email(&req.email)?,
            phone: optional_text(req.phone.as_deref()),
            location: optional_text(req.location.as_deref()),
            current_role: optional_text(req.current_role.as_deref()),
            current_company: optional_text(req.current_company.as_deref()),
            experience_years: check_experience(req.experience_years)?,
            skills: clean_list(&req.skills),
            resume_text: optional_text(req.resume_text.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub current_role: Option<String>,
    pub current_company: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Option<Vec<String>>,
    pub resume_text: Option<String>,
}

impl CandidateChanges {
    pub fn from_request(req: &UpdateCandidateRequest) -> Result<Self, AppError> {
        Ok(Self {
            first_name: req
                .first_name
                .as_deref()
                .map(|v| required_text("firstName", v))
                .transpose()?,
            last_name: req
                .last_name
                .as_deref()
                .map(|v| required_text("lastName", v))
                .transpose()?,
            email: req.email.as_deref().map(normalize_email).transpose()?,
            phone: optional_text(req.phone.as_deref()),
            location: optional_text(req.location.as_deref()),
            current_role: optional_text(req.current_role.as_deref()),
            current_company: optional_text(req.current_company.as_deref()),
            experience_years: check_experience(req.experience_years)?,
            skills: req.skills.as_deref().map(clean_list),
            resume_text: optional_text(req.resume_text.as_deref()),
        })
    }
}

pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation(format!("'{}' is not a valid email", raw.trim())))
    }
}

fn check_experience(years: Option<i32>) -> Result<Option<i32>, AppError> {
    match years {
        Some(y) if !(0..=70).contains(&y) => Err(AppError::Validation(
            "experienceYears must be between 0 and 70".to_string(),
        )),
        other => Ok(other),
    }
}

pub async fn create_candidate(
    pool: &PgPool,
    candidate: &NewCandidate,
) -> Result<CandidateRow, AppError> {
    let row = insert_with_public_id(IdKind::Candidate, move |public_id| async move {
        sqlx::query_as::<_, CandidateRow>(
            r#"
            INSERT INTO candidates
                (public_id, first_name, last_name, email, phone, location,
                 current_title, current_company, experience_years, skills, resume_text)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(public_id)
        .bind(&candidate.first_name)
        .bind(&candidate.last_name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(&candidate.location)
        .bind(&candidate.current_role)
        .bind(&candidate.current_company)
        .bind(candidate.experience_years)
        .bind(&candidate.skills)
        .bind(&candidate.resume_text)
        .fetch_one(pool)
        .await
    })
    .await?;

    info!("Created candidate {}", row.public_id);
    Ok(row)
}

pub async fn find_candidate(
    pool: &PgPool,
    key: &RecordKey,
) -> Result<Option<CandidateRow>, sqlx::Error> {
    sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1 OR public_id = $2")
        .bind(key.uuid())
        .bind(key.public_id())
        .fetch_optional(pool)
        .await
}

pub async fn get_candidate(pool: &PgPool, key: &RecordKey) -> Result<CandidateRow, AppError> {
    find_candidate(pool, key)
        .await?
        .ok_or_else(|| not_found(IdKind::Candidate, key))
}

pub async fn list_candidates(
    pool: &PgPool,
    filters: &CandidateFilters,
) -> Result<Vec<CandidateRow>, AppError> {
    let search = optional_text(filters.search.as_deref()).map(|s| format!("%{s}%"));
    let skill = optional_text(filters.skill.as_deref());
    let page = Page::new(filters.limit, filters.offset);

    let rows = sqlx::query_as::<_, CandidateRow>(
        r#"
        SELECT * FROM candidates
        WHERE ($1::text IS NULL
               OR first_name || ' ' || last_name ILIKE $1
               OR email ILIKE $1)
          AND ($2::text IS NULL
               OR EXISTS (SELECT 1 FROM unnest(skills) s WHERE lower(s) = lower($2)))
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(search)
    .bind(skill)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn update_candidate(
    pool: &PgPool,
    key: &RecordKey,
    changes: &CandidateChanges,
) -> Result<CandidateRow, AppError> {
    let row = sqlx::query_as::<_, CandidateRow>(
        r#"
        UPDATE candidates SET
            first_name       = COALESCE($3, first_name),
            last_name        = COALESCE($4, last_name),
            email            = COALESCE($5, email),
            phone            = COALESCE($6, phone),
            location         = COALESCE($7, location),
            current_title    = COALESCE($8, current_title),
            current_company  = COALESCE($9, current_company),
            experience_years = COALESCE($10, experience_years),
            skills           = COALESCE($11, skills),
            resume_text      = COALESCE($12, resume_text),
            updated_at       = NOW()
        WHERE id = $1 OR public_id = $2
        RETURNING *
        "#,
    )
    .bind(key.uuid())
    .bind(key.public_id())
    .bind(&changes.first_name)
    .bind(&changes.last_name)
    .bind(&changes.email)
    .bind(&changes.phone)
    .bind(&changes.location)
    .bind(&changes.current_role)
    .bind(&changes.current_company)
    .bind(changes.experience_years)
    .bind(&changes.skills)
    .bind(&changes.resume_text)
    .fetch_optional(pool)
    .await
    .map_err(classify_write_error)?;

    row.ok_or_else(|| not_found(IdKind::Candidate, key))
}

pub async fn delete_candidate(pool: &PgPool, key: &RecordKey) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM candidates WHERE id = $1 OR public_id = $2")
        .bind(key.uuid())
        .bind(key.public_id())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(IdKind::Candidate, key));
    }
    info!("Deleted candidate {}", key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateCandidateRequest {
        CreateCandidateRequest {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: " Jane.Doe@Example.COM ".to_string(),
            skills: vec!["Rust".to_string(), "Postgres".to_string()],
            resume_text: Some("  ".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_email_is_normalized() {
        let candidate = NewCandidate::from_request(&request()).unwrap();
        assert_eq!(candidate.email, "jane.doe@example.com");
        assert_eq!(candidate.resume_text, None);
    }

    #[test]
    fn test_invalid_emails() {
        for bad in ["", "jane", "jane@", "@example.com", "jane@example", "jane@.com", "ja ne@example.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
        assert!(normalize_email("jane@mail.example.co").is_ok());
    }

    #[test]
    fn test_names_are_required() {
        let mut req = request();
        req.last_name = "  ".to_string();
        assert!(matches!(
            NewCandidate::from_request(&req),
            Err(AppError::Validation(msg)) if msg == "lastName is required"
        ));
    }

    #[test]
    fn test_experience_bounds() {
        let mut req = request();
        req.experience_years = Some(-2);
        assert!(NewCandidate::from_request(&req).is_err());

        let changes = CandidateChanges::from_request(&UpdateCandidateRequest {
            experience_years: Some(7),
            email: Some("NEW@example.org".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(changes.experience_years, Some(7));
        assert_eq!(changes.email.as_deref(), Some("new@example.org"));
        assert_eq!(changes.skills, None);
    }
}
