//! Human-readable record ids (`JOB-004217`) and lookups that accept either
//! those or the UUID primary key.

use std::fmt;
use std::future::Future;

use anyhow::anyhow;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

/// Collisions on the public id unique index are retried this many times.
pub const MAX_ID_ATTEMPTS: usize = 5;

const ID_SPACE: u128 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Job,
    Candidate,
    Application,
    Interview,
}

impl IdKind {
    pub fn prefix(self) -> &'static str {
        match self {
            IdKind::Job => "JOB",
            IdKind::Candidate => "CAN",
            IdKind::Application => "APP",
            IdKind::Interview => "INT",
        }
    }

    /// Unique constraint guarding `public_id`; see migrations.
    pub fn constraint(self) -> &'static str {
        match self {
            IdKind::Job => "jobs_public_id_key",
            IdKind::Candidate => "candidates_public_id_key",
            IdKind::Application => "applications_public_id_key",
            IdKind::Interview => "interviews_public_id_key",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IdKind::Job => "Job",
            IdKind::Candidate => "Candidate",
            IdKind::Application => "Application",
            IdKind::Interview => "Interview",
        }
    }
}

pub fn generate_public_id(kind: IdKind) -> String {
    let n = Uuid::new_v4().as_u128() % ID_SPACE;
    format!("{}-{:06}", kind.prefix(), n)
}

/// Path or filter reference to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    Id(Uuid),
    Public(String),
}

impl RecordKey {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match Uuid::parse_str(raw) {
            Ok(id) => RecordKey::Id(id),
            Err(_) => RecordKey::Public(raw.to_ascii_uppercase()),
        }
    }

    /// Bound as `$1` in `WHERE id = $1 OR public_id = $2`.
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            RecordKey::Id(id) => Some(*id),
            RecordKey::Public(_) => None,
        }
    }

    /// Bound as `$2` in `WHERE id = $1 OR public_id = $2`.
    pub fn public_id(&self) -> Option<&str> {
        match self {
            RecordKey::Id(_) => None,
            RecordKey::Public(public_id) => Some(public_id),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Id(id) => write!(f, "{id}"),
            RecordKey::Public(public_id) => f.write_str(public_id),
        }
    }
}

pub fn not_found(kind: IdKind, key: &RecordKey) -> AppError {
    AppError::NotFound(format!("{} {} not found", kind.label(), key))
}

/// True when `err` is a unique violation on the named constraint.
pub fn violates_unique(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation() && db.constraint() == Some(constraint),
        _ => false,
    }
}

/// Runs `insert` with a fresh public id until it does not collide.
pub async fn insert_with_public_id<T, F, Fut>(kind: IdKind, mut insert: F) -> Result<T, AppError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    for attempt in 1..=MAX_ID_ATTEMPTS {
        let public_id = generate_public_id(kind);
        match insert(public_id.clone()).await {
            Ok(row) => return Ok(row),
            Err(err) if violates_unique(&err, kind.constraint()) => {
                warn!(
                    "{} id {} already taken (attempt {}/{})",
                    kind.label(),
                    public_id,
                    attempt,
                    MAX_ID_ATTEMPTS
                );
            }
            Err(err) => return Err(super::classify_write_error(err)),
        }
    }

    Err(AppError::Internal(anyhow!(
        "could not allocate a unique {} id after {} attempts",
        kind.prefix(),
        MAX_ID_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_id_format() {
        for kind in [IdKind::Job, IdKind::Candidate, IdKind::Application, IdKind::Interview] {
            let id = generate_public_id(kind);
            let (prefix, digits) = id.split_once('-').unwrap();
            assert_eq!(prefix, kind.prefix());
            assert_eq!(digits.len(), 6);
            assert!(digits.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_record_key_accepts_uuid_or_public_id() {
        let id = Uuid::new_v4();
        assert_eq!(RecordKey::parse(&id.to_string()), RecordKey::Id(id));
        assert_eq!(
            RecordKey::parse(" job-000042 "),
            RecordKey::Public("JOB-000042".to_string())
        );

        let key = RecordKey::parse("CAN-123456");
        assert_eq!(key.uuid(), None);
        assert_eq!(key.public_id(), Some("CAN-123456"));
        assert_eq!(key.to_string(), "CAN-123456");
    }

    #[tokio::test]
    async fn test_insert_does_not_retry_other_errors() {
        let mut attempts = 0;
        let result: Result<(), AppError> = insert_with_public_id(IdKind::Job, |_| {
            attempts += 1;
            async { Err(sqlx::Error::RowNotFound) }
        })
        .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_insert_passes_generated_id() {
        let row = insert_with_public_id(IdKind::Interview, |public_id| async move {
            Ok::<_, sqlx::Error>(public_id)
        })
        .await
        .unwrap();
        assert!(row.starts_with("INT-"));
    }
}
