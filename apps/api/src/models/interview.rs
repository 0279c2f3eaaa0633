use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Choice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewType {
    Phone,
    Video,
    Onsite,
    Technical,
}

impl Choice for InterviewType {
    const FIELD: &'static str = "interviewType";
    const ALL: &'static [Self] = &[Self::Phone, Self::Video, Self::Onsite, Self::Technical];

    fn as_str(self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Video => "video",
            Self::Onsite => "onsite",
            Self::Technical => "technical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl Choice for InterviewStatus {
    const FIELD: &'static str = "status";
    const ALL: &'static [Self] = &[
        Self::Scheduled,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRow {
    pub id: Uuid,
    pub public_id: String,
    pub application_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub interview_type: String,
    pub interviewer: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub feedback: Option<String>,
    pub rating: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInterviewRequest {
    /// UUID or public id of the application.
    pub application_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub interview_type: String,
    pub interviewer: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInterviewRequest {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub interview_type: Option<String>,
    pub interviewer: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub feedback: Option<String>,
    pub rating: Option<i16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewFilters {
    pub application_id: Option<String>,
    pub status: Option<String>,
    /// Only interviews scheduled from now on.
    #[serde(default)]
    pub upcoming: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
