use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a candidate record. Stored as TEXT in Postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateStatus {
    Pending,
    InProgress,
    Completed,
}

impl CandidateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::InProgress => "in-progress",
            CandidateStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CandidateStatus::Pending),
            "in-progress" => Ok(CandidateStatus::InProgress),
            "completed" => Ok(CandidateStatus::Completed),
            other => Err(format!("unknown candidate status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub resume_filename: Option<String>,
    pub resume_s3_key: Option<String>,
    /// Extracted resume text, used as context for question generation.
    /// Never returned to clients.
    #[serde(skip)]
    pub resume_text: Option<String>,
    pub status: String,
    pub final_score: Option<f64>,
    pub summary: Option<String>,
    pub scores_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnswerRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub question_index: i32,
    pub question_text: String,
    pub answer_text: String,
    pub score: f64,
    pub feedback: String,
    pub tier: String,
    pub time_used_secs: i32,
    pub timed_out: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessageRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub sender: String,
    pub body: String,
    pub question_index: Option<i32>,
    pub score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub candidate_id: Option<Uuid>,
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
