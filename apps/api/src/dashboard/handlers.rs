//! Interviewer dashboard: candidate list and transcripts, reset/publish
//! actions, and notifications. Every route requires a valid bearer token.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::token::AuthUser;
use crate::errors::AppError;
use crate::interview::handlers::{fetch_candidate, missing_fields_of};
use crate::interview::session::InterviewSession;
use crate::models::candidate::{
    AnswerRow, CandidateRow, CandidateStatus, ChatMessageRow, NotificationRow,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CandidateListQuery {
    /// Case-insensitive substring match against name or email.
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CandidateDetailResponse {
    pub candidate: CandidateRow,
    pub answers: Vec<AnswerRow>,
    pub chat_history: Vec<ChatMessageRow>,
}

/// GET /api/v1/candidates
///
/// Ordered by final score descending (unscored candidates last), then by
/// most recent.
pub async fn list_candidates(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<CandidateListQuery>,
) -> Result<Json<Vec<CandidateRow>>, AppError> {
    if let Some(status) = params.status.as_deref() {
        status
            .parse::<CandidateStatus>()
            .map_err(AppError::Validation)?;
    }

    let candidates = sqlx::query_as::<_, CandidateRow>(
        r#"
        SELECT * FROM candidates
        WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%' OR email ILIKE '%' || $1 || '%')
          AND ($2::text IS NULL OR status = $2)
        ORDER BY final_score DESC NULLS LAST, created_at DESC
        "#,
    )
    .bind(params.search)
    .bind(params.status)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(candidates))
}

/// GET /api/v1/candidates/:id
pub async fn get_candidate(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidateDetailResponse>, AppError> {
    let candidate = fetch_candidate(&state, candidate_id).await?;

    let answers = sqlx::query_as::<_, AnswerRow>(
        "SELECT * FROM answers WHERE candidate_id = $1 ORDER BY question_index ASC",
    )
    .bind(candidate_id)
    .fetch_all(&state.db)
    .await?;

    let chat_history = sqlx::query_as::<_, ChatMessageRow>(
        "SELECT * FROM chat_messages WHERE candidate_id = $1 ORDER BY created_at ASC",
    )
    .bind(candidate_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(CandidateDetailResponse {
        candidate,
        answers,
        chat_history,
    }))
}

/// POST /api/v1/candidates/:id/reset
///
/// Zeroes the assessment: status back to pending, answers and chat history
/// deleted, score and summary cleared, session re-opened at question 0.
/// Valid regardless of the candidate's current phase.
pub async fn reset_candidate(
    user: AuthUser,
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidateRow>, AppError> {
    fetch_candidate(&state, candidate_id).await?;

    sqlx::query("DELETE FROM answers WHERE candidate_id = $1")
        .bind(candidate_id)
        .execute(&state.db)
        .await?;
    sqlx::query("DELETE FROM chat_messages WHERE candidate_id = $1")
        .bind(candidate_id)
        .execute(&state.db)
        .await?;

    let candidate = sqlx::query_as::<_, CandidateRow>(
        r#"
        UPDATE candidates
        SET status = $1, final_score = NULL, summary = NULL,
            scores_published = FALSE, updated_at = now()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(CandidateStatus::Pending.as_str())
    .bind(candidate_id)
    .fetch_one(&state.db)
    .await?;

    // Replace any live session with a fresh one; a scoring call still in
    // flight will find its question index gone and be discarded.
    let mut session = InterviewSession::new(candidate_id, missing_fields_of(&candidate));
    session.open()?;
    state.sessions.insert(session).await;

    info!(
        "Assessment for candidate {candidate_id} reset by {}",
        user.email
    );
    Ok(Json(candidate))
}

/// POST /api/v1/candidates/:id/publish
pub async fn publish_scores(
    user: AuthUser,
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidateRow>, AppError> {
    let candidate = fetch_candidate(&state, candidate_id).await?;
    if candidate.status != CandidateStatus::Completed.as_str() {
        return Err(AppError::Validation(
            "Scores can only be published for a completed assessment".to_string(),
        ));
    }

    let candidate = sqlx::query_as::<_, CandidateRow>(
        "UPDATE candidates SET scores_published = TRUE, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(candidate_id)
    .fetch_one(&state.db)
    .await?;

    info!(
        "Scores for candidate {candidate_id} published by {}",
        user.email
    );
    Ok(Json(candidate))
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<NotificationRow>>, AppError> {
    let notifications = sqlx::query_as::<_, NotificationRow>(
        "SELECT * FROM notifications ORDER BY created_at DESC LIMIT 50",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(notifications))
}

/// PATCH /api/v1/notifications/:id/read
pub async fn mark_notification_read(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
        .bind(notification_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Notification {notification_id} not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
