//! Candidate-facing assistant chat. Replies come from the provider chain
//! and degrade to a canned response when every provider is down.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ai::ChatTurn;
use crate::errors::AppError;
use crate::interview::handlers::fetch_candidate;
use crate::models::candidate::ChatMessageRow;
use crate::state::AppState;

/// How many prior messages are handed to the chatbot as context.
const HISTORY_WINDOW: i64 = 10;

const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message: ChatMessageRow,
    pub reply: ChatMessageRow,
}

/// GET /api/v1/chat/:candidate_id
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessageRow>>, AppError> {
    fetch_candidate(&state, candidate_id).await?;
    let messages = sqlx::query_as::<_, ChatMessageRow>(
        "SELECT * FROM chat_messages WHERE candidate_id = $1 ORDER BY created_at ASC",
    )
    .bind(candidate_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(messages))
}

/// POST /api/v1/chat/:candidate_id/messages
pub async fn send_message(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "Message exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }
    fetch_candidate(&state, candidate_id).await?;

    let history: Vec<ChatMessageRow> = sqlx::query_as(
        r#"
        SELECT * FROM (
            SELECT * FROM chat_messages
            WHERE candidate_id = $1 AND question_index IS NULL
            ORDER BY created_at DESC
            LIMIT $2
        ) recent ORDER BY created_at ASC
        "#,
    )
    .bind(candidate_id)
    .bind(HISTORY_WINDOW)
    .fetch_all(&state.db)
    .await?;

    let message = insert_message(&state, candidate_id, "candidate", text).await?;

    let turns: Vec<ChatTurn> = history
        .iter()
        .map(|row| ChatTurn {
            role: row.sender.clone(),
            text: row.body.clone(),
        })
        .collect();
    let reply_text = state.chain.chat_reply(&turns, text).await;

    let reply = insert_message(&state, candidate_id, "assistant", &reply_text).await?;

    Ok(Json(SendMessageResponse { message, reply }))
}

async fn insert_message(
    state: &AppState,
    candidate_id: Uuid,
    sender: &str,
    body: &str,
) -> Result<ChatMessageRow, AppError> {
    Ok(sqlx::query_as::<_, ChatMessageRow>(
        r#"
        INSERT INTO chat_messages (id, candidate_id, sender, body)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(candidate_id)
    .bind(sender)
    .bind(body)
    .fetch_one(&state.db)
    .await?)
}
