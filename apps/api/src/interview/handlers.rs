//! Axum route handlers for the interview flow, plus the side effects shared
//! with the expiry sweeper (answer persistence, next-question install,
//! finalization).

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::ai::{AnswerEvaluation, GeneratedQuestion};
use crate::errors::AppError;
use crate::interview::phase::InterviewPhase;
use crate::interview::session::{Advance, AnswerRecord, InterviewSession, SessionError};
use crate::interview::summary::render_summary;
use crate::interview::tier::{QuestionTier, QUESTION_COUNT};
use crate::interview::validation::ProfileField;
use crate::models::candidate::{CandidateRow, CandidateStatus};
use crate::state::AppState;

/// Resume text handed to question generation is capped to keep prompts
/// within provider context limits.
const RESUME_CONTEXT_MAX_CHARS: usize = 2000;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SupplyFieldRequest {
    pub field: ProfileField,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer: String,
}

/// Candidate-facing session view. Per-answer scores are withheld until the
/// interviewer publishes them; only progress and timing are exposed.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub candidate_id: Uuid,
    pub phase: InterviewPhase,
    pub current_index: usize,
    pub total_questions: usize,
    pub missing_fields: Vec<ProfileField>,
    pub question: Option<GeneratedQuestion>,
    pub time_remaining_secs: Option<u32>,
    pub answers_recorded: usize,
    /// Drives the "welcome back" resume-or-restart prompt after a reload.
    pub resumable: bool,
}

impl SessionView {
    fn of(session: &InterviewSession, now: chrono::DateTime<Utc>) -> Self {
        SessionView {
            candidate_id: session.candidate_id,
            phase: session.phase,
            current_index: session.current_index,
            total_questions: QUESTION_COUNT,
            missing_fields: session.missing_fields.clone(),
            question: session.current_question.clone(),
            time_remaining_secs: session.time_remaining_secs(now),
            answers_recorded: session.answers.len(),
            resumable: matches!(
                session.phase,
                InterviewPhase::Active | InterviewPhase::Paused
            ),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    /// False when the submission arrived after the timer had already
    /// expired the question — the late result is discarded.
    pub recorded: bool,
    pub evaluation: Option<AnswerEvaluation>,
    pub session: SessionView,
    /// Present once the interview just finished.
    pub summary: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interviews/:candidate_id/open
///
/// Creates (or returns) the candidate's session: `collecting-info` when
/// identity fields are missing, `ready` otherwise.
pub async fn open_session(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let now = Utc::now();
    let candidate = fetch_candidate(&state, candidate_id).await?;

    if let Some(session) = state.sessions.fetch(candidate_id).await {
        return Ok(Json(SessionView::of(&session, now)));
    }

    if candidate.status == CandidateStatus::Completed.as_str() {
        return Err(AppError::Validation(
            "Assessment already completed. Reset the assessment to retake it.".to_string(),
        ));
    }

    let mut session = InterviewSession::new(candidate_id, missing_fields_of(&candidate));
    session.open()?;
    let view = SessionView::of(&session, now);
    state.sessions.insert(session).await;
    info!("Opened interview session for candidate {candidate_id}");
    Ok(Json(view))
}

/// GET /api/v1/interviews/:candidate_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    sweep_expired(&state).await;
    let session = state
        .sessions
        .fetch(candidate_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No session for candidate {candidate_id}")))?;
    Ok(Json(SessionView::of(&session, Utc::now())))
}

/// POST /api/v1/interviews/:candidate_id/profile
///
/// Supplies one missing identity field. Validation failure re-prompts the
/// same field (400) without advancing the session.
pub async fn supply_profile_field(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(request): Json<SupplyFieldRequest>,
) -> Result<Json<SessionView>, AppError> {
    let now = Utc::now();
    let field = request.field;
    let normalized = state
        .sessions
        .mutate(candidate_id, |s| s.supply_field(field, &request.value))
        .await?;

    let column_update = match field {
        ProfileField::Name => "UPDATE candidates SET name = $1, updated_at = now() WHERE id = $2",
        ProfileField::Email => "UPDATE candidates SET email = $1, updated_at = now() WHERE id = $2",
        ProfileField::Phone => "UPDATE candidates SET phone = $1, updated_at = now() WHERE id = $2",
    };
    sqlx::query(column_update)
        .bind(&normalized)
        .bind(candidate_id)
        .execute(&state.db)
        .await?;

    let session = state.sessions.fetch(candidate_id).await.ok_or_else(|| {
        AppError::NotFound(format!("No session for candidate {candidate_id}"))
    })?;
    Ok(Json(SessionView::of(&session, now)))
}

/// POST /api/v1/interviews/:candidate_id/start
///
/// `ready → active`: marks the candidate in-progress and installs question 0.
pub async fn start_interview(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let now = Utc::now();
    let candidate = fetch_candidate(&state, candidate_id).await?;

    state.sessions.mutate(candidate_id, |s| s.start(now)).await?;

    sqlx::query("UPDATE candidates SET status = $1, updated_at = now() WHERE id = $2")
        .bind(CandidateStatus::InProgress.as_str())
        .bind(candidate_id)
        .execute(&state.db)
        .await?;

    install_next_question(&state, candidate_id, 0, candidate.resume_text.as_deref()).await?;

    let session = state.sessions.fetch(candidate_id).await.ok_or_else(|| {
        AppError::NotFound(format!("No session for candidate {candidate_id}"))
    })?;
    info!("Interview started for candidate {candidate_id}");
    Ok(Json(SessionView::of(&session, Utc::now())))
}

/// POST /api/v1/interviews/:candidate_id/answer
///
/// Scores and records the current answer. The question snapshot is taken
/// before the (async) scoring call; if the timer expires or the assessment
/// is reset while scoring is in flight, the stale result is discarded.
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(request): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let now = Utc::now();
    sweep_expired(&state).await;

    let session = state
        .sessions
        .fetch(candidate_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No session for candidate {candidate_id}")))?;
    let pending = session.begin_submission(now)?;

    // Scoring happens outside the registry lock; the question timer keeps
    // running independently of how long the provider takes.
    let evaluation = state
        .chain
        .score_answer(&pending.question_text, &request.answer, pending.tier)
        .await;

    let outcome = state
        .sessions
        .mutate(candidate_id, |s| {
            s.record_answer(
                &pending,
                request.answer.clone(),
                evaluation.score,
                evaluation.feedback.clone(),
            )
        })
        .await;

    let advance = match outcome {
        Ok(advance) => advance,
        Err(AppError::Session(SessionError::StaleSubmission { .. })) => {
            // expired (or reset) while scoring — the auto-submitted empty
            // answer stands, this result is dropped
            let session = state.sessions.fetch(candidate_id).await.ok_or_else(|| {
                AppError::NotFound(format!("No session for candidate {candidate_id}"))
            })?;
            return Ok(Json(AnswerResponse {
                recorded: false,
                evaluation: None,
                session: SessionView::of(&session, Utc::now()),
                summary: None,
            }));
        }
        Err(e) => return Err(e),
    };

    let record = AnswerRecord {
        question_index: pending.index,
        question_text: pending.question_text.clone(),
        answer_text: request.answer.clone(),
        score: evaluation.score,
        feedback: evaluation.feedback.clone(),
        tier: pending.tier,
        time_used_secs: pending.time_used_secs,
        timed_out: false,
    };
    persist_answer(&state, candidate_id, &record).await?;

    let summary = apply_advance(&state, candidate_id, &advance).await?;

    let session = state.sessions.fetch(candidate_id).await.ok_or_else(|| {
        AppError::NotFound(format!("No session for candidate {candidate_id}"))
    })?;
    Ok(Json(AnswerResponse {
        recorded: true,
        evaluation: Some(evaluation),
        session: SessionView::of(&session, Utc::now()),
        summary,
    }))
}

/// POST /api/v1/interviews/:candidate_id/pause
pub async fn pause_interview(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let now = Utc::now();
    sweep_expired(&state).await;
    state.sessions.mutate(candidate_id, |s| s.pause(now)).await?;
    let session = state.sessions.fetch(candidate_id).await.ok_or_else(|| {
        AppError::NotFound(format!("No session for candidate {candidate_id}"))
    })?;
    Ok(Json(SessionView::of(&session, now)))
}

/// POST /api/v1/interviews/:candidate_id/resume
pub async fn resume_interview(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let now = Utc::now();
    state.sessions.mutate(candidate_id, |s| s.resume(now)).await?;
    let session = state.sessions.fetch(candidate_id).await.ok_or_else(|| {
        AppError::NotFound(format!("No session for candidate {candidate_id}"))
    })?;
    Ok(Json(SessionView::of(&session, now)))
}

// ────────────────────────────────────────────────────────────────────────────
// Shared side effects (handlers + expiry sweeper)
// ────────────────────────────────────────────────────────────────────────────

/// Auto-submits empty answers for every overdue session and applies their
/// side effects. Runs on the 1 s sweeper and lazily before session reads.
pub(crate) async fn sweep_expired(state: &AppState) {
    let expired = state.sessions.expire_overdue(Utc::now()).await;
    for (candidate_id, record, advance) in expired {
        info!(
            "Question {} timed out for candidate {candidate_id}",
            record.question_index
        );
        if let Err(e) = persist_answer(state, candidate_id, &record).await {
            error!("Failed to persist timed-out answer for {candidate_id}: {e}");
        }
        if let Err(e) = apply_advance(state, candidate_id, &advance).await {
            error!("Failed to advance session for {candidate_id}: {e}");
        }
    }
}

/// Writes an answer row and mirrors the exchange into the chat transcript.
async fn persist_answer(
    state: &AppState,
    candidate_id: Uuid,
    record: &AnswerRecord,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO answers
            (id, candidate_id, question_index, question_text, answer_text,
             score, feedback, tier, time_used_secs, timed_out)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(candidate_id)
    .bind(record.question_index as i32)
    .bind(&record.question_text)
    .bind(&record.answer_text)
    .bind(record.score)
    .bind(&record.feedback)
    .bind(record.tier.as_str())
    .bind(record.time_used_secs as i32)
    .bind(record.timed_out)
    .execute(&state.db)
    .await?;

    record_chat(
        state,
        candidate_id,
        "candidate",
        &record.answer_text,
        Some(record.question_index as i32),
        Some(record.score),
    )
    .await
}

/// After an answer lands: install the next question, or finalize the
/// candidate. Returns the rendered summary when the interview finished.
async fn apply_advance(
    state: &AppState,
    candidate_id: Uuid,
    advance: &Advance,
) -> Result<Option<String>, AppError> {
    match advance {
        Advance::Next { index } => {
            let candidate = fetch_candidate(state, candidate_id).await?;
            install_next_question(state, candidate_id, *index, candidate.resume_text.as_deref())
                .await?;
            Ok(None)
        }
        Advance::Finished { final_score } => {
            let summary = finalize_candidate(state, candidate_id, *final_score).await?;
            Ok(Some(summary))
        }
    }
}

/// Generates a question via the provider chain and installs it, arming the
/// timer. Mirrors the question into the chat transcript.
async fn install_next_question(
    state: &AppState,
    candidate_id: Uuid,
    index: usize,
    resume_text: Option<&str>,
) -> Result<(), AppError> {
    let tier = QuestionTier::for_index(index);
    let context = resume_text.map(|text| truncate_chars(text, RESUME_CONTEXT_MAX_CHARS));
    let question = state
        .chain
        .generate_question(tier, index, context.as_deref())
        .await;

    let body = question.text.clone();
    match state
        .sessions
        .mutate(candidate_id, |s| s.install_question(question, Utc::now()))
        .await
    {
        Ok(()) => {}
        // the session moved on (reset or removed) while generating — drop it
        Err(AppError::Session(_)) | Err(AppError::NotFound(_)) => return Ok(()),
        Err(e) => return Err(e),
    }

    record_chat(
        state,
        candidate_id,
        "assistant",
        &body,
        Some(index as i32),
        None,
    )
    .await
}

/// Marks the candidate completed, stores score and summary, and notifies
/// the dashboard.
async fn finalize_candidate(
    state: &AppState,
    candidate_id: Uuid,
    final_score: f64,
) -> Result<String, AppError> {
    let candidate = fetch_candidate(state, candidate_id).await?;
    let session = state
        .sessions
        .fetch(candidate_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No session for candidate {candidate_id}")))?;

    let summary = render_summary(candidate.name.as_deref(), &session.answers);

    sqlx::query(
        r#"
        UPDATE candidates
        SET status = $1, final_score = $2, summary = $3, updated_at = now()
        WHERE id = $4
        "#,
    )
    .bind(CandidateStatus::Completed.as_str())
    .bind(final_score)
    .bind(&summary)
    .bind(candidate_id)
    .execute(&state.db)
    .await?;

    let display_name = candidate.name.as_deref().unwrap_or("A candidate");
    sqlx::query(
        "INSERT INTO notifications (id, candidate_id, kind, message) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(candidate_id)
    .bind("candidate_completed")
    .bind(format!(
        "{display_name} completed the assessment: {final_score:.1}/30"
    ))
    .execute(&state.db)
    .await?;

    info!("Candidate {candidate_id} finished with score {final_score:.1}");
    Ok(summary)
}

async fn record_chat(
    state: &AppState,
    candidate_id: Uuid,
    sender: &str,
    body: &str,
    question_index: Option<i32>,
    score: Option<f64>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO chat_messages (id, candidate_id, sender, body, question_index, score)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(candidate_id)
    .bind(sender)
    .bind(body)
    .bind(question_index)
    .bind(score)
    .execute(&state.db)
    .await?;
    Ok(())
}

pub(crate) async fn fetch_candidate(
    state: &AppState,
    candidate_id: Uuid,
) -> Result<CandidateRow, AppError> {
    sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1")
        .bind(candidate_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
}

pub(crate) fn missing_fields_of(candidate: &CandidateRow) -> Vec<ProfileField> {
    let mut missing = Vec::new();
    if candidate.name.as_deref().map_or(true, |s| s.trim().is_empty()) {
        missing.push(ProfileField::Name);
    }
    if candidate.email.as_deref().map_or(true, |s| s.trim().is_empty()) {
        missing.push(ProfileField::Email);
    }
    if candidate.phone.as_deref().map_or(true, |s| s.trim().is_empty()) {
        missing.push(ProfileField::Phone);
    }
    missing
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
