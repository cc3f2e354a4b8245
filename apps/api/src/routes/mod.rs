pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::chat::handlers as chat;
use crate::dashboard::handlers as dashboard;
use crate::interview::handlers as interview;
use crate::resume::handlers as resume;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth (interviewers)
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        // Resume intake (POST) and dashboard list (GET)
        .route(
            "/api/v1/candidates",
            post(resume::upload_resume).get(dashboard::list_candidates),
        )
        // Interview flow (candidate side)
        .route(
            "/api/v1/interviews/:candidate_id/open",
            post(interview::open_session),
        )
        .route(
            "/api/v1/interviews/:candidate_id",
            get(interview::get_session),
        )
        .route(
            "/api/v1/interviews/:candidate_id/profile",
            post(interview::supply_profile_field),
        )
        .route(
            "/api/v1/interviews/:candidate_id/start",
            post(interview::start_interview),
        )
        .route(
            "/api/v1/interviews/:candidate_id/answer",
            post(interview::submit_answer),
        )
        .route(
            "/api/v1/interviews/:candidate_id/pause",
            post(interview::pause_interview),
        )
        .route(
            "/api/v1/interviews/:candidate_id/resume",
            post(interview::resume_interview),
        )
        // Candidate chat
        .route("/api/v1/chat/:candidate_id", get(chat::get_transcript))
        .route(
            "/api/v1/chat/:candidate_id/messages",
            post(chat::send_message),
        )
        // Dashboard (interviewers, bearer token required)
        .route("/api/v1/candidates/:id", get(dashboard::get_candidate))
        .route(
            "/api/v1/candidates/:id/reset",
            post(dashboard::reset_candidate),
        )
        .route(
            "/api/v1/candidates/:id/publish",
            post(dashboard::publish_scores),
        )
        .route(
            "/api/v1/notifications",
            get(dashboard::list_notifications),
        )
        .route(
            "/api/v1/notifications/:id/read",
            patch(dashboard::mark_notification_read),
        )
        // resumes may exceed axum's 2 MB default body limit
        .layer(DefaultBodyLimit::max(6 * 1024 * 1024))
        .with_state(state)
}
