use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::ai::ProviderChain;
use crate::config::Config;
use crate::interview::registry::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    /// Priority-ordered AI providers with static fallback. The only path to
    /// a hosted LLM in the service.
    pub chain: Arc<ProviderChain>,
    /// Per-candidate interview sessions (in-process, Redis-snapshotted).
    pub sessions: Arc<SessionRegistry>,
    pub config: Config,
}
