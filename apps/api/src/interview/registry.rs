//! Per-candidate session registry.
//!
//! Live sessions are held in-process behind an async `RwLock` and keyed by
//! candidate id. Every mutation is snapshotted to Redis as JSON (best
//! effort), so a restarted process rehydrates a candidate mid-interview —
//! the "welcome back" flow. Remaining time is deliberately not recovered;
//! only phase, index, and recorded answers survive.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::session::{Advance, AnswerRecord, InterviewSession, SessionError};

const SNAPSHOT_TTL_SECS: u64 = 48 * 60 * 60;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, InterviewSession>>,
    redis: redis::Client,
}

impl SessionRegistry {
    pub fn new(redis: redis::Client) -> Self {
        SessionRegistry {
            sessions: RwLock::new(HashMap::new()),
            redis,
        }
    }

    /// Returns a copy of the session, rehydrating from Redis when the
    /// process has no live entry.
    pub async fn fetch(&self, candidate_id: Uuid) -> Option<InterviewSession> {
        if let Some(session) = self.sessions.read().await.get(&candidate_id) {
            return Some(session.clone());
        }
        let session = self.rehydrate(candidate_id).await?;
        let mut map = self.sessions.write().await;
        // another task may have rehydrated while we were reading Redis
        Some(
            map.entry(candidate_id)
                .or_insert(session)
                .clone(),
        )
    }

    pub async fn insert(&self, session: InterviewSession) {
        let candidate_id = session.candidate_id;
        let snapshot = session.clone();
        self.sessions.write().await.insert(candidate_id, session);
        self.snapshot(&snapshot).await;
    }

    /// Applies one state-machine operation under the write lock and
    /// snapshots the result. Session errors pass through untouched.
    pub async fn mutate<T, F>(&self, candidate_id: Uuid, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut InterviewSession) -> Result<T, SessionError>,
    {
        // make sure a Redis-only session is loaded before taking the lock
        if self.fetch(candidate_id).await.is_none() {
            return Err(AppError::NotFound(format!(
                "No interview session for candidate {candidate_id}"
            )));
        }
        let (result, snapshot) = {
            let mut map = self.sessions.write().await;
            let session = map.get_mut(&candidate_id).ok_or_else(|| {
                AppError::NotFound(format!("No interview session for candidate {candidate_id}"))
            })?;
            let result = op(session)?;
            (result, session.clone())
        };
        self.snapshot(&snapshot).await;
        Ok(result)
    }

    pub async fn remove(&self, candidate_id: Uuid) {
        self.sessions.write().await.remove(&candidate_id);
        match self.redis.get_multiplexed_async_connection().await {
            Ok(mut con) => {
                let key = snapshot_key(candidate_id);
                if let Err(e) = con.del::<_, ()>(&key).await {
                    warn!("Failed to delete session snapshot {key}: {e}");
                }
            }
            Err(e) => warn!("Redis unavailable while deleting snapshot: {e}"),
        }
    }

    /// Auto-submits empty answers for every session whose deadline has
    /// passed. Called by the 1 s sweeper and before any session read.
    pub async fn expire_overdue(
        &self,
        now: DateTime<Utc>,
    ) -> Vec<(Uuid, AnswerRecord, Advance)> {
        let (expired, snapshots) = {
            let mut map = self.sessions.write().await;
            let mut expired = Vec::new();
            let mut snapshots = Vec::new();
            for (id, session) in map.iter_mut() {
                if let Some((record, advance)) = session.expire_if_overdue(now) {
                    expired.push((*id, record, advance));
                    snapshots.push(session.clone());
                }
            }
            (expired, snapshots)
        };
        for snapshot in &snapshots {
            self.snapshot(snapshot).await;
        }
        expired
    }

    async fn rehydrate(&self, candidate_id: Uuid) -> Option<InterviewSession> {
        let mut con = match self.redis.get_multiplexed_async_connection().await {
            Ok(con) => con,
            Err(e) => {
                warn!("Redis unavailable while rehydrating session: {e}");
                return None;
            }
        };
        let key = snapshot_key(candidate_id);
        let raw: Option<String> = match con.get(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read session snapshot {key}: {e}");
                return None;
            }
        };
        let raw = raw?;
        match serde_json::from_str::<InterviewSession>(&raw) {
            Ok(mut session) => {
                // elapsed time is not recovered across restarts; the live
                // question's timer restarts with its full budget
                session.rearm_after_rehydrate(Utc::now());
                Some(session)
            }
            Err(e) => {
                warn!("Discarding unreadable session snapshot {key}: {e}");
                None
            }
        }
    }

    /// Best effort — a Redis outage degrades the "welcome back" flow, it
    /// never fails an interview operation.
    async fn snapshot(&self, session: &InterviewSession) {
        let key = snapshot_key(session.candidate_id);
        let json = match serde_json::to_string(session) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize session snapshot {key}: {e}");
                return;
            }
        };
        match self.redis.get_multiplexed_async_connection().await {
            Ok(mut con) => {
                if let Err(e) = con.set_ex::<_, _, ()>(&key, json, SNAPSHOT_TTL_SECS).await {
                    warn!("Failed to write session snapshot {key}: {e}");
                }
            }
            Err(e) => warn!("Redis unavailable while writing snapshot: {e}"),
        }
    }
}

fn snapshot_key(candidate_id: Uuid) -> String {
    format!("crisp:interview:{candidate_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GeneratedQuestion;
    use crate::interview::phase::InterviewPhase;
    use crate::interview::tier::QuestionTier;
    use chrono::{Duration, TimeZone};

    // Snapshot writes are best effort: with no Redis server behind the
    // client, the registry still serves the in-process map.
    fn registry() -> SessionRegistry {
        SessionRegistry::new(redis::Client::open("redis://127.0.0.1:1/").unwrap())
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn active_session(candidate_id: Uuid) -> InterviewSession {
        let mut session = InterviewSession::new(candidate_id, vec![]);
        session.open().unwrap();
        session.start(t0()).unwrap();
        session
            .install_question(
                GeneratedQuestion {
                    index: 0,
                    tier: QuestionTier::Easy,
                    text: "Q1?".to_string(),
                    options: None,
                },
                t0(),
            )
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_insert_then_fetch_returns_session() {
        let registry = registry();
        let id = Uuid::new_v4();
        registry.insert(active_session(id)).await;
        let session = registry.fetch(id).await.unwrap();
        assert_eq!(session.candidate_id, id);
        assert_eq!(session.phase, InterviewPhase::Active);
    }

    #[tokio::test]
    async fn test_fetch_unknown_candidate_is_none() {
        let registry = registry();
        assert!(registry.fetch(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_mutate_applies_operation() {
        let registry = registry();
        let id = Uuid::new_v4();
        registry.insert(active_session(id)).await;
        registry
            .mutate(id, |s| s.pause(t0()))
            .await
            .unwrap();
        let session = registry.fetch(id).await.unwrap();
        assert_eq!(session.phase, InterviewPhase::Paused);
    }

    #[tokio::test]
    async fn test_mutate_missing_session_is_not_found() {
        let registry = registry();
        let err = registry
            .mutate(Uuid::new_v4(), |s| s.pause(t0()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_expire_overdue_sweeps_only_overdue_sessions() {
        let registry = registry();
        let overdue = Uuid::new_v4();
        let fresh = Uuid::new_v4();
        registry.insert(active_session(overdue)).await;
        registry.insert(active_session(fresh)).await;
        // push only one session past its 20 s easy budget
        registry
            .mutate(fresh, |s| {
                s.deadline = Some(t0() + Duration::seconds(600));
                Ok(())
            })
            .await
            .unwrap();

        let expired = registry.expire_overdue(t0() + Duration::seconds(21)).await;
        assert_eq!(expired.len(), 1);
        let (id, record, advance) = &expired[0];
        assert_eq!(*id, overdue);
        assert!(record.timed_out);
        assert_eq!(*advance, Advance::Next { index: 1 });
    }

    #[tokio::test]
    async fn test_remove_forgets_session() {
        let registry = registry();
        let id = Uuid::new_v4();
        registry.insert(active_session(id)).await;
        registry.remove(id).await;
        assert!(registry.fetch(id).await.is_none());
    }
}
