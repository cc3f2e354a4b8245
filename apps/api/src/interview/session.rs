//! The interview progression state machine.
//!
//! One `InterviewSession` per candidate, keyed in the registry — phase and
//! timer state are never process-global. All time-dependent operations take
//! `now` explicitly so the transition logic stays pure and testable.
//!
//! Timer semantics: the countdown is a deadline, armed when a question is
//! installed. Question-generation latency does not consume candidate time.
//! A passed deadline auto-records an empty answer for the current question
//! and advances exactly as a submission would.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::ai::GeneratedQuestion;
use crate::interview::phase::InterviewPhase;
use crate::interview::summary;
use crate::interview::tier::{QuestionTier, QUESTION_COUNT};
use crate::interview::validation::{validate_field, ProfileField};

pub const TIMEOUT_FEEDBACK: &str = "No answer was submitted before the timer expired.";

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("invalid {field}: {reason}")]
    InvalidField { field: ProfileField, reason: String },

    #[error("{0} is not pending collection")]
    FieldNotMissing(ProfileField),

    #[error("operation requires phase '{expected}', session is '{actual}'")]
    WrongPhase {
        expected: &'static str,
        actual: InterviewPhase,
    },

    #[error("submission targets question {submitted}, session is at question {current}")]
    StaleSubmission { submitted: usize, current: usize },

    #[error("the current question is still being prepared")]
    QuestionPending,

    #[error("a question is already installed for the current index")]
    QuestionAlreadyInstalled,
}

/// One recorded answer. `score` is on the canonical 0.0–5.0 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_index: usize,
    pub question_text: String,
    pub answer_text: String,
    pub score: f64,
    pub feedback: String,
    pub tier: QuestionTier,
    pub time_used_secs: u32,
    pub timed_out: bool,
}

/// What happened after an answer was recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Moved to the next question; a new question must be generated and
    /// installed before the timer arms.
    Next { index: usize },
    /// Index 5 was answered; the interview is over.
    Finished { final_score: f64 },
}

/// Snapshot taken at submission time, before the (async) scoring call.
/// `record_answer` validates against it so a timer expiry or reset that
/// lands mid-scoring wins and the late result is discarded.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub index: usize,
    pub question_text: String,
    pub tier: QuestionTier,
    pub time_used_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub candidate_id: Uuid,
    pub phase: InterviewPhase,
    pub current_index: usize,
    pub current_question: Option<GeneratedQuestion>,
    pub answers: Vec<AnswerRecord>,
    pub missing_fields: Vec<ProfileField>,
    /// Armed while a question is live in the `Active` phase.
    pub deadline: Option<DateTime<Utc>>,
    /// Banked remaining seconds while `Paused`.
    pub paused_remaining_secs: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
}

impl InterviewSession {
    pub fn new(candidate_id: Uuid, missing_fields: Vec<ProfileField>) -> Self {
        InterviewSession {
            candidate_id,
            phase: InterviewPhase::Idle,
            current_index: 0,
            current_question: None,
            answers: Vec::new(),
            missing_fields,
            deadline: None,
            paused_remaining_secs: None,
            started_at: None,
        }
    }

    /// `idle → collecting-info` when identity fields are missing,
    /// `idle → ready` otherwise.
    pub fn open(&mut self) -> Result<(), SessionError> {
        self.require_phase(InterviewPhase::Idle, "idle")?;
        self.phase = if self.missing_fields.is_empty() {
            InterviewPhase::Ready
        } else {
            InterviewPhase::CollectingInfo
        };
        Ok(())
    }

    /// Validates and accepts one missing identity field. Invalid input
    /// leaves the session untouched (the same field is re-prompted).
    /// Returns the normalized value for persistence.
    pub fn supply_field(
        &mut self,
        field: ProfileField,
        value: &str,
    ) -> Result<String, SessionError> {
        self.require_phase(InterviewPhase::CollectingInfo, "collecting-info")?;
        if !self.missing_fields.contains(&field) {
            return Err(SessionError::FieldNotMissing(field));
        }
        let normalized =
            validate_field(field, value).map_err(|reason| SessionError::InvalidField {
                field,
                reason,
            })?;
        self.missing_fields.retain(|f| *f != field);
        if self.missing_fields.is_empty() {
            self.phase = InterviewPhase::Ready;
        }
        Ok(normalized)
    }

    /// `ready → active` at question 0. The timer arms when the first
    /// question is installed, not here.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.require_phase(InterviewPhase::Ready, "ready")?;
        self.phase = InterviewPhase::Active;
        self.current_index = 0;
        self.started_at = Some(now);
        Ok(())
    }

    /// Attaches the generated question for the current index and arms the
    /// deadline (or banks the full budget if the session is paused).
    pub fn install_question(
        &mut self,
        question: GeneratedQuestion,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.phase != InterviewPhase::Active && self.phase != InterviewPhase::Paused {
            return Err(SessionError::WrongPhase {
                expected: "active",
                actual: self.phase,
            });
        }
        if question.index != self.current_index {
            return Err(SessionError::StaleSubmission {
                submitted: question.index,
                current: self.current_index,
            });
        }
        if self.current_question.is_some() {
            return Err(SessionError::QuestionAlreadyInstalled);
        }
        let budget = question.tier.time_budget_secs();
        self.current_question = Some(question);
        if self.phase == InterviewPhase::Active {
            self.deadline = Some(now + Duration::seconds(i64::from(budget)));
        } else {
            self.paused_remaining_secs = Some(budget);
        }
        Ok(())
    }

    /// Seconds left on the current question, clamped at zero.
    /// `None` when no timer is running (no question installed, or a phase
    /// without a timer).
    pub fn time_remaining_secs(&self, now: DateTime<Utc>) -> Option<u32> {
        match self.phase {
            InterviewPhase::Active => self.deadline.map(|d| {
                let left = (d - now).num_seconds();
                u32::try_from(left.max(0)).unwrap_or(0)
            }),
            InterviewPhase::Paused => self.paused_remaining_secs,
            _ => None,
        }
    }

    /// Snapshot of the live question for a submission about to be scored.
    pub fn begin_submission(&self, now: DateTime<Utc>) -> Result<PendingSubmission, SessionError> {
        self.require_phase(InterviewPhase::Active, "active")?;
        let question = self
            .current_question
            .as_ref()
            .ok_or(SessionError::QuestionPending)?;
        let budget = question.tier.time_budget_secs();
        let remaining = self.time_remaining_secs(now).unwrap_or(0);
        Ok(PendingSubmission {
            index: question.index,
            question_text: question.text.clone(),
            tier: question.tier,
            time_used_secs: budget.saturating_sub(remaining),
        })
    }

    /// Appends a scored answer and advances. Rejects submissions whose
    /// index no longer matches the session (expired or reset in between).
    pub fn record_answer(
        &mut self,
        pending: &PendingSubmission,
        answer_text: String,
        score: f64,
        feedback: String,
    ) -> Result<Advance, SessionError> {
        self.require_phase(InterviewPhase::Active, "active")?;
        if pending.index != self.current_index || self.current_question.is_none() {
            return Err(SessionError::StaleSubmission {
                submitted: pending.index,
                current: self.current_index,
            });
        }
        self.push_answer(AnswerRecord {
            question_index: pending.index,
            question_text: pending.question_text.clone(),
            answer_text,
            score,
            feedback,
            tier: pending.tier,
            time_used_secs: pending.time_used_secs,
            timed_out: false,
        })
    }

    /// Auto-submits an empty answer when the deadline has passed.
    /// Returns the recorded answer and the advance, or `None` when nothing
    /// is overdue.
    pub fn expire_if_overdue(
        &mut self,
        now: DateTime<Utc>,
    ) -> Option<(AnswerRecord, Advance)> {
        if self.phase != InterviewPhase::Active {
            return None;
        }
        let deadline = self.deadline?;
        let question = self.current_question.as_ref()?;
        if now < deadline {
            return None;
        }
        let record = AnswerRecord {
            question_index: question.index,
            question_text: question.text.clone(),
            answer_text: String::new(),
            score: 0.0,
            feedback: TIMEOUT_FEEDBACK.to_string(),
            tier: question.tier,
            time_used_secs: question.tier.time_budget_secs(),
            timed_out: true,
        };
        let advance = self
            .push_answer(record.clone())
            .expect("phase checked above");
        Some((record, advance))
    }

    /// `active → paused`, banking the remaining time.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.require_phase(InterviewPhase::Active, "active")?;
        self.paused_remaining_secs = self.time_remaining_secs(now);
        self.deadline = None;
        self.phase = InterviewPhase::Paused;
        Ok(())
    }

    /// `paused → active`, re-arming the deadline from the banked value.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.require_phase(InterviewPhase::Paused, "paused")?;
        self.phase = InterviewPhase::Active;
        if self.current_question.is_some() {
            if let Some(remaining) = self.paused_remaining_secs.take() {
                self.deadline = Some(now + Duration::seconds(i64::from(remaining)));
            }
        }
        Ok(())
    }

    /// After a snapshot rehydrate (process restart or browser return),
    /// elapsed time is not recovered: the current question's timer restarts
    /// with its full budget instead of expiring retroactively.
    pub fn rearm_after_rehydrate(&mut self, now: DateTime<Utc>) {
        if self.phase != InterviewPhase::Active {
            return;
        }
        self.deadline = self.current_question.as_ref().map(|question| {
            now + Duration::seconds(i64::from(question.tier.time_budget_secs()))
        });
    }

    /// Clears all progress and re-opens from the given missing fields.
    /// Valid from any phase.
    pub fn reset(&mut self, missing_fields: Vec<ProfileField>) {
        self.current_index = 0;
        self.current_question = None;
        self.answers.clear();
        self.deadline = None;
        self.paused_remaining_secs = None;
        self.started_at = None;
        self.missing_fields = missing_fields;
        self.phase = if self.missing_fields.is_empty() {
            InterviewPhase::Ready
        } else {
            InterviewPhase::CollectingInfo
        };
    }

    pub fn final_score(&self) -> f64 {
        summary::final_score(&self.answers)
    }

    fn push_answer(&mut self, record: AnswerRecord) -> Result<Advance, SessionError> {
        self.require_phase(InterviewPhase::Active, "active")?;
        let index = record.question_index;
        self.answers.push(record);
        self.current_question = None;
        self.deadline = None;
        if index + 1 >= QUESTION_COUNT {
            self.phase = InterviewPhase::Finished;
            Ok(Advance::Finished {
                final_score: self.final_score(),
            })
        } else {
            self.current_index = index + 1;
            Ok(Advance::Next {
                index: self.current_index,
            })
        }
    }

    fn require_phase(
        &self,
        expected: InterviewPhase,
        name: &'static str,
    ) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                expected: name,
                actual: self.phase,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn question(index: usize) -> GeneratedQuestion {
        GeneratedQuestion {
            index,
            tier: QuestionTier::for_index(index),
            text: format!("Question {}?", index + 1),
            options: None,
        }
    }

    fn active_session_at(index: usize) -> InterviewSession {
        let mut session = InterviewSession::new(Uuid::new_v4(), vec![]);
        session.open().unwrap();
        session.start(t0()).unwrap();
        for i in 0..index {
            session.install_question(question(i), t0()).unwrap();
            let pending = session.begin_submission(t0()).unwrap();
            session
                .record_answer(&pending, "answer".to_string(), 3.0, "ok".to_string())
                .unwrap();
        }
        session
    }

    #[test]
    fn test_open_with_missing_fields_collects_info() {
        let mut session = InterviewSession::new(Uuid::new_v4(), vec![ProfileField::Email]);
        session.open().unwrap();
        assert_eq!(session.phase, InterviewPhase::CollectingInfo);
    }

    #[test]
    fn test_open_with_complete_profile_is_ready() {
        let mut session = InterviewSession::new(Uuid::new_v4(), vec![]);
        session.open().unwrap();
        assert_eq!(session.phase, InterviewPhase::Ready);
    }

    #[test]
    fn test_invalid_field_reprompts_without_advancing() {
        let mut session = InterviewSession::new(Uuid::new_v4(), vec![ProfileField::Email]);
        session.open().unwrap();
        let err = session.supply_field(ProfileField::Email, "not-an-email");
        assert!(matches!(err, Err(SessionError::InvalidField { .. })));
        assert_eq!(session.phase, InterviewPhase::CollectingInfo);
        assert_eq!(session.missing_fields, vec![ProfileField::Email]);
    }

    #[test]
    fn test_supplying_last_field_moves_to_ready() {
        let mut session = InterviewSession::new(
            Uuid::new_v4(),
            vec![ProfileField::Name, ProfileField::Email],
        );
        session.open().unwrap();
        session.supply_field(ProfileField::Name, "Jane Doe").unwrap();
        assert_eq!(session.phase, InterviewPhase::CollectingInfo);
        session
            .supply_field(ProfileField::Email, "jane@example.com")
            .unwrap();
        assert_eq!(session.phase, InterviewPhase::Ready);
    }

    #[test]
    fn test_supplying_field_not_missing_is_rejected() {
        let mut session = InterviewSession::new(Uuid::new_v4(), vec![ProfileField::Phone]);
        session.open().unwrap();
        let err = session.supply_field(ProfileField::Email, "jane@example.com");
        assert_eq!(err, Err(SessionError::FieldNotMissing(ProfileField::Email)));
    }

    #[test]
    fn test_start_requires_ready() {
        let mut session = InterviewSession::new(Uuid::new_v4(), vec![ProfileField::Email]);
        session.open().unwrap();
        assert!(matches!(
            session.start(t0()),
            Err(SessionError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_timer_arms_on_install_not_on_start() {
        let mut session = active_session_at(0);
        assert_eq!(session.time_remaining_secs(t0()), None);
        session.install_question(question(0), t0()).unwrap();
        assert_eq!(session.time_remaining_secs(t0()), Some(20));
    }

    #[test]
    fn test_submission_advances_and_rearms_next_tier_budget() {
        let mut session = active_session_at(1);
        session.install_question(question(1), t0()).unwrap();
        let pending = session.begin_submission(t0()).unwrap();
        let advance = session
            .record_answer(&pending, "my answer".to_string(), 4.0, "good".to_string())
            .unwrap();
        assert_eq!(advance, Advance::Next { index: 2 });
        // question 2 is medium tier: installing arms a 60 s deadline
        session.install_question(question(2), t0()).unwrap();
        assert_eq!(session.time_remaining_secs(t0()), Some(60));
    }

    #[test]
    fn test_six_answers_finish_the_interview() {
        let mut session = active_session_at(5);
        session.install_question(question(5), t0()).unwrap();
        let pending = session.begin_submission(t0()).unwrap();
        let advance = session
            .record_answer(&pending, "final".to_string(), 3.5, "ok".to_string())
            .unwrap();
        assert_eq!(
            advance,
            Advance::Finished {
                final_score: 5.0 * 3.0 + 3.5
            }
        );
        assert_eq!(session.phase, InterviewPhase::Finished);
        assert_eq!(session.answers.len(), QUESTION_COUNT);
    }

    #[test]
    fn test_not_finished_until_index_five_is_answered() {
        let session = active_session_at(5);
        assert_eq!(session.phase, InterviewPhase::Active);
        assert_eq!(session.answers.len(), 5);
    }

    #[test]
    fn test_final_score_is_sum_of_answer_scores() {
        let mut session = active_session_at(0);
        let scores = [4.0, 3.5, 3.0, 2.0, 4.0, 3.5];
        for (i, score) in scores.into_iter().enumerate() {
            session.install_question(question(i), t0()).unwrap();
            let pending = session.begin_submission(t0()).unwrap();
            session
                .record_answer(&pending, "a".to_string(), score, "ok".to_string())
                .unwrap();
        }
        assert_eq!(session.final_score(), 20.0);
    }

    #[test]
    fn test_timeout_auto_submits_empty_answer_and_advances() {
        // timer hits zero on question 2 with nothing typed
        let mut session = active_session_at(2);
        session.install_question(question(2), t0()).unwrap();
        let after_budget = t0() + Duration::seconds(60);
        let (record, advance) = session.expire_if_overdue(after_budget).unwrap();
        assert_eq!(record.answer_text, "");
        assert_eq!(record.score, 0.0);
        assert!(record.timed_out);
        assert_eq!(record.time_used_secs, 60);
        assert_eq!(advance, Advance::Next { index: 3 });
        // next question arms a fresh 60 s timer once installed
        session.install_question(question(3), after_budget).unwrap();
        assert_eq!(session.time_remaining_secs(after_budget), Some(60));
    }

    #[test]
    fn test_expiry_on_last_question_finishes() {
        let mut session = active_session_at(5);
        session.install_question(question(5), t0()).unwrap();
        let (_, advance) = session
            .expire_if_overdue(t0() + Duration::seconds(120))
            .unwrap();
        assert!(matches!(advance, Advance::Finished { .. }));
        assert_eq!(session.phase, InterviewPhase::Finished);
    }

    #[test]
    fn test_no_expiry_before_deadline() {
        let mut session = active_session_at(0);
        session.install_question(question(0), t0()).unwrap();
        assert!(session
            .expire_if_overdue(t0() + Duration::seconds(19))
            .is_none());
    }

    #[test]
    fn test_no_expiry_while_question_pending() {
        let mut session = active_session_at(0);
        assert!(session
            .expire_if_overdue(t0() + Duration::seconds(600))
            .is_none());
    }

    #[test]
    fn test_stale_submission_after_expiry_is_discarded() {
        let mut session = active_session_at(0);
        session.install_question(question(0), t0()).unwrap();
        let pending = session.begin_submission(t0()).unwrap();
        session.expire_if_overdue(t0() + Duration::seconds(20)).unwrap();
        let err = session.record_answer(&pending, "late".to_string(), 5.0, "x".to_string());
        assert_eq!(
            err,
            Err(SessionError::StaleSubmission {
                submitted: 0,
                current: 1
            })
        );
        assert_eq!(session.answers.len(), 1);
        assert!(session.answers[0].timed_out);
    }

    #[test]
    fn test_pause_banks_remaining_time_and_resume_rearms() {
        let mut session = active_session_at(4);
        session.install_question(question(4), t0()).unwrap();
        let paused_at = t0() + Duration::seconds(30);
        session.pause(paused_at).unwrap();
        assert_eq!(session.phase, InterviewPhase::Paused);
        assert_eq!(session.time_remaining_secs(paused_at), Some(90));

        // time passing while paused costs nothing
        let resumed_at = paused_at + Duration::seconds(3600);
        session.resume(resumed_at).unwrap();
        assert_eq!(session.phase, InterviewPhase::Active);
        assert_eq!(session.time_remaining_secs(resumed_at), Some(90));
        assert_eq!(session.current_index, 4);
    }

    #[test]
    fn test_pause_requires_active() {
        let mut session = InterviewSession::new(Uuid::new_v4(), vec![]);
        session.open().unwrap();
        assert!(matches!(
            session.pause(t0()),
            Err(SessionError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_install_rejects_wrong_index() {
        let mut session = active_session_at(2);
        let err = session.install_question(question(0), t0());
        assert!(matches!(err, Err(SessionError::StaleSubmission { .. })));
    }

    #[test]
    fn test_install_while_installed_is_rejected() {
        let mut session = active_session_at(0);
        session.install_question(question(0), t0()).unwrap();
        assert_eq!(
            session.install_question(question(0), t0()),
            Err(SessionError::QuestionAlreadyInstalled)
        );
    }

    #[test]
    fn test_install_while_paused_banks_full_budget() {
        let mut session = active_session_at(0);
        session.install_question(question(0), t0()).unwrap();
        let pending = session.begin_submission(t0()).unwrap();
        session
            .record_answer(&pending, "a".to_string(), 2.0, "ok".to_string())
            .unwrap();
        session.pause(t0()).unwrap();
        session.install_question(question(1), t0()).unwrap();
        assert_eq!(session.time_remaining_secs(t0()), Some(20));
        session.resume(t0()).unwrap();
        assert_eq!(session.time_remaining_secs(t0()), Some(20));
    }

    #[test]
    fn test_reset_from_any_phase_clears_progress() {
        let mut session = active_session_at(3);
        session.install_question(question(3), t0()).unwrap();
        session.reset(vec![]);
        assert_eq!(session.phase, InterviewPhase::Ready);
        assert_eq!(session.current_index, 0);
        assert!(session.answers.is_empty());
        assert!(session.current_question.is_none());
        assert_eq!(session.final_score(), 0.0);

        let mut finished = active_session_at(5);
        finished.install_question(question(5), t0()).unwrap();
        let pending = finished.begin_submission(t0()).unwrap();
        finished
            .record_answer(&pending, "x".to_string(), 1.0, "ok".to_string())
            .unwrap();
        finished.reset(vec![ProfileField::Phone]);
        assert_eq!(finished.phase, InterviewPhase::CollectingInfo);
        assert!(finished.answers.is_empty());
    }

    #[test]
    fn test_rehydrate_restarts_timer_instead_of_expiring() {
        let mut session = active_session_at(2);
        session.install_question(question(2), t0()).unwrap();
        // snapshot taken, process restarts an hour later
        let restarted_at = t0() + Duration::seconds(3600);
        session.rearm_after_rehydrate(restarted_at);
        assert_eq!(session.time_remaining_secs(restarted_at), Some(60));
        assert!(session.expire_if_overdue(restarted_at).is_none());
    }

    #[test]
    fn test_rehydrate_without_live_question_leaves_no_timer() {
        let mut session = active_session_at(1);
        session.rearm_after_rehydrate(t0() + Duration::seconds(3600));
        assert_eq!(session.time_remaining_secs(t0()), None);
    }

    #[test]
    fn test_time_remaining_clamps_at_zero() {
        let mut session = active_session_at(0);
        session.install_question(question(0), t0()).unwrap();
        assert_eq!(
            session.time_remaining_secs(t0() + Duration::seconds(500)),
            Some(0)
        );
    }

    #[test]
    fn test_session_snapshot_roundtrip() {
        let mut session = active_session_at(2);
        session.install_question(question(2), t0()).unwrap();
        let json = serde_json::to_string(&session).unwrap();
        let back: InterviewSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.phase, session.phase);
        assert_eq!(back.current_index, 2);
        assert_eq!(back.answers.len(), 2);
    }
}
