use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of questions in every interview.
pub const QUESTION_COUNT: usize = 6;

/// Difficulty tier of a question. A pure function of the question index:
/// 0–1 easy, 2–3 medium, 4–5 hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionTier {
    Easy,
    Medium,
    Hard,
}

impl QuestionTier {
    pub fn for_index(index: usize) -> Self {
        match index {
            0 | 1 => QuestionTier::Easy,
            2 | 3 => QuestionTier::Medium,
            _ => QuestionTier::Hard,
        }
    }

    /// Per-question time budget in seconds.
    pub fn time_budget_secs(self) -> u32 {
        match self {
            QuestionTier::Easy => 20,
            QuestionTier::Medium => 60,
            QuestionTier::Hard => 120,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionTier::Easy => "easy",
            QuestionTier::Medium => "medium",
            QuestionTier::Hard => "hard",
        }
    }
}

impl fmt::Display for QuestionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
