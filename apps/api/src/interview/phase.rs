use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of one candidate's interview session. Keyed per session —
/// there is no process-global "current interview".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterviewPhase {
    Idle,
    CollectingInfo,
    Ready,
    Active,
    Paused,
    Finished,
}

impl InterviewPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            InterviewPhase::Idle => "idle",
            InterviewPhase::CollectingInfo => "collecting-info",
            InterviewPhase::Ready => "ready",
            InterviewPhase::Active => "active",
            InterviewPhase::Paused => "paused",
            InterviewPhase::Finished => "finished",
        }
    }
}

impl fmt::Display for InterviewPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_serde_kebab_case() {
        let json = serde_json::to_string(&InterviewPhase::CollectingInfo).unwrap();
        assert_eq!(json, "\"collecting-info\"");
        let back: InterviewPhase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, InterviewPhase::CollectingInfo);
    }
}
