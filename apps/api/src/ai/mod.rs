//! AI provider adapters.
//!
//! Every hosted-LLM interaction goes through the `AiProvider` trait and the
//! priority-ordered `ProviderChain` — no handler talks to a provider
//! directly. Adapters return raw wire-scale results; the chain owns scale
//! normalization and the static fallback.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::interview::tier::QuestionTier;

pub mod chain;
pub mod fallback;
pub mod gemini;
pub mod openai_compat;
pub mod prompts;

pub use chain::ProviderChain;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider returned empty content")]
    EmptyContent,
}

/// A question ready to be installed into a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub index: usize,
    pub tier: QuestionTier,
    pub text: String,
    /// Multiple-choice options, when the provider supplies them.
    pub options: Option<Vec<String>>,
}

/// Raw question payload as parsed from a provider reply.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionDraft {
    pub question: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// Raw evaluation as parsed from a provider reply. `score` is on the
/// provider-facing 0–100 scale; the chain converts to the canonical 0–5.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvaluation {
    pub score: f64,
    pub feedback: String,
}

/// A scored answer on the canonical 0.0–5.0 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerEvaluation {
    pub score: f64,
    pub feedback: String,
}

/// One prior exchange handed to the chatbot for context.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: String,
    pub text: String,
}

/// Contract every hosted-LLM adapter implements. One attempt per call —
/// retry policy (try the next provider) lives in the chain.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate_question(
        &self,
        tier: QuestionTier,
        index: usize,
        resume_context: Option<&str>,
    ) -> Result<QuestionDraft, ProviderError>;

    async fn score_answer(
        &self,
        question: &str,
        answer: &str,
        tier: QuestionTier,
    ) -> Result<RawEvaluation, ProviderError>;

    async fn chat_reply(
        &self,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, ProviderError>;
}

/// Parses the JSON object a model was asked to produce, tolerating the two
/// failure shapes models actually emit: markdown code fences around the
/// object, and prose before/after it.
pub fn parse_embedded_json<T: DeserializeOwned>(text: &str) -> Result<T, ProviderError> {
    let stripped = strip_json_fences(text);
    match serde_json::from_str(stripped) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let start = stripped.find('{');
            let end = stripped.rfind('}');
            if let (Some(start), Some(end)) = (start, end) {
                if start < end {
                    return serde_json::from_str(&stripped[start..=end])
                        .map_err(ProviderError::Parse);
                }
            }
            Err(ProviderError::Parse(first_err))
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
