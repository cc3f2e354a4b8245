//! Adapter for the Google Gemini `generateContent` API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::prompts::{
    CHAT_SYSTEM, EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM, QUESTION_PROMPT_TEMPLATE,
    QUESTION_SYSTEM,
};
use crate::ai::{
    parse_embedded_json, AiProvider, ChatTurn, ProviderError, QuestionDraft, RawEvaluation,
};
use crate::interview::tier::QuestionTier;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        GeminiProvider {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            model,
        }
    }

    async fn call(&self, system: &str, turns: &[(&str, &str)]) -> Result<String, ProviderError> {
        let request_body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system }],
            },
            contents: turns
                .iter()
                .map(|&(role, text)| Content {
                    role: Some(role),
                    parts: vec![Part { text }],
                })
                .collect(),
        };

        let url = format!(
            "{GEMINI_BASE_URL}/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let response = self.client.post(url).json(&request_body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let content = parsed
            .candidates
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|parts| {
                let text: String = parts.into_iter().filter_map(|p| p.text).collect();
                if text.trim().is_empty() {
                    None
                } else {
                    Some(text)
                }
            })
            .ok_or(ProviderError::EmptyContent)?;

        debug!(provider = "gemini", "generateContent succeeded");
        Ok(content)
    }

    async fn call_user_prompt(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        self.call(system, &[("user", prompt)]).await
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate_question(
        &self,
        tier: QuestionTier,
        index: usize,
        resume_context: Option<&str>,
    ) -> Result<QuestionDraft, ProviderError> {
        let prompt = QUESTION_PROMPT_TEMPLATE
            .replace("{tier}", tier.as_str())
            .replace("{position}", &(index + 1).to_string())
            .replace("{resume_context}", resume_context.unwrap_or(""));
        let text = self.call_user_prompt(QUESTION_SYSTEM, &prompt).await?;
        parse_embedded_json(&text)
    }

    async fn score_answer(
        &self,
        question: &str,
        answer: &str,
        tier: QuestionTier,
    ) -> Result<RawEvaluation, ProviderError> {
        let prompt = EVALUATION_PROMPT_TEMPLATE
            .replace("{tier}", tier.as_str())
            .replace("{question}", question)
            .replace("{answer}", answer);
        let text = self.call_user_prompt(EVALUATION_SYSTEM, &prompt).await?;
        parse_embedded_json(&text)
    }

    async fn chat_reply(
        &self,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, ProviderError> {
        // Gemini uses "model" for assistant turns.
        let mut turns: Vec<(&str, &str)> = history
            .iter()
            .map(|turn| {
                let role = if turn.role == "assistant" { "model" } else { "user" };
                (role, turn.text.as_str())
            })
            .collect();
        turns.push(("user", message));
        self.call(CHAT_SYSTEM, &turns).await
    }
}
