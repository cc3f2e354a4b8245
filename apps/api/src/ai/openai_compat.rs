//! Adapter for OpenAI-compatible chat-completion APIs.
//! Covers both OpenRouter and DeepSeek — same wire format, different base
//! URL, model, and key.

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

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct OpenAiCompatProvider {
    name: &'static str,
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatProvider {
    pub fn openrouter(api_key: String, model: String) -> Self {
        Self::new("openrouter", OPENROUTER_BASE_URL, api_key, model)
    }

    pub fn deepseek(api_key: String, model: String) -> Self {
        Self::new("deepseek", DEEPSEEK_BASE_URL, api_key, model)
    }

    fn new(name: &'static str, base_url: &str, api_key: String, model: String) -> Self {
        OpenAiCompatProvider {
            name,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.to_string(),
            api_key,
            model,
        }
    }

    /// One attempt, no retry — the chain moves on to the next provider on
    /// any failure.
    async fn call<'a>(
        &self,
        system: &'a str,
        messages: Vec<WireMessage<'a>>,
    ) -> Result<String, ProviderError> {
        let mut wire = vec![WireMessage {
            role: "system",
            content: system,
        }];
        wire.extend(messages);

        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages: wire,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ProviderError::EmptyContent)?;

        debug!(provider = self.name, "chat completion succeeded");
        Ok(content)
    }

    async fn call_user_prompt(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        self.call(
            system,
            vec![WireMessage {
                role: "user",
                content: prompt,
            }],
        )
        .await
    }
}

#[async_trait]
impl AiProvider for OpenAiCompatProvider {
    fn name(&self) -> &'static str {
        self.name
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
        let mut messages: Vec<WireMessage<'_>> = history
            .iter()
            .map(|turn| WireMessage {
                role: if turn.role == "assistant" {
                    "assistant"
                } else {
                    "user"
                },
                content: &turn.text,
            })
            .collect();
        messages.push(WireMessage {
            role: "user",
            content: message,
        });
        self.call(CHAT_SYSTEM, messages).await
    }
}
