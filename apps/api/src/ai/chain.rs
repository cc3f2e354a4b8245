//! Priority-ordered provider chain.
//!
//! Providers come from `AI_PROVIDER_PRIORITY` configuration. Each is tried
//! once per call, in order, with no backoff; any failure moves on to the
//! next. The static fallback bank terminates every chain, so the public
//! surface never fails.
//!
//! Scale normalization happens here and nowhere else: providers answer on a
//! 0–100 scale, the rest of the service only ever sees canonical 0.0–5.0.

use std::sync::Arc;

use tracing::warn;

use crate::ai::gemini::GeminiProvider;
use crate::ai::openai_compat::OpenAiCompatProvider;
use crate::ai::{fallback, AiProvider, AnswerEvaluation, ChatTurn, GeneratedQuestion};
use crate::config::{ProviderConfig, ProviderKind};
use crate::interview::tier::QuestionTier;

pub struct ProviderChain {
    providers: Vec<Arc<dyn AiProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn AiProvider>>) -> Self {
        ProviderChain { providers }
    }

    pub fn from_config(configs: &[ProviderConfig]) -> Self {
        let providers = configs
            .iter()
            .map(|cfg| -> Arc<dyn AiProvider> {
                match cfg.kind {
                    ProviderKind::OpenRouter => Arc::new(OpenAiCompatProvider::openrouter(
                        cfg.api_key.clone(),
                        cfg.model.clone(),
                    )),
                    ProviderKind::DeepSeek => Arc::new(OpenAiCompatProvider::deepseek(
                        cfg.api_key.clone(),
                        cfg.model.clone(),
                    )),
                    ProviderKind::Gemini => Arc::new(GeminiProvider::new(
                        cfg.api_key.clone(),
                        cfg.model.clone(),
                    )),
                }
            })
            .collect();
        ProviderChain::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Generates the question for one slot. Falls back to the static bank
    /// when every provider fails.
    pub async fn generate_question(
        &self,
        tier: QuestionTier,
        index: usize,
        resume_context: Option<&str>,
    ) -> GeneratedQuestion {
        for provider in &self.providers {
            match provider.generate_question(tier, index, resume_context).await {
                Ok(draft) => {
                    return GeneratedQuestion {
                        index,
                        tier,
                        text: draft.question,
                        options: draft.options,
                    }
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        "question generation failed, trying next provider: {e}"
                    );
                }
            }
        }
        let draft = fallback::question_for(tier, index);
        GeneratedQuestion {
            index,
            tier,
            text: draft.question,
            options: draft.options,
        }
    }

    /// Scores an answer on the canonical 0.0–5.0 scale. Empty answers
    /// short-circuit to 0 without touching a provider; total provider
    /// failure degrades to the word-count heuristic.
    pub async fn score_answer(
        &self,
        question: &str,
        answer: &str,
        tier: QuestionTier,
    ) -> AnswerEvaluation {
        if answer.trim().is_empty() {
            return AnswerEvaluation {
                score: 0.0,
                feedback: "No answer was provided.".to_string(),
            };
        }
        for provider in &self.providers {
            match provider.score_answer(question, answer, tier).await {
                Ok(raw) => {
                    return AnswerEvaluation {
                        score: normalize_score(raw.score),
                        feedback: raw.feedback,
                    }
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        "answer scoring failed, trying next provider: {e}"
                    );
                }
            }
        }
        fallback::evaluate(answer, tier)
    }

    /// Assistant reply for the candidate chat; canned reply on total failure.
    pub async fn chat_reply(&self, history: &[ChatTurn], message: &str) -> String {
        for provider in &self.providers {
            match provider.chat_reply(history, message).await {
                Ok(reply) => return reply.trim().to_string(),
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        "chat reply failed, trying next provider: {e}"
                    );
                }
            }
        }
        fallback::chat_reply()
    }
}

/// 0–100 provider scale → canonical 0.0–5.0, clamped, one decimal.
fn normalize_score(raw: f64) -> f64 {
    let clamped = raw.clamp(0.0, 100.0);
    (clamped / 100.0 * 5.0 * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ProviderError, QuestionDraft, RawEvaluation};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_normalize_score_converts_percent_to_five_point() {
        assert_eq!(normalize_score(100.0), 5.0);
        assert_eq!(normalize_score(70.0), 3.5);
        assert_eq!(normalize_score(0.0), 0.0);
    }

    #[test]
    fn test_normalize_score_clamps_out_of_range() {
        assert_eq!(normalize_score(250.0), 5.0);
        assert_eq!(normalize_score(-10.0), 0.0);
    }

    #[test]
    fn test_normalize_score_rounds_to_one_decimal() {
        assert_eq!(normalize_score(66.6), 3.3);
    }

    struct FailingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AiProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn generate_question(
            &self,
            _tier: QuestionTier,
            _index: usize,
            _resume_context: Option<&str>,
        ) -> Result<QuestionDraft, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::EmptyContent)
        }

        async fn score_answer(
            &self,
            _question: &str,
            _answer: &str,
            _tier: QuestionTier,
        ) -> Result<RawEvaluation, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::EmptyContent)
        }

        async fn chat_reply(
            &self,
            _history: &[ChatTurn],
            _message: &str,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::EmptyContent)
        }
    }

    struct ScriptedProvider;

    #[async_trait]
    impl AiProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate_question(
            &self,
            _tier: QuestionTier,
            _index: usize,
            _resume_context: Option<&str>,
        ) -> Result<QuestionDraft, ProviderError> {
            Ok(QuestionDraft {
                question: "What is a closure?".to_string(),
                options: None,
            })
        }

        async fn score_answer(
            &self,
            _question: &str,
            _answer: &str,
            _tier: QuestionTier,
        ) -> Result<RawEvaluation, ProviderError> {
            Ok(RawEvaluation {
                score: 80.0,
                feedback: "good".to_string(),
            })
        }

        async fn chat_reply(
            &self,
            _history: &[ChatTurn],
            _message: &str,
        ) -> Result<String, ProviderError> {
            Ok("  hello there  ".to_string())
        }
    }

    #[tokio::test]
    async fn test_failed_provider_falls_through_to_next() {
        let failing = Arc::new(FailingProvider {
            calls: AtomicUsize::new(0),
        });
        let chain = ProviderChain::new(vec![failing.clone(), Arc::new(ScriptedProvider)]);
        let question = chain.generate_question(QuestionTier::Easy, 0, None).await;
        assert_eq!(question.text, "What is a closure?");
        // the failing provider was attempted exactly once — no backoff
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_chain_uses_static_bank() {
        let chain = ProviderChain::new(vec![]);
        let question = chain.generate_question(QuestionTier::Hard, 4, None).await;
        assert_eq!(question.tier, QuestionTier::Hard);
        assert_eq!(question.index, 4);
        assert!(!question.text.is_empty());
    }

    #[tokio::test]
    async fn test_score_is_normalized_to_five_point_scale() {
        let chain = ProviderChain::new(vec![Arc::new(ScriptedProvider)]);
        let eval = chain
            .score_answer("q", "a perfectly fine answer", QuestionTier::Easy)
            .await;
        assert_eq!(eval.score, 4.0);
    }

    #[tokio::test]
    async fn test_empty_answer_scores_zero_without_provider_call() {
        let failing = Arc::new(FailingProvider {
            calls: AtomicUsize::new(0),
        });
        let chain = ProviderChain::new(vec![failing.clone()]);
        let eval = chain.score_answer("q", "   ", QuestionTier::Easy).await;
        assert_eq!(eval.score, 0.0);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_total_failure_degrades_to_heuristic() {
        let chain = ProviderChain::new(vec![Arc::new(FailingProvider {
            calls: AtomicUsize::new(0),
        })]);
        let eval = chain
            .score_answer("q", "a reasonably developed answer here", QuestionTier::Easy)
            .await;
        assert!(eval.score > 0.0);
        assert!(eval.feedback.contains("offline rubric"));
    }

    #[tokio::test]
    async fn test_chat_reply_is_trimmed() {
        let chain = ProviderChain::new(vec![Arc::new(ScriptedProvider)]);
        let reply = chain.chat_reply(&[], "hi").await;
        assert_eq!(reply, "hello there");
    }

    #[tokio::test]
    async fn test_chat_total_failure_uses_canned_reply() {
        let chain = ProviderChain::new(vec![]);
        let reply = chain.chat_reply(&[], "hi").await;
        assert!(reply.contains("trouble reaching"));
    }

    #[test]
    fn test_question_tier_equality_in_generated_question() {
        // GeneratedQuestion carries the tier the chain was asked for
        let draft = fallback::question_for(QuestionTier::Medium, 2);
        let q = GeneratedQuestion {
            index: 2,
            tier: QuestionTier::Medium,
            text: draft.question,
            options: draft.options,
        };
        assert_eq!(q.tier, QuestionTier::Medium);
    }
}
