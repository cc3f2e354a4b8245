use std::fmt;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub jwt_secret: String,
    pub port: u16,
    pub rust_log: String,
    /// Priority-ordered AI providers. Only entries whose API key is present
    /// in the environment are included; an empty list means the service runs
    /// on the static fallback bank alone.
    pub providers: Vec<ProviderConfig>,
}

/// Which hosted LLM a `ProviderConfig` entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenRouter,
    Gemini,
    DeepSeek,
}

impl ProviderKind {
    fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "gemini" => Ok(ProviderKind::Gemini),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            other => bail!("Unknown AI provider '{other}' in AI_PROVIDER_PRIORITY"),
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    fn model_var(self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "OPENROUTER_MODEL",
            ProviderKind::Gemini => "GEMINI_MODEL",
            ProviderKind::DeepSeek => "DEEPSEEK_MODEL",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "meta-llama/llama-3.3-70b-instruct",
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::DeepSeek => "deepseek-chat",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Gemini => "gemini",
            ProviderKind::DeepSeek => "deepseek",
        };
        f.write_str(name)
    }
}

/// One entry of the provider priority list, fully resolved.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
}

const DEFAULT_PROVIDER_PRIORITY: &str = "openrouter,gemini,deepseek";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            providers: parse_providers()?,
        })
    }
}

/// Resolves `AI_PROVIDER_PRIORITY` into concrete provider configs.
/// Providers without an API key in the environment are silently skipped here;
/// `main` logs the active set once tracing is up.
fn parse_providers() -> Result<Vec<ProviderConfig>> {
    let priority = std::env::var("AI_PROVIDER_PRIORITY")
        .unwrap_or_else(|_| DEFAULT_PROVIDER_PRIORITY.to_string());

    let mut providers = Vec::new();
    for name in priority.split(',').filter(|s| !s.trim().is_empty()) {
        let kind = ProviderKind::parse(name)?;
        if providers.iter().any(|p: &ProviderConfig| p.kind == kind) {
            bail!("AI provider '{kind}' listed twice in AI_PROVIDER_PRIORITY");
        }
        let Ok(api_key) = std::env::var(kind.key_var()) else {
            continue;
        };
        let model =
            std::env::var(kind.model_var()).unwrap_or_else(|_| kind.default_model().to_string());
        providers.push(ProviderConfig {
            kind,
            api_key,
            model,
        });
    }
    Ok(providers)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse_known_names() {
        assert_eq!(
            ProviderKind::parse("openrouter").unwrap(),
            ProviderKind::OpenRouter
        );
        assert_eq!(ProviderKind::parse(" Gemini ").unwrap(), ProviderKind::Gemini);
        assert_eq!(
            ProviderKind::parse("DEEPSEEK").unwrap(),
            ProviderKind::DeepSeek
        );
    }

    #[test]
    fn test_provider_kind_parse_unknown_name_fails() {
        assert!(ProviderKind::parse("gpt5").is_err());
    }

    #[test]
    fn test_provider_kind_display_roundtrip() {
        for kind in [
            ProviderKind::OpenRouter,
            ProviderKind::Gemini,
            ProviderKind::DeepSeek,
        ] {
            assert_eq!(ProviderKind::parse(&kind.to_string()).unwrap(), kind);
        }
    }
}
