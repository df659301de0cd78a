//! LLM collaborator contract.
//!
//! The orchestrator depends on exactly one capability: turn a user message
//! plus conversation history into a reply that is either a command or a
//! clarification question. Concrete HTTP clients live in `imagent-interaction`.

use crate::session::ConversationTurn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic Messages API.
    #[default]
    #[serde(alias = "claude")]
    Anthropic,
    /// OpenAI Chat Completions API.
    OpenAi,
    /// Google Gemini generateContent API.
    #[serde(alias = "gemini")]
    Google,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Google => "google",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::Google => "GOOGLE_API_KEY",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            "openai" => Ok(LlmProvider::OpenAi),
            "google" | "gemini" => Ok(LlmProvider::Google),
            other => Err(format!(
                "Unsupported LLM provider '{other}' (expected anthropic, openai, or google)"
            )),
        }
    }
}

/// Failure talking to an LLM provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The HTTP request failed or the provider returned an error status.
    ///
    /// `is_retryable` and `retry_after` are informational; nothing in imagent
    /// retries automatically.
    #[error("{message}")]
    Request {
        status_code: Option<u16>,
        message: String,
        is_retryable: bool,
        retry_after: Option<Duration>,
    },

    /// The provider answered but the response carried no text.
    #[error("{0}")]
    EmptyResponse(String),

    /// The response body could not be decoded.
    #[error("{0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Request { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Produces a command (or a clarification question) from a user request.
#[async_trait]
pub trait CommandGenerator: Send + Sync {
    /// Asks the model for a reply to `user_message` given prior `history`.
    ///
    /// `history` does not include `user_message`.
    async fn generate_command(
        &self,
        user_message: &str,
        history: &[ConversationTurn],
    ) -> Result<String, ProviderError>;

    /// Which provider backs this generator.
    fn provider(&self) -> LlmProvider;

    /// Model identifier sent to the provider.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str_aliases() {
        assert_eq!("Anthropic".parse::<LlmProvider>(), Ok(LlmProvider::Anthropic));
        assert_eq!("gemini".parse::<LlmProvider>(), Ok(LlmProvider::Google));
        assert_eq!(" openai ".parse::<LlmProvider>(), Ok(LlmProvider::OpenAi));
        assert!("mistral".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_provider_deserialize_accepts_aliases() {
        #[derive(Deserialize)]
        struct Holder {
            provider: LlmProvider,
        }
        let parse = |name: &str| {
            serde_json::from_str::<Holder>(&format!(r#"{{"provider":"{name}"}}"#))
                .map(|holder| holder.provider)
        };

        assert_eq!(parse("claude").unwrap(), LlmProvider::Anthropic);
        assert_eq!(parse("gemini").unwrap(), LlmProvider::Google);
        assert_eq!(parse("openai").unwrap(), LlmProvider::OpenAi);
        assert_eq!(
            serde_json::to_string(&LlmProvider::Google).unwrap(),
            r#""google""#
        );
        assert!(parse("mistral").is_err());
    }

    #[test]
    fn test_provider_serde_lowercase() {
        let json = serde_json::to_string(&LlmProvider::OpenAi).unwrap();
        assert_eq!(json, r#""openai""#);
    }

    #[test]
    fn test_request_error_display_is_message() {
        let err = ProviderError::Request {
            status_code: Some(429),
            message: "rate limited".into(),
            is_retryable: true,
            retry_after: Some(Duration::from_secs(3)),
        };
        assert_eq!(err.to_string(), "rate limited");
        assert_eq!(err.status_code(), Some(429));
    }
}
