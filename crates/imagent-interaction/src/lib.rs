//! LLM collaborators for imagent.
//!
//! Three REST clients implement [`CommandGenerator`]; [`ProviderClient`] picks
//! one at startup from the configured provider and credentials.

pub mod claude_api;
pub mod gemini_api;
mod http;
pub mod logging;
pub mod openai_api;
pub mod prompt;

use async_trait::async_trait;
use imagent_core::config::{SecretConfig, Settings};
use imagent_core::{CommandGenerator, ConversationTurn, LlmProvider, ProviderError, Result};

pub use claude_api::{ClaudeApiClient, DEFAULT_CLAUDE_MODEL};
pub use gemini_api::{DEFAULT_GEMINI_MODEL, GeminiApiClient};
pub use logging::LoggedGenerator;
pub use openai_api::{DEFAULT_OPENAI_MODEL, OpenAiApiClient};
pub use prompt::system_prompt;

/// Default model for `provider`.
pub fn default_model(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Anthropic => DEFAULT_CLAUDE_MODEL,
        LlmProvider::OpenAi => DEFAULT_OPENAI_MODEL,
        LlmProvider::Google => DEFAULT_GEMINI_MODEL,
    }
}

/// The configured LLM backend.
#[derive(Clone)]
pub enum ProviderClient {
    Claude(ClaudeApiClient),
    OpenAi(OpenAiApiClient),
    Gemini(GeminiApiClient),
}

impl ProviderClient {
    /// Builds the client for `settings.llm_provider`.
    ///
    /// The model is `settings.llm_model`, then the `model_name` stored with the
    /// credentials, then the provider default. `command_name` is the detected
    /// ImageMagick entry point used throughout the system prompt.
    ///
    /// Fails with a configuration error when the provider has no API key.
    pub fn from_settings(
        settings: &Settings,
        secrets: &SecretConfig,
        command_name: &str,
    ) -> Result<Self> {
        let provider = settings.llm_provider;
        let api_key = secrets.require_api_key(provider)?;
        let model = settings
            .llm_model
            .clone()
            .or_else(|| {
                secrets
                    .for_provider(provider)
                    .and_then(|secret| secret.model_name.clone())
            })
            .unwrap_or_else(|| default_model(provider).to_string());
        let system = system_prompt(command_name);

        tracing::info!(provider = %provider, model = %model, "Creating LLM client");

        Ok(match provider {
            LlmProvider::Anthropic => {
                ProviderClient::Claude(ClaudeApiClient::new(api_key, model, system))
            }
            LlmProvider::OpenAi => {
                ProviderClient::OpenAi(OpenAiApiClient::new(api_key, model, system))
            }
            LlmProvider::Google => {
                ProviderClient::Gemini(GeminiApiClient::new(api_key, model, system))
            }
        })
    }

    fn as_generator(&self) -> &dyn CommandGenerator {
        match self {
            ProviderClient::Claude(client) => client,
            ProviderClient::OpenAi(client) => client,
            ProviderClient::Gemini(client) => client,
        }
    }
}

#[async_trait]
impl CommandGenerator for ProviderClient {
    async fn generate_command(
        &self,
        user_message: &str,
        history: &[ConversationTurn],
    ) -> std::result::Result<String, ProviderError> {
        self.as_generator()
            .generate_command(user_message, history)
            .await
    }

    fn provider(&self) -> LlmProvider {
        self.as_generator().provider()
    }

    fn model(&self) -> &str {
        self.as_generator().model()
    }
}
