//! ClaudeApiClient - Anthropic Messages API implementation.
//!
//! The system prompt travels in the top-level `system` field; history and the
//! new request are sent as alternating `user`/`assistant` messages.

use crate::http::{self, MAX_TOKENS};
use async_trait::async_trait;
use imagent_core::{CommandGenerator, ConversationTurn, LlmProvider, ProviderError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Command generator that talks to the Claude HTTP API.
#[derive(Clone)]
pub struct ClaudeApiClient {
    client: Client,
    api_key: String,
    model: String,
    system: String,
    max_tokens: u32,
    base_url: String,
}

impl ClaudeApiClient {
    /// Creates a new client with the provided API key, model and system prompt.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        system: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            system: system.into(),
            max_tokens: MAX_TOKENS,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Points the client at a different endpoint (proxies, gateways).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, user_message: &str, history: &[ConversationTurn]) -> CreateMessageRequest {
        let mut messages: Vec<Message> = history
            .iter()
            .map(|turn| Message {
                role: turn.role.as_str().to_string(),
                content: turn.content.clone(),
            })
            .collect();
        messages.push(Message {
            role: "user".to_string(),
            content: user_message.to_string(),
        });

        CreateMessageRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            system: self.system.clone(),
        }
    }

    async fn send_request(&self, body: &CreateMessageRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| http::transport_error("Claude", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = http::parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Claude error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: CreateMessageResponse = response.json().await.map_err(|err| {
            ProviderError::InvalidResponse(format!("Failed to parse Claude response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl CommandGenerator for ClaudeApiClient {
    async fn generate_command(
        &self,
        user_message: &str,
        history: &[ConversationTurn],
    ) -> Result<String, ProviderError> {
        let request = self.build_request(user_message, history);
        let text = self.send_request(&request).await?;
        Ok(text.trim().to_string())
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct CreateMessageRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    system: String,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: CreateMessageResponse) -> Result<String, ProviderError> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .ok_or_else(|| {
            ProviderError::EmptyResponse("Claude API returned no text in the response content".into())
        })
}

fn map_http_error(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> ProviderError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);
    http::status_error(status, message, retry_after)
}
