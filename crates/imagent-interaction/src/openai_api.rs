//! OpenAiApiClient - OpenAI Chat Completions implementation.
//!
//! The system prompt is sent as the first message of every request.

use crate::http::{self, MAX_TOKENS};
use async_trait::async_trait;
use imagent_core::{CommandGenerator, ConversationTurn, LlmProvider, ProviderError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Command generator that talks to the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAiApiClient {
    client: Client,
    api_key: String,
    model: String,
    system: String,
    max_tokens: u32,
    base_url: String,
}

impl OpenAiApiClient {
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

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Points the client at an OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(
        &self,
        user_message: &str,
        history: &[ConversationTurn],
    ) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: self.system.clone(),
        });
        messages.extend(history.iter().map(|turn| ChatMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }));
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user_message.to_string(),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
        }
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| http::transport_error("OpenAI", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = http::parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            ProviderError::InvalidResponse(format!("Failed to parse OpenAI response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl CommandGenerator for OpenAiApiClient {
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
        LlmProvider::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, ProviderError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            ProviderError::EmptyResponse("OpenAI API returned no content in the response".into())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_is_first_message() {
        let client = OpenAiApiClient::new("key", DEFAULT_OPENAI_MODEL, "system text");
        let history = vec![
            ConversationTurn::user("make it gray"),
            ConversationTurn::assistant("Which file should I use?"),
        ];
        let json = serde_json::to_value(client.build_request("photo.jpg", &history)).unwrap();

        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "system text");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[3]["content"], "photo.jpg");
        assert_eq!(json["model"], "gpt-4o");
    }

    #[test]
    fn test_extract_null_content_is_empty_response() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(
            extract_text_response(response),
            Err(ProviderError::EmptyResponse(_))
        ));
    }

    #[test]
    fn test_extract_first_choice() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"convert a.png b.jpg"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_response(response).unwrap(), "convert a.png b.jpg");
    }

    #[test]
    fn test_map_http_error_rate_limit() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests","code":null}}"#;
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            body.to_string(),
            Some(Duration::from_secs(20)),
        );
        assert_eq!(
            err,
            ProviderError::Request {
                status_code: Some(429),
                message: "Rate limit reached".into(),
                is_retryable: true,
                retry_after: Some(Duration::from_secs(20)),
            }
        );
    }
}
