//! GeminiApiClient - Google generateContent implementation.
//!
//! Each request carries the full conversation history, with assistant turns
//! sent under Gemini's `model` role, plus the system prompt as a
//! `system_instruction`.

use crate::http::{self, MAX_TOKENS};
use async_trait::async_trait;
use imagent_core::{CommandGenerator, ConversationTurn, LlmProvider, MessageRole, ProviderError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Command generator that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiClient {
    client: Client,
    api_key: String,
    model: String,
    system_instruction: String,
    max_output_tokens: u32,
    base_url: String,
}

impl GeminiApiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            system_instruction: system_instruction.into(),
            max_output_tokens: MAX_TOKENS,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(
        &self,
        user_message: &str,
        history: &[ConversationTurn],
    ) -> GenerateContentRequest {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| Content::text(gemini_role(turn.role), &turn.content))
            .collect();
        contents.push(Content::text("user", user_message));

        GenerateContentRequest {
            contents,
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: self.system_instruction.clone(),
                }],
            },
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                thinking_config: thinking_config(&self.model),
            },
        }
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, ProviderError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| http::transport_error("Gemini", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = http::parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            ProviderError::InvalidResponse(format!("Failed to parse Gemini response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl CommandGenerator for GeminiApiClient {
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
        LlmProvider::Google
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn gemini_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

/// Turns thinking off for Flash models, whose thinking tokens count against
/// `maxOutputTokens`. Pro models reject a zero budget.
fn thinking_config(model: &str) -> Option<ThinkingConfig> {
    model
        .contains("flash")
        .then_some(ThinkingConfig { thinking_budget: 0 })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, ProviderError> {
    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        Err(ProviderError::EmptyResponse(
            "Gemini API returned no text in the response candidates".into(),
        ))
    } else {
        Ok(text)
    }
}

fn map_http_error(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> ProviderError {
    let message = match serde_json::from_str::<ErrorWrapper>(&body) {
        Ok(wrapper) => {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        }
        Err(_) => body,
    };
    http::status_error(status, message, retry_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_turns_use_model_role() {
        let client = GeminiApiClient::new("key", DEFAULT_GEMINI_MODEL, "instructions");
        let history = vec![
            ConversationTurn::user("blur photo.jpg"),
            ConversationTurn::assistant("magick photo.jpg -blur 0x8 blurred.jpg"),
        ];
        let json = serde_json::to_value(client.build_request("stronger", &history)).unwrap();

        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "stronger");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "instructions");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(
            json["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            0
        );
    }

    #[test]
    fn test_pro_models_keep_default_thinking() {
        let client = GeminiApiClient::new("key", "gemini-2.5-pro", "instructions");
        let json = serde_json::to_value(client.build_request("blur a.jpg", &[])).unwrap();
        assert!(json["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn test_extract_joins_text_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"magick a.jpg "},{"text":"b.png"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_response(response).unwrap(), "magick a.jpg b.png");
    }

    #[test]
    fn test_extract_without_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(matches!(
            extract_text_response(response),
            Err(ProviderError::EmptyResponse(_))
        ));
    }

    #[test]
    fn test_map_http_error_prefixes_status() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        let err = map_http_error(StatusCode::BAD_REQUEST, body.to_string(), None);
        assert_eq!(err.to_string(), "INVALID_ARGUMENT: API key not valid.");
        assert_eq!(err.status_code(), Some(400));
    }
}
