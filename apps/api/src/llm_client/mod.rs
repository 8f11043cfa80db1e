/// LLM Client: the single point of entry for all chat-completion calls.
///
/// No other module may call the Azure OpenAI API directly. Pipelines depend on the
/// `ChatCompletion` trait so they can be driven by a fake in tests.
///
/// Calls are single-shot: a failure is returned to the pipeline, which substitutes its
/// rule-based fallback.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::OpenAiConfig;

pub mod prompts;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM client is not configured")]
    NotConfigured,
}

/// One system/user exchange with fixed sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Anything that turns a system/user message pair into the first choice's text.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String, LlmError>;

    /// Deployment or model name, reported by the health and probe endpoints.
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatCompletionResponse {
    /// Extracts the trimmed text of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct AzureError {
    error: AzureErrorBody,
}

#[derive(Debug, Deserialize)]
struct AzureErrorBody {
    message: String,
}

/// Azure OpenAI chat-completions client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    url: String,
    api_key: String,
    deployment: String,
}

impl LlmClient {
    pub fn new(client: Client, config: &OpenAiConfig) -> Self {
        Self {
            client,
            url: completions_url(config),
            api_key: config.api_key.clone(),
            deployment: config.deployment.clone(),
        }
    }
}

#[async_trait]
impl ChatCompletion for LlmClient {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AzureError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;

        if let Some(usage) = &completion.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        completion
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }

    fn model(&self) -> &str {
        &self.deployment
    }
}

fn completions_url(config: &OpenAiConfig) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        config.endpoint.trim_end_matches('/'),
        config.deployment,
        config.api_version
    )
}

/// Runs `request` against an optional model. An absent model is reported as
/// `LlmError::NotConfigured` so callers handle it on the same fallback path as failures.
pub async fn complete_with(
    llm: Option<&dyn ChatCompletion>,
    request: ChatRequest<'_>,
) -> Result<String, LlmError> {
    match llm {
        Some(llm) => llm.complete(request).await,
        None => Err(LlmError::NotConfigured),
    }
}

/// Splits a list-style answer into items, dropping bullets, numbering and blank lines.
pub fn answer_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim().trim_start_matches(['-', '*', '\u{2022}']);
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let line = if digits > 0 && line[digits..].starts_with(['.', ')']) {
        &line[digits + 1..]
    } else {
        line
    };
    line.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_lines_strips_markers() {
        let lines = answer_lines(
            "1. Drink water\n\n- Sleep 8 hours\n* Walk daily\n\u{2022} Rest\n2) Stretch\n2024 was fine",
        );
        assert_eq!(
            lines,
            vec!["Drink water", "Sleep 8 hours", "Walk daily", "Rest", "Stretch", "2024 was fine"]
        );
    }

    #[test]
    fn test_completions_url_strips_trailing_slash() {
        let config = OpenAiConfig {
            endpoint: "https://example.openai.azure.com/".to_string(),
            api_key: "k".to_string(),
            api_version: "2024-02-15-preview".to_string(),
            deployment: "gpt-4".to_string(),
        };
        assert_eq!(
            completions_url(&config),
            "https://example.openai.azure.com/openai/deployments/gpt-4/chat/completions?api-version=2024-02-15-preview"
        );
    }

    #[test]
    fn test_response_text_takes_first_choice_trimmed() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "  positive \n"}},
                {"message": {"role": "assistant", "content": "negative"}}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13}
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("positive"));
    }

    #[test]
    fn test_response_text_none_when_content_filtered() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert!(response.text().is_none());
    }

    #[tokio::test]
    async fn test_complete_with_none_is_not_configured() {
        let request = ChatRequest {
            system: "s",
            user: "u",
            temperature: 0.3,
            max_tokens: 10,
        };
        let result = complete_with(None, request).await;
        assert!(matches!(result, Err(LlmError::NotConfigured)));
    }
}
