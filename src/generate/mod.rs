//! Chat-completions client used by the generation and chat endpoints.
//!
//! Speaks the OpenAI `POST {base_url}/chat/completions` wire format, so any
//! compatible backend can be configured.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::AppError;

/// Request timeout for the backend.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Text generator backed by a chat-completions API.
pub struct TextGenerator {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl TextGenerator {
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
        )
    }

    /// Whether an API key is configured.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Single-turn completion of `prompt`.
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, AppError> {
        let messages = vec![ChatMessage {
            role: "user",
            content: prompt,
        }];
        self.send(messages, Some(max_tokens)).await
    }

    /// One user message answered under a system prompt.
    pub async fn chat(&self, system: &str, message: &str) -> Result<String, AppError> {
        let messages = vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: message,
            },
        ];
        self.send(messages, None).await
    }

    async fn send(
        &self,
        messages: Vec<ChatMessage<'_>>,
        max_tokens: Option<u32>,
    ) -> Result<String, AppError> {
        let Some(api_key) = &self.api_key else {
            return Err(AppError::Unavailable(
                "Text generation is not configured".to_string(),
            ));
        };

        let body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let completion: CompletionResponse = response.json().await?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();

        tracing::debug!(model = %self.model, chars = text.len(), "Generation completed");
        Ok(text)
    }
}
