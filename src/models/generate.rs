//! Request and response bodies for the generation and chat endpoints.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/generate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, alias = "max_tokens")]
    pub max_tokens: Option<u32>,
}

/// Successful generation, with the caller's remaining quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub text: String,
    pub can_proceed: bool,
    pub remaining_attempts: u32,
}

/// Body returned with 429 once the generation quota is used up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaExceededResponse {
    pub can_proceed: bool,
    pub remaining_attempts: u32,
    pub error: String,
}

/// Request body for `POST /api/aichat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub flashcards: Option<serde_json::Value>,
}

/// Generated text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextResponse {
    pub text: String,
}
