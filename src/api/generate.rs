//! Generation endpoints backed by the chat-completions client.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::{ok, ApiResult};
use crate::errors::AppError;
use crate::models::{
    ChatRequest, GenerateRequest, GenerateResponse, QuotaExceededResponse, TextResponse,
};
use crate::ratelimit::ClientIp;
use crate::AppState;

const CHAT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that discusses the user's flashcards. The flashcards are:";

/// POST /api/generate - Quota-gated text generation.
pub async fn generate_text(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;

    let prompt = request
        .prompt
        .filter(|prompt| !prompt.is_empty())
        .ok_or_else(|| AppError::Validation("Missing required field: prompt".to_string()))?;
    let max_tokens = request
        .max_tokens
        .filter(|&n| n > 0)
        .ok_or_else(|| AppError::Validation("Missing required field: maxTokens".to_string()))?;

    // An unconfigured backend must not burn the caller's quota.
    if !state.generator.is_enabled() {
        return Err(AppError::Unavailable(
            "Text generation is not configured".to_string(),
        ));
    }

    let decision = state.generate_usage.check_and_consume(&client_ip);
    if !decision.can_proceed {
        tracing::info!(client_ip = %client_ip, "Generation quota exhausted");
        let body = QuotaExceededResponse {
            can_proceed: false,
            remaining_attempts: 0,
            error: "Daily generation limit reached. Please try again later.".to_string(),
        };
        return Ok((StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response());
    }

    let text = state.generator.complete(&prompt, max_tokens).await?;

    Ok(Json(GenerateResponse {
        text,
        can_proceed: true,
        remaining_attempts: decision.remaining_attempts,
    })
    .into_response())
}

/// POST /api/aichat - Discuss a set of flashcards.
pub async fn chat_about_flashcards(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<TextResponse> {
    let Json(request) = payload?;

    let message = request
        .message
        .filter(|message| !message.is_empty())
        .ok_or_else(|| AppError::Validation("Missing required field: message".to_string()))?;
    let flashcards = request
        .flashcards
        .filter(|flashcards| !flashcards.is_null())
        .ok_or_else(|| AppError::Validation("Missing required field: flashcards".to_string()))?;

    let system = format!("{} {}", CHAT_SYSTEM_PROMPT, flashcards);
    let text = state.generator.chat(&system, &message).await?;
    ok(TextResponse { text })
}
