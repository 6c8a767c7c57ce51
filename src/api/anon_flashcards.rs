//! Anonymous flashcard endpoints (`/api/anonFlashcard`).

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use super::{created, ok, ApiResult};
use crate::errors::AppError;
use crate::models::{
    CreateFlashcardRequest, DeleteFlashcardRequest, Flashcard, ListFlashcardsQuery,
    MessageResponse, ReorderFlashcardsRequest, UpdateFlashcardRequest,
};
use crate::AppState;

/// Methods served on `/api/anonFlashcard`.
pub const ANON_FLASHCARD_METHODS: &str = "GET, POST, PUT, DELETE, PATCH";

/// GET /api/anonFlashcard?deckId= - List a deck's flashcards.
pub async fn list_anon_flashcards(
    State(state): State<AppState>,
    query: Result<Query<ListFlashcardsQuery>, QueryRejection>,
) -> ApiResult<Vec<Value>> {
    let Query(query) = query?;
    let flashcards = state.flashcards.list(query.deck_id.as_deref())?;
    ok(flashcards)
}

/// POST /api/anonFlashcard - Append a flashcard to a deck.
pub async fn create_anon_flashcard(
    State(state): State<AppState>,
    payload: Result<Json<CreateFlashcardRequest>, JsonRejection>,
) -> ApiResult<Flashcard> {
    let Json(request) = payload?;
    let flashcard = state.flashcards.create(&request)?;
    created(flashcard)
}

/// PUT /api/anonFlashcard - Update a flashcard in place.
pub async fn update_anon_flashcard(
    State(state): State<AppState>,
    payload: Result<Json<UpdateFlashcardRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let flashcard = state.flashcards.update(&request)?;
    ok(flashcard)
}

/// DELETE /api/anonFlashcard - Remove a flashcard.
pub async fn delete_anon_flashcard(
    State(state): State<AppState>,
    payload: Result<Json<DeleteFlashcardRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(request) = payload?;
    state.flashcards.delete(&request)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/anonFlashcard - Replace a deck's list after reordering.
pub async fn reorder_anon_flashcards(
    State(state): State<AppState>,
    payload: Result<Json<ReorderFlashcardsRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(request) = payload?;
    state.flashcards.replace(&request)?;
    ok(MessageResponse {
        message: "Flashcards updated successfully".to_string(),
    })
}

/// Any other method on `/api/anonFlashcard`.
pub async fn anon_flashcard_method_not_allowed(method: Method) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, ANON_FLASHCARD_METHODS)],
        format!("Method {} Not Allowed", method),
    )
        .into_response()
}
