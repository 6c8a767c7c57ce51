//! Anonymous flashcard model and request bodies for `/api/anonFlashcard`.

use serde::{Deserialize, Serialize};

use super::opaque_id;

/// A question/answer pair as created by the anonymous store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub order: i64,
    pub deck_id: String,
}

/// Request body for creating a flashcard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlashcardRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "opaque_id::option")]
    pub deck_id: Option<String>,
}

/// Query string for listing a deck's flashcards.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFlashcardsQuery {
    #[serde(default)]
    pub deck_id: Option<String>,
}

/// Request body for updating a flashcard in place.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFlashcardRequest {
    #[serde(default, deserialize_with = "opaque_id::option")]
    pub id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    /// Zero is a valid order; only absence counts as missing.
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default, deserialize_with = "opaque_id::option")]
    pub deck_id: Option<String>,
}

/// Request body for deleting a flashcard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFlashcardRequest {
    #[serde(default, deserialize_with = "opaque_id::option")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opaque_id::option")]
    pub deck_id: Option<String>,
}

/// Request body for replacing a deck's whole list (drag-and-drop reordering).
///
/// `flashcards` stays untyped until the store checks it is a non-empty array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderFlashcardsRequest {
    #[serde(default)]
    pub flashcards: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "opaque_id::option")]
    pub deck_id: Option<String>,
}

/// Confirmation body returned after a bulk replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
