//! Anonymous flashcard store.
//!
//! Flashcards for users without an account live here, keyed by deck id, in
//! the order they were added. A deck key appears on its first insert and is
//! never removed, even when its list empties. Every operation takes the
//! store-wide lock for its whole read-modify-write.
//!
//! Records are held as JSON objects because a bulk replace stores whatever
//! the client sent, extra fields and all. Lookups match on the `id` field.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{
    CreateFlashcardRequest, DeleteFlashcardRequest, Flashcard, ReorderFlashcardsRequest,
    UpdateFlashcardRequest,
};

type Decks = HashMap<String, Vec<Value>>;

/// Transient per-deck flashcard lists.
#[derive(Debug, Default)]
pub struct AnonFlashcardStore {
    decks: Mutex<Decks>,
}

impl AnonFlashcardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Decks>, StoreError> {
        self.decks
            .lock()
            .map_err(|_| StoreError::Internal("anonymous flashcard store lock poisoned".into()))
    }

    /// Append a new flashcard to a deck, creating the deck on first use.
    ///
    /// The new card's `order` is the deck's length before the insert plus one.
    pub fn create(&self, request: &CreateFlashcardRequest) -> Result<Flashcard, StoreError> {
        let question = require(request.question.as_deref(), "question")?;
        let answer = require(request.answer.as_deref(), "answer")?;
        let deck_id = require(request.deck_id.as_deref(), "deckId")?;

        let mut decks = self.lock()?;
        let cards = decks.entry(deck_id.to_string()).or_default();

        let flashcard = Flashcard {
            id: Uuid::new_v4().to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            order: cards.len() as i64 + 1,
            deck_id: deck_id.to_string(),
        };
        let record = serde_json::to_value(&flashcard)
            .map_err(|e| StoreError::Internal(format!("Failed to encode flashcard: {}", e)))?;
        cards.push(record);

        tracing::debug!(deck_id, flashcard_id = %flashcard.id, "Created anonymous flashcard");
        Ok(flashcard)
    }

    /// List a deck's flashcards. An unknown deck yields an empty list.
    pub fn list(&self, deck_id: Option<&str>) -> Result<Vec<Value>, StoreError> {
        let deck_id = require(deck_id, "deckId")?;
        let decks = self.lock()?;
        Ok(decks.get(deck_id).cloned().unwrap_or_default())
    }

    /// Replace question, answer and order of an existing flashcard in place.
    ///
    /// Every other field of the record is left as it was.
    pub fn update(&self, request: &UpdateFlashcardRequest) -> Result<Value, StoreError> {
        let id = require(request.id.as_deref(), "id")?;
        let question = require(request.question.as_deref(), "question")?;
        let answer = require(request.answer.as_deref(), "answer")?;
        let order = request
            .order
            .ok_or_else(|| StoreError::Validation("Missing required field: order".into()))?;
        let deck_id = require(request.deck_id.as_deref(), "deckId")?;

        let mut decks = self.lock()?;
        let cards = deck_mut(&mut decks, deck_id)?;
        let fields = cards
            .iter_mut()
            .filter(|card| has_id(card, id))
            .find_map(Value::as_object_mut)
            .ok_or_else(|| StoreError::NotFound("Flashcard not found".into()))?;

        fields.insert("question".into(), Value::from(question));
        fields.insert("answer".into(), Value::from(answer));
        fields.insert("order".into(), Value::from(order));

        tracing::debug!(deck_id, flashcard_id = id, "Updated anonymous flashcard");
        Ok(Value::Object(fields.clone()))
    }

    /// Remove a flashcard from its deck.
    pub fn delete(&self, request: &DeleteFlashcardRequest) -> Result<(), StoreError> {
        let id = require(request.id.as_deref(), "id")?;
        let deck_id = require(request.deck_id.as_deref(), "deckId")?;

        let mut decks = self.lock()?;
        let cards = deck_mut(&mut decks, deck_id)?;
        let index = cards
            .iter()
            .position(|card| has_id(card, id))
            .ok_or_else(|| StoreError::NotFound("Flashcard not found".into()))?;
        cards.remove(index);

        tracing::debug!(deck_id, flashcard_id = id, "Deleted anonymous flashcard");
        Ok(())
    }

    /// Overwrite a deck's whole list with the supplied records, verbatim.
    ///
    /// Only the outer shape is checked: a non-empty array and a deck id.
    pub fn replace(&self, request: &ReorderFlashcardsRequest) -> Result<(), StoreError> {
        let invalid = || StoreError::Validation("Invalid flashcards data".into());

        let records = match &request.flashcards {
            Some(Value::Array(records)) if !records.is_empty() => records,
            _ => return Err(invalid()),
        };
        let deck_id = require(request.deck_id.as_deref(), "deckId").map_err(|_| invalid())?;

        let mut decks = self.lock()?;
        let cards = deck_mut(&mut decks, deck_id)?;
        *cards = records.clone();

        tracing::debug!(deck_id, count = cards.len(), "Replaced anonymous deck");
        Ok(())
    }

    /// Number of deck keys currently held.
    pub fn deck_count(&self) -> usize {
        self.lock().map(|decks| decks.len()).unwrap_or(0)
    }
}

fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, StoreError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(StoreError::Validation(format!(
            "Missing required field: {}",
            field
        ))),
    }
}

/// Whether a record's `id` (string or number) equals `id`.
fn has_id(card: &Value, id: &str) -> bool {
    match card.get("id") {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

fn deck_mut<'a>(decks: &'a mut Decks, deck_id: &str) -> Result<&'a mut Vec<Value>, StoreError> {
    decks
        .get_mut(deck_id)
        .ok_or_else(|| StoreError::NotFound("Deck not found".into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    fn create(store: &AnonFlashcardStore, deck: &str, question: &str) -> Flashcard {
        store
            .create(&CreateFlashcardRequest {
                question: Some(question.into()),
                answer: Some(format!("{} answer", question)),
                deck_id: Some(deck.into()),
            })
            .unwrap()
    }

    fn questions(cards: &[Value]) -> Vec<&str> {
        cards.iter().filter_map(|c| c["question"].as_str()).collect()
    }

    #[test]
    fn test_create_assigns_sequential_orders() {
        let store = AnonFlashcardStore::new();
        let orders: Vec<i64> = (0..4).map(|i| create(&store, "d1", &format!("q{}", i)).order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);

        // Other decks count from one independently.
        assert_eq!(create(&store, "d2", "other").order, 1);
        assert_eq!(store.deck_count(), 2);
    }

    #[test]
    fn test_create_requires_all_fields() {
        let store = AnonFlashcardStore::new();
        let err = store
            .create(&CreateFlashcardRequest {
                question: Some("q".into()),
                answer: Some(String::new()),
                deck_id: Some("d".into()),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = store
            .create(&CreateFlashcardRequest {
                question: Some("q".into()),
                answer: Some("a".into()),
                deck_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.deck_count(), 0);
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let store = AnonFlashcardStore::new();
        let a = create(&store, "d", "a");
        let b = create(&store, "d", "b");
        assert_ne!(a.id, b.id);
        assert_eq!(a.deck_id, "d");
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = AnonFlashcardStore::new();
        for q in ["first", "second", "third"] {
            create(&store, "d", q);
        }
        let cards = store.list(Some("d")).unwrap();
        assert_eq!(questions(&cards), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_list_unknown_deck_is_empty_but_missing_id_fails() {
        let store = AnonFlashcardStore::new();
        assert!(store.list(Some("nope")).unwrap().is_empty());
        assert!(matches!(store.list(None), Err(StoreError::Validation(_))));
        assert!(matches!(store.list(Some("")), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_update_in_place_keeps_identity_and_position() {
        let store = AnonFlashcardStore::new();
        create(&store, "d", "a");
        let target = create(&store, "d", "b");
        create(&store, "d", "c");

        let updated = store
            .update(&UpdateFlashcardRequest {
                id: Some(target.id.clone()),
                question: Some("B".into()),
                answer: Some("B answer".into()),
                order: Some(0),
                deck_id: Some("d".into()),
            })
            .unwrap();
        assert_eq!(updated["id"], target.id.as_str());
        assert_eq!(updated["order"], 0);

        let cards = store.list(Some("d")).unwrap();
        assert_eq!(questions(&cards), vec!["a", "B", "c"]);
    }

    #[test]
    fn test_update_missing_order_is_validation_error() {
        let store = AnonFlashcardStore::new();
        let card = create(&store, "d", "a");
        let err = store
            .update(&UpdateFlashcardRequest {
                id: Some(card.id),
                question: Some("q".into()),
                answer: Some("a".into()),
                order: None,
                deck_id: Some("d".into()),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_update_and_delete_not_found_leave_state_untouched() {
        let store = AnonFlashcardStore::new();
        let card = create(&store, "d", "a");
        let before = store.list(Some("d")).unwrap();

        let update = |deck: &str, id: &str| {
            store.update(&UpdateFlashcardRequest {
                id: Some(id.into()),
                question: Some("x".into()),
                answer: Some("y".into()),
                order: Some(9),
                deck_id: Some(deck.into()),
            })
        };
        assert_eq!(
            update("missing", &card.id).unwrap_err(),
            StoreError::NotFound("Deck not found".into())
        );
        assert_eq!(
            update("d", "missing").unwrap_err(),
            StoreError::NotFound("Flashcard not found".into())
        );

        let delete = |deck: &str, id: &str| {
            store.delete(&DeleteFlashcardRequest {
                id: Some(id.into()),
                deck_id: Some(deck.into()),
            })
        };
        assert!(matches!(delete("missing", &card.id), Err(StoreError::NotFound(_))));
        assert!(matches!(delete("d", "missing"), Err(StoreError::NotFound(_))));

        assert_eq!(store.list(Some("d")).unwrap(), before);
        assert!(store.list(Some("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_only_the_target() {
        let store = AnonFlashcardStore::new();
        create(&store, "d", "a");
        let b = create(&store, "d", "b");
        create(&store, "d", "c");

        store
            .delete(&DeleteFlashcardRequest {
                id: Some(b.id),
                deck_id: Some("d".into()),
            })
            .unwrap();
        let cards = store.list(Some("d")).unwrap();
        assert_eq!(questions(&cards), vec!["a", "c"]);

        // Orders are not renumbered, so the next insert duplicates an existing order.
        assert_eq!(create(&store, "d", "d").order, 3);
    }

    #[test]
    fn test_emptied_deck_still_exists() {
        let store = AnonFlashcardStore::new();
        let card = create(&store, "d", "a");
        store
            .delete(&DeleteFlashcardRequest {
                id: Some(card.id),
                deck_id: Some("d".into()),
            })
            .unwrap();

        let replaced = store.replace(&ReorderFlashcardsRequest {
            flashcards: Some(json!([
                { "id": "x", "question": "q", "answer": "a", "order": 1, "deckId": "d" }
            ])),
            deck_id: Some("d".into()),
        });
        assert!(replaced.is_ok());
    }

    #[test]
    fn test_replace_overwrites_without_merging() {
        let store = AnonFlashcardStore::new();
        create(&store, "d", "a");
        create(&store, "d", "b");

        let first = json!([
            { "id": "2", "question": "b", "answer": "b", "order": 1, "deckId": "d" },
            { "id": "1", "question": "a", "answer": "a", "order": 2, "deckId": "d" }
        ]);
        store
            .replace(&ReorderFlashcardsRequest {
                flashcards: Some(first),
                deck_id: Some("d".into()),
            })
            .unwrap();
        assert_eq!(questions(&store.list(Some("d")).unwrap()), vec!["b", "a"]);

        let second = json!([
            { "id": "9", "question": "z", "answer": "z", "order": 7, "deckId": "elsewhere" }
        ]);
        store
            .replace(&ReorderFlashcardsRequest {
                flashcards: Some(second),
                deck_id: Some("d".into()),
            })
            .unwrap();
        let cards = store.list(Some("d")).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0]["order"], 7);
        assert_eq!(cards[0]["deckId"], "elsewhere");
    }

    #[test]
    fn test_replace_validation_and_not_found() {
        let store = AnonFlashcardStore::new();
        let card = json!({ "id": "1", "question": "q", "answer": "a", "order": 1, "deckId": "d" });

        for flashcards in [None, Some(json!([])), Some(json!({ "not": "an array" }))] {
            let err = store
                .replace(&ReorderFlashcardsRequest {
                    flashcards,
                    deck_id: Some("d".into()),
                })
                .unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }

        let err = store
            .replace(&ReorderFlashcardsRequest {
                flashcards: Some(json!([card.clone()])),
                deck_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = store
            .replace(&ReorderFlashcardsRequest {
                flashcards: Some(json!([card])),
                deck_id: Some("d".into()),
            })
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound("Deck not found".into()));
        assert!(store.list(Some("d")).unwrap().is_empty());
    }

    #[test]
    fn test_replace_stores_records_verbatim() {
        let store = AnonFlashcardStore::new();
        create(&store, "d", "a");

        let records = json!([
            { "id": "x", "question": "q", "answer": "a", "order": 1, "extra": { "tags": ["t"] } },
            { "id": "y", "order": "second" },
            "not even an object"
        ]);
        store
            .replace(&ReorderFlashcardsRequest {
                flashcards: Some(records.clone()),
                deck_id: Some("d".into()),
            })
            .unwrap();

        assert_eq!(Value::Array(store.list(Some("d")).unwrap()), records);
    }

    #[test]
    fn test_replace_unknown_deck_is_not_found_before_record_checks() {
        let store = AnonFlashcardStore::new();
        let err = store
            .replace(&ReorderFlashcardsRequest {
                flashcards: Some(json!([{ "bogus": true }, 42])),
                deck_id: Some("nope".into()),
            })
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound("Deck not found".into()));
        assert_eq!(store.deck_count(), 0);
    }

    #[test]
    fn test_update_and_delete_match_replaced_records_by_id() {
        let store = AnonFlashcardStore::new();
        create(&store, "d", "a");
        store
            .replace(&ReorderFlashcardsRequest {
                flashcards: Some(json!([
                    { "id": 5, "question": "five", "extra": "kept" },
                    { "id": "six", "question": "six" }
                ])),
                deck_id: Some("d".into()),
            })
            .unwrap();

        let updated = store
            .update(&UpdateFlashcardRequest {
                id: Some("5".into()),
                question: Some("new".into()),
                answer: Some("ans".into()),
                order: Some(2),
                deck_id: Some("d".into()),
            })
            .unwrap();
        assert_eq!(
            updated,
            json!({ "id": 5, "question": "new", "answer": "ans", "order": 2, "extra": "kept" })
        );

        store
            .delete(&DeleteFlashcardRequest {
                id: Some("six".into()),
                deck_id: Some("d".into()),
            })
            .unwrap();
        assert_eq!(store.list(Some("d")).unwrap(), vec![updated]);
    }

    #[test]
    fn test_concurrent_creates_get_distinct_orders() {
        let store = Arc::new(AnonFlashcardStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        create(&store, "shared", &format!("t{}-{}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut orders: Vec<i64> = store
            .list(Some("shared"))
            .unwrap()
            .iter()
            .filter_map(|c| c["order"].as_i64())
            .collect();
        orders.sort_unstable();
        assert_eq!(orders, (1..=200).collect::<Vec<i64>>());
    }
}
