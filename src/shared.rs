//! Public access to shared decks, and copying them into your own account.
//!
//! `GET /api/shared/{shareId}` is the only unauthenticated read in the API.
//! It exposes card fronts and backs but never the owner's review progress,
//! and copies always start from a clean review state.

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::app::AppState;
use crate::cards::Card;
use crate::decks::Deck;
use crate::error::ApiError;
use crate::login::CurrentUser;
use crate::scheduler::ReviewState;
use crate::store::{Store, new_id};

/// The public view of a card: text only, no scheduling state.
#[derive(Debug, Serialize)]
pub struct SharedCard {
    pub id: String,
    pub front: String,
    pub back: String,
}

impl From<&Card> for SharedCard {
    fn from(card: &Card) -> Self {
        SharedCard {
            id: card.id.clone(),
            front: card.front.clone(),
            back: card.back.clone(),
        }
    }
}

/// Resolves a share id to a deck that is actually public.
///
/// A revoked or never-public deck is indistinguishable from a missing one.
fn public_deck(store: &Store, share_id: &str) -> Result<Deck, ApiError> {
    store
        .find_deck_by_share_id(share_id)
        .filter(|deck| deck.is_public)
        .ok_or(ApiError::NotFound("Shared deck"))
}

/// GET /api/shared/{shareId}: no authentication required.
pub async fn get_shared_deck(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deck = public_deck(&state.store, &share_id)?;

    let cards: Vec<SharedCard> = state
        .store
        .cards_for_deck(&deck.id)
        .iter()
        .map(SharedCard::from)
        .collect();
    let card_count = cards.len();

    Ok(Json(json!({
        "deck": deck,
        "cards": cards,
        "cardCount": card_count,
    })))
}

/// POST /api/shared/{shareId}/copy: copy a shared deck into the caller's
/// account. The copy is private, has no share link, and every card starts
/// with fresh review state.
pub async fn copy_shared_deck(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(share_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let source = public_deck(&state.store, &share_id)?;
    let source_cards = state.store.cards_for_deck(&source.id);

    let copy = Deck {
        id: new_id(),
        owner_id: user.id.clone(),
        title: format!("{} (Copy)", source.title),
        description: source.description.clone(),
        is_public: false,
        share_id: None,
        created_at: Utc::now(),
    };
    state.store.put_deck(copy.clone())?;

    for card in &source_cards {
        state.store.put_card(Card {
            id: new_id(),
            deck_id: copy.id.clone(),
            front: card.front.clone(),
            back: card.back.clone(),
            // Copies never inherit review progress
            review: ReviewState::default(),
            created_at: Utc::now(),
        })?;
    }

    log::info!(
        "user {} copied shared deck {} ({} cards)",
        user.username,
        source.id,
        source_cards.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Deck copied successfully",
            "deck": copy,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded_store() -> (TempDir, Store, Deck) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let deck = Deck {
            id: new_id(),
            owner_id: "owner".to_string(),
            title: "Capitals".to_string(),
            description: String::new(),
            is_public: true,
            share_id: Some("SHARE123".to_string()),
            created_at: Utc::now(),
        };
        store.put_deck(deck.clone()).unwrap();
        (dir, store, deck)
    }

    #[test]
    fn test_public_deck_lookup() {
        let (_dir, store, deck) = seeded_store();
        assert_eq!(public_deck(&store, "SHARE123").unwrap().id, deck.id);
        assert!(public_deck(&store, "WRONG").is_err());
    }

    #[test]
    fn test_private_deck_is_hidden_even_with_share_id() {
        let (_dir, store, mut deck) = seeded_store();
        deck.is_public = false;
        store.put_deck(deck).unwrap();

        assert!(public_deck(&store, "SHARE123").is_err());
    }

    #[test]
    fn test_shared_card_strips_review_state() {
        let card = Card {
            id: "c1".to_string(),
            deck_id: "d1".to_string(),
            front: "f".to_string(),
            back: "b".to_string(),
            review: ReviewState {
                ease_factor: 1.7,
                interval: 12,
                next_review: Some(Utc::now()),
            },
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(SharedCard::from(&card)).unwrap();
        assert_eq!(json["front"], "f");
        assert!(json.get("easeFactor").is_none());
        assert!(json.get("nextReview").is_none());
    }
}
