//! Card CRUD, the rating endpoint, and the due-card listing.
//!
//! Cards always belong to a deck; every operation first proves the card's
//! deck belongs to the caller. The rating endpoint is the only writer of a
//! card's review state besides the copy-reset in `shared`.

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::app::AppState;
use crate::decks::owned_deck;
use crate::error::ApiError;
use crate::login::CurrentUser;
use crate::scheduler::{Rating, ReviewState, schedule};
use crate::store::{Store, new_id};

const MAX_SIDE_LEN: usize = 5000;

/// A flashcard: front/back text plus its spaced-repetition state.
///
/// The review state is flattened into the document, so the wire format is
/// `{id, deckId, front, back, easeFactor, interval, nextReview, createdAt}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub deck_id: String,

    /// Prompt side; may be empty right after creation, up to 5000 chars.
    pub front: String,

    /// Answer side; same limits as the front.
    pub back: String,

    #[serde(flatten)]
    pub review: ReviewState,

    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Whether the card is eligible for review at `now`: never scheduled,
    /// or scheduled for a time that has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.review.next_review {
            None => true,
            Some(due) => due <= now,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    pub deck_id: String,
    pub front: Option<String>,
    pub back: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCardRequest {
    pub front: Option<String>,
    pub back: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewCardRequest {
    /// Recall grade, 1 (Again) through 4 (Easy).
    pub rating: u8,
}

fn validate_side(raw: &str, side: &str) -> Result<String, ApiError> {
    let text = raw.trim();
    if text.chars().count() > MAX_SIDE_LEN {
        return Err(ApiError::validation(format!(
            "{side} must be 5000 characters or less"
        )));
    }
    Ok(text.to_string())
}

/// Loads a card and proves the caller owns its deck.
///
/// A missing card is a 404; a card in somebody else's deck is a 403 with
/// the given action in the message.
fn owned_card(
    store: &Store,
    card_id: &str,
    owner_id: &str,
    action: &str,
) -> Result<Card, ApiError> {
    let card = store.get_card(card_id).ok_or(ApiError::NotFound("Card"))?;

    match store.get_deck(&card.deck_id) {
        Some(deck) if deck.owner_id == owner_id => Ok(card),
        _ => Err(ApiError::Forbidden(format!(
            "You do not have permission to {action} this card"
        ))),
    }
}

/// POST /api/cards
///
/// Front and back may be omitted or empty; the client creates blank cards
/// and fills them in afterwards.
pub async fn create_card(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateCardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.deck_id.is_empty() {
        return Err(ApiError::validation("Deck ID is required"));
    }
    owned_deck(&state.store, &payload.deck_id, &user.id)?;

    let card = Card {
        id: new_id(),
        deck_id: payload.deck_id,
        front: validate_side(payload.front.as_deref().unwrap_or(""), "Front")?,
        back: validate_side(payload.back.as_deref().unwrap_or(""), "Back")?,
        review: ReviewState::default(),
        created_at: Utc::now(),
    };

    state.store.put_card(card.clone())?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Card created successfully",
            "card": card,
        })),
    ))
}

/// PATCH /api/cards/{cardId}: partial front/back update.
pub async fn update_card(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(card_id): Path<String>,
    Json(payload): Json<UpdateCardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut card = owned_card(&state.store, &card_id, &user.id, "edit")?;

    if let Some(front) = payload.front {
        card.front = validate_side(&front, "Front")?;
    }
    if let Some(back) = payload.back {
        card.back = validate_side(&back, "Back")?;
    }

    state.store.put_card(card.clone())?;

    Ok(Json(json!({
        "message": "Card updated successfully",
        "card": card,
    })))
}

/// DELETE /api/cards/{cardId}
pub async fn delete_card(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(card_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let card = owned_card(&state.store, &card_id, &user.id, "delete")?;
    state.store.delete_card(&card.id)?;

    Ok(Json(json!({ "message": "Card deleted successfully" })))
}

/// POST /api/cards/{cardId}/review
///
/// Applies a recall rating to the card: the scheduler computes the next
/// ease factor, interval, and due date, and the result is written back.
/// An out-of-range rating is rejected before any state changes.
pub async fn review_card(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(card_id): Path<String>,
    Json(payload): Json<ReviewCardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rating =
        Rating::try_from(payload.rating).map_err(|e| ApiError::validation(e.to_string()))?;

    let mut card = owned_card(&state.store, &card_id, &user.id, "review")?;
    card.review = schedule(&card.review, rating, Utc::now());
    state.store.put_card(card.clone())?;

    log::debug!(
        "card {} rated {:?}: interval {} days, ease {:.2}",
        card.id,
        rating,
        card.review.interval,
        card.review.ease_factor
    );

    Ok(Json(json!({
        "message": "Card reviewed successfully",
        "card": card,
    })))
}

/// GET /api/decks/{deckId}/due: cards in the deck that are due now,
/// oldest first.
pub async fn due_cards(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(deck_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deck = owned_deck(&state.store, &deck_id, &user.id)?;

    let now = Utc::now();
    let cards: Vec<Card> = state
        .store
        .cards_for_deck(&deck.id)
        .into_iter()
        .filter(|card| card.is_due(now))
        .collect();
    let count = cards.len();

    Ok(Json(json!({ "cards": cards, "count": count })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn card_with_review(review: ReviewState) -> Card {
        Card {
            id: "c1".to_string(),
            deck_id: "d1".to_string(),
            front: "front".to_string(),
            back: "back".to_string(),
            review,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_side() {
        assert_eq!(validate_side("  hi  ", "Front").unwrap(), "hi");
        assert_eq!(validate_side("", "Back").unwrap(), "");
        assert!(validate_side(&"x".repeat(5001), "Front").is_err());
    }

    #[test]
    fn test_side_limit_counts_characters_not_bytes() {
        // 5000 multibyte characters exceed 5000 bytes but fit the cap
        assert!(validate_side(&"字".repeat(5000), "Front").is_ok());
        assert!(validate_side(&"字".repeat(5001), "Back").is_err());
    }

    #[test]
    fn test_new_cards_are_due() {
        let card = card_with_review(ReviewState::default());
        assert!(card.is_due(Utc::now()));
    }

    #[test]
    fn test_due_respects_next_review() {
        let now = Utc::now();

        let mut scheduled = ReviewState::default();
        scheduled.next_review = Some(now + Duration::days(3));
        assert!(!card_with_review(scheduled.clone()).is_due(now));

        scheduled.next_review = Some(now - Duration::days(1));
        assert!(card_with_review(scheduled).is_due(now));
    }

    #[test]
    fn test_card_wire_format_is_flat() {
        let card = card_with_review(ReviewState {
            ease_factor: 2.2,
            interval: 6,
            next_review: Some(Utc::now()),
        });

        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["deckId"], "d1");
        assert_eq!(json["easeFactor"], 2.2);
        assert_eq!(json["interval"], 6);
        assert!(json.get("nextReview").is_some());
        assert!(json.get("review").is_none());
    }

    #[test]
    fn test_card_storage_roundtrip() {
        let card = card_with_review(ReviewState::default());
        let encoded = serde_json::to_string(&card).unwrap();
        let decoded: Card = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.review, card.review);
        assert_eq!(decoded.deck_id, card.deck_id);
    }
}
