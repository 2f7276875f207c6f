//! Deck CRUD and share-link management.
//!
//! All routes here sit behind `require_auth`; every lookup is scoped to the
//! caller, so another user's deck id behaves exactly like a missing one.

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::app::AppState;
use crate::error::ApiError;
use crate::login::CurrentUser;
use crate::store::{Store, new_id};

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// A flashcard deck owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: String,
    pub owner_id: String,

    /// 1-200 characters, trimmed.
    pub title: String,

    /// Up to 1000 characters; empty by default.
    pub description: String,

    /// Whether the deck is reachable through its share link.
    pub is_public: bool,

    /// Share-link token; present only while the deck has ever been shared.
    pub share_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeckRequest {
    pub title: String,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeckRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

fn validate_title(raw: &str) -> Result<String, ApiError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ApiError::validation("Deck title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::validation(
            "Deck title must be 200 characters or less",
        ));
    }
    Ok(title.to_string())
}

fn validate_description(raw: &str) -> Result<String, ApiError> {
    let description = raw.trim();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::validation(
            "Deck description must be 1000 characters or less",
        ));
    }
    Ok(description.to_string())
}

/// Generates an 8-character alphanumeric share token.
fn generate_share_id() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();

    (0..8)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Loads a deck and verifies the caller owns it. Missing and foreign decks
/// are indistinguishable to the caller.
pub(crate) fn owned_deck(store: &Store, deck_id: &str, owner_id: &str) -> Result<Deck, ApiError> {
    store
        .get_deck(deck_id)
        .filter(|deck| deck.owner_id == owner_id)
        .ok_or(ApiError::NotFound("Deck"))
}

/// GET /api/decks
pub async fn list_decks(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> impl IntoResponse {
    let decks = state.store.decks_for_owner(&user.id);
    let count = decks.len();
    Json(json!({ "decks": decks, "count": count }))
}

/// GET /api/decks/{deckId}: the deck together with its cards.
pub async fn get_deck(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(deck_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deck = owned_deck(&state.store, &deck_id, &user.id)?;
    let cards = state.store.cards_for_deck(&deck.id);
    let card_count = cards.len();

    Ok(Json(json!({
        "deck": deck,
        "cards": cards,
        "cardCount": card_count,
    })))
}

/// POST /api/decks
pub async fn create_deck(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateDeckRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let deck = Deck {
        id: new_id(),
        owner_id: user.id.clone(),
        title: validate_title(&payload.title)?,
        description: validate_description(payload.description.as_deref().unwrap_or(""))?,
        is_public: payload.is_public.unwrap_or(false),
        share_id: None,
        created_at: Utc::now(),
    };

    state.store.put_deck(deck.clone())?;
    log::debug!("user {} created deck {}", user.username, deck.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Deck created successfully",
            "deck": deck,
        })),
    ))
}

/// PATCH /api/decks/{deckId}: partial update.
pub async fn update_deck(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(deck_id): Path<String>,
    Json(payload): Json<UpdateDeckRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut deck = owned_deck(&state.store, &deck_id, &user.id)?;

    if let Some(title) = payload.title {
        deck.title = validate_title(&title)?;
    }
    if let Some(description) = payload.description {
        deck.description = validate_description(&description)?;
    }
    if let Some(is_public) = payload.is_public {
        deck.is_public = is_public;
    }

    state.store.put_deck(deck.clone())?;

    Ok(Json(json!({
        "message": "Deck updated successfully",
        "deck": deck,
    })))
}

/// DELETE /api/decks/{deckId}: removes the deck and all its cards.
pub async fn delete_deck(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(deck_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deck = owned_deck(&state.store, &deck_id, &user.id)?;

    state.store.delete_cards_in_deck(&deck.id)?;
    state.store.delete_deck(&deck.id)?;
    log::debug!("user {} deleted deck {}", user.username, deck.id);

    Ok(Json(json!({
        "message": "Deck and all cards deleted successfully"
    })))
}

/// POST /api/decks/{deckId}/share
///
/// Marks the deck public and assigns a share token if it never had one.
/// Re-sharing an already shared deck keeps the existing token so old links
/// stay valid.
pub async fn share_deck(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(deck_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut deck = owned_deck(&state.store, &deck_id, &user.id)?;

    if deck.share_id.is_none() {
        // Regenerate on the off chance of a collision with another deck
        let mut share_id = generate_share_id();
        while state.store.find_deck_by_share_id(&share_id).is_some() {
            share_id = generate_share_id();
        }
        deck.share_id = Some(share_id);
    }
    deck.is_public = true;

    state.store.put_deck(deck.clone())?;

    Ok(Json(json!({
        "message": "Deck shared successfully",
        "deck": deck,
    })))
}

/// DELETE /api/decks/{deckId}/share: revokes the link and goes private.
pub async fn unshare_deck(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(deck_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut deck = owned_deck(&state.store, &deck_id, &user.id)?;

    deck.share_id = None;
    deck.is_public = false;
    state.store.put_deck(deck.clone())?;

    Ok(Json(json!({
        "message": "Deck is no longer shared",
        "deck": deck,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title("  Geography  ").unwrap(), "Geography");
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"t".repeat(201)).is_err());
        assert_eq!(validate_title(&"t".repeat(200)).unwrap().len(), 200);
    }

    #[test]
    fn test_validate_description() {
        assert_eq!(validate_description("").unwrap(), "");
        assert!(validate_description(&"d".repeat(1001)).is_err());
    }

    #[test]
    fn test_limits_count_characters_not_bytes() {
        // 150 CJK characters are 450 bytes but still within the 200 cap
        assert!(validate_title(&"語".repeat(150)).is_ok());
        assert!(validate_title(&"語".repeat(201)).is_err());
        assert!(validate_description(&"é".repeat(1000)).is_ok());
        assert!(validate_description(&"é".repeat(1001)).is_err());
    }

    #[test]
    fn test_share_id_shape() {
        let id = generate_share_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_deck_wire_format() {
        let deck = Deck {
            id: "d1".to_string(),
            owner_id: "u1".to_string(),
            title: "Words".to_string(),
            description: String::new(),
            is_public: true,
            share_id: Some("AB12CD34".to_string()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&deck).unwrap();
        assert_eq!(json["ownerId"], "u1");
        assert_eq!(json["isPublic"], true);
        assert_eq!(json["shareId"], "AB12CD34");
    }
}
