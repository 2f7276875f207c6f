//! Admin-only user management.
//!
//! Sits behind `require_admin`, which checks the admin role claim on the
//! caller's user record. The guards here keep the system administerable:
//! admins cannot delete themselves, and the last admin can neither be
//! deleted nor demoted.

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::app::AppState;
use crate::error::ApiError;
use crate::login::{CurrentUser, PublicUser, normalize_username};

#[derive(Debug, Deserialize)]
pub struct UpdateUsernameRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

/// GET /api/admin/users: every account, newest first, hashes excluded.
pub async fn list_users(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let users: Vec<PublicUser> = state
        .store
        .list_users()
        .iter()
        .map(|u| u.sanitized())
        .collect();
    let count = users.len();

    Json(json!({ "users": users, "count": count }))
}

/// DELETE /api/admin/users/{userId}
///
/// Deletes the account and everything it owns: cards, decks, live sessions.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if user_id == admin.id {
        return Err(ApiError::validation("Cannot delete your own account"));
    }

    let target = state
        .store
        .get_user(&user_id)
        .ok_or(ApiError::NotFound("User"))?;

    if target.is_admin && state.store.admin_count() <= 1 {
        return Err(ApiError::validation("Cannot delete the last admin account"));
    }

    for deck in state.store.decks_for_owner(&target.id) {
        state.store.delete_cards_in_deck(&deck.id)?;
        state.store.delete_deck(&deck.id)?;
    }
    state.store.delete_user(&target.id)?;
    state.store.remove_sessions_for_user(&target.id);

    log::info!("admin {} deleted user {}", admin.username, target.username);

    Ok(Json(json!({
        "message": "User and all associated data deleted successfully"
    })))
}

/// PATCH /api/admin/users/{userId}/username
pub async fn update_username(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUsernameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = normalize_username(&payload.username)?;

    let mut target = state
        .store
        .get_user(&user_id)
        .ok_or(ApiError::NotFound("User"))?;

    if let Some(existing) = state.store.find_user_by_username(&username) {
        if existing.id != target.id {
            return Err(ApiError::validation("Username is already taken"));
        }
    }

    log::info!(
        "admin {} renamed user {} to {}",
        admin.username,
        target.username,
        username
    );
    target.username = username;
    state.store.put_user(target.clone())?;

    Ok(Json(json!({
        "message": "Username updated successfully",
        "user": target.sanitized(),
    })))
}

/// PATCH /api/admin/users/{userId}/admin: grant or revoke the admin role.
pub async fn set_admin(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(user_id): Path<String>,
    Json(payload): Json<SetAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if user_id == admin.id && !payload.is_admin {
        return Err(ApiError::validation("Cannot remove your own admin status"));
    }

    let mut target = state
        .store
        .get_user(&user_id)
        .ok_or(ApiError::NotFound("User"))?;

    if target.is_admin && !payload.is_admin && state.store.admin_count() <= 1 {
        return Err(ApiError::validation("Cannot demote the last admin account"));
    }

    target.is_admin = payload.is_admin;
    state.store.put_user(target.clone())?;

    let verb = if payload.is_admin {
        "promoted to"
    } else {
        "removed from"
    };

    Ok(Json(json!({
        "message": format!("User {verb} admin successfully"),
        "user": target.sanitized(),
    })))
}
