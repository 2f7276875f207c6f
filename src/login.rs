//! User accounts, authentication, and sessions.
//!
//! Registration and login issue a `session` cookie backed by the in-memory
//! session table; `require_auth` resolves that cookie into a [`CurrentUser`]
//! request extension for the protected routes, and `require_admin` layers a
//! role check on top. Passwords are hashed with Argon2id and never leave the
//! user collection.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::app::AppState;
use crate::error::ApiError;
use crate::store::{Store, new_id};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
}

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// A registered user, as stored in the user collection.
///
/// Field names follow the wire convention (camelCase) so the stored
/// documents look like the API's JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    /// Unique, lowercased, 3-30 characters.
    pub username: String,

    /// Unique, lowercased.
    pub email: String,

    /// Argon2 hash of the user's password. Never serialized to API clients;
    /// responses go through [`User::sanitized`].
    pub password_hash: String,

    pub profile_photo_url: Option<String>,

    /// Admin role claim; checked by [`require_admin`].
    pub is_admin: bool,

    pub created_at: DateTime<Utc>,
}

/// The client-facing view of a user: everything except the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub profile_photo_url: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Strips the password hash for API responses.
    pub fn sanitized(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            profile_photo_url: self.profile_photo_url.clone(),
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_or_username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckUsernameRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct CheckUsernameResponse {
    pub available: bool,
    pub message: String,
}

/// Hash a password using Argon2id with a random salt.
fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(std::io::Error::other(e.to_string())))
}

/// Verify a password against a stored Argon2 hash.
fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Normalizes and validates a username: trimmed, lowercased, 3-30
/// characters (counted as characters, not bytes).
pub(crate) fn normalize_username(raw: &str) -> Result<String, ApiError> {
    let username = raw.trim().to_lowercase();
    let length = username.chars().count();
    if length < 3 || length > 30 {
        return Err(ApiError::validation(
            "Username must be between 3 and 30 characters",
        ));
    }
    Ok(username)
}

/// POST /api/users/check-username
///
/// Reports whether a username is free. Unlike the other endpoints this one
/// answers with an `{available, message}` body even for invalid input.
pub async fn check_username(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckUsernameRequest>,
) -> impl IntoResponse {
    let username = payload.username.trim().to_lowercase();

    if username.chars().count() < 3 {
        return (
            StatusCode::BAD_REQUEST,
            Json(CheckUsernameResponse {
                available: false,
                message: "Username must be at least 3 characters long".to_string(),
            }),
        );
    }

    if state.store.find_user_by_username(&username).is_some() {
        return (
            StatusCode::OK,
            Json(CheckUsernameResponse {
                available: false,
                message: "Username is already taken".to_string(),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(CheckUsernameResponse {
            available: true,
            message: "Username is available".to_string(),
        }),
    )
}

/// POST /api/users/register
///
/// Creates a new account. Usernames and emails are unique and stored
/// lowercased; the password is hashed before it touches the store.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = normalize_username(&payload.username)?;
    let email = payload.email.trim().to_lowercase();

    if !EMAIL_RE.is_match(&email) {
        return Err(ApiError::validation("Please enter a valid email address"));
    }

    if payload.password.chars().count() < 6 {
        return Err(ApiError::validation(
            "Password must be at least 6 characters long",
        ));
    }

    if state.store.find_user_by_username(&username).is_some() {
        return Err(ApiError::validation("Username is already taken"));
    }

    if state.store.find_user_by_email(&email).is_some() {
        return Err(ApiError::validation("Email is already registered"));
    }

    let user = User {
        id: new_id(),
        username,
        email,
        password_hash: hash_password(&payload.password)?,
        profile_photo_url: None,
        is_admin: false,
        created_at: Utc::now(),
    };

    state.store.put_user(user.clone())?;
    log::info!("registered user {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user": user.sanitized(),
        })),
    ))
}

/// POST /api/users/login
///
/// Accepts either the email or the username, verifies the password, and
/// issues a session cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let needle = payload.email_or_username.trim().to_lowercase();
    if needle.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation(
            "Email/username and password are required",
        ));
    }

    let user = state
        .store
        .find_user_by_email(&needle)
        .or_else(|| state.store.find_user_by_username(&needle))
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let session_id = state.store.create_session(&user.id);
    let cookie = Cookie::build((SESSION_COOKIE, session_id)).path("/").build();
    log::info!("user {} logged in", user.username);

    Ok((
        jar.add(cookie),
        Json(json!({
            "message": "Login successful",
            "user": user.sanitized(),
        })),
    ))
}

/// POST /api/users/logout
///
/// Drops the server-side session and clears the cookie.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.store.remove_session(cookie.value());
    }

    let cleared = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (jar.add(cleared), Json(json!({ "message": "Logged out" })))
}

/// Resolves the caller behind a request from its session cookie.
///
/// This is the credential abstraction the protected routes rely on: a
/// request either maps to a stored user or fails with an authentication
/// error.
pub fn resolve_caller(store: &Store, jar: &CookieJar) -> Result<User, ApiError> {
    let cookie = jar.get(SESSION_COOKIE).ok_or(ApiError::Unauthorized)?;
    let user_id = store
        .validate_session(cookie.value())
        .ok_or(ApiError::Unauthorized)?;
    store.get_user(&user_id).ok_or(ApiError::Unauthorized)
}

/// Middleware: requires a valid session and attaches [`CurrentUser`].
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_caller(&state.store, &jar) {
        Ok(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Middleware: requires a valid session whose user holds the admin role.
///
/// The admin check is a claim on the user record, not a comparison against
/// any particular account id.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_caller(&state.store, &jar) {
        Ok(user) if user.is_admin => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Ok(_) => ApiError::Forbidden("Admin access required".to_string()).into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("hunter42").unwrap();
        assert!(verify_password("hunter42", &hash));
        assert!(!verify_password("hunter43", &hash));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Alice ").unwrap(), "alice");
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn test_username_limits_count_characters_not_bytes() {
        // "日本" is 6 bytes but only 2 characters: too short
        assert!(normalize_username("日本").is_err());
        assert_eq!(normalize_username("日本語").unwrap(), "日本語");
        // 30 multibyte characters are within the limit, 31 are not
        assert!(normalize_username(&"ü".repeat(30)).is_ok());
        assert!(normalize_username(&"ü".repeat(31)).is_err());
    }

    #[test]
    fn test_email_pattern() {
        assert!(EMAIL_RE.is_match("user@example.com"));
        assert!(!EMAIL_RE.is_match("user@nodot"));
        assert!(!EMAIL_RE.is_match("not an email"));
    }

    #[test]
    fn test_sanitized_drops_hash() {
        let user = User {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "secret".to_string(),
            profile_photo_url: None,
            is_admin: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(user.sanitized()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
