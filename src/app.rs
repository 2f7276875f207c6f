//! Router assembly and the server loop.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::admin;
use crate::cards;
use crate::config::Config;
use crate::decks;
use crate::login;
use crate::shared;
use crate::store::Store;

/// Shared application state handed to every handler.
pub struct AppState {
    pub store: Store,
}

/// Builds the full API router over the given state.
///
/// Route groups:
/// * `/api/users/*` - registration, login, logout (no auth)
/// * `/api/shared/{shareId}` - public shared-deck read (no auth)
/// * deck/card routes plus shared-deck copy - behind `require_auth`
/// * `/api/admin/*` - behind `require_admin`
pub fn router(state: Arc<AppState>) -> Router {
    let user_routes = Router::new()
        .route("/check-username", post(login::check_username))
        .route("/register", post(login::register))
        .route("/login", post(login::login))
        .route("/logout", post(login::logout));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/:user_id", delete(admin::delete_user))
        .route("/users/:user_id/username", patch(admin::update_username))
        .route("/users/:user_id/admin", patch(admin::set_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login::require_admin,
        ));

    let protected_routes = Router::new()
        .route("/decks", get(decks::list_decks).post(decks::create_deck))
        .route(
            "/decks/:deck_id",
            get(decks::get_deck)
                .patch(decks::update_deck)
                .delete(decks::delete_deck),
        )
        .route(
            "/decks/:deck_id/share",
            post(decks::share_deck).delete(decks::unshare_deck),
        )
        .route("/decks/:deck_id/due", get(cards::due_cards))
        .route("/cards", post(cards::create_card))
        .route(
            "/cards/:card_id",
            patch(cards::update_card).delete(cards::delete_card),
        )
        .route("/cards/:card_id/review", post(cards::review_card))
        .route("/shared/:share_id/copy", post(shared::copy_shared_deck))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login::require_auth,
        ));

    let api = Router::new()
        .route("/test", get(api_test))
        .route("/shared/:share_id", get(shared::get_shared_deck))
        .nest("/users", user_routes)
        .nest("/admin", admin_routes)
        .merge(protected_routes);

    Router::new()
        .route("/", get(welcome))
        .nest("/api", api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Opens the store and serves the API until the process is stopped.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(&config.data_dir)?;
    let state = Arc::new(AppState { store });
    let app = router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    log::info!("Server is running on port {}", config.port);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn welcome() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to Flashflashy API" }))
}

async fn api_test() -> impl IntoResponse {
    Json(json!({ "message": "API is working!" }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Route not found" })),
    )
}
