use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Deck
        .route("/deck", get(handlers::get_deck))
        .route("/deck/swipe", post(handlers::swipe))
        .route("/deck/reset", post(handlers::reset_deck))
        // Audio focus
        .route("/deck/audio/play", post(handlers::play_clip))
        .route("/deck/audio/stop", post(handlers::stop_audio))
        // Favorites
        .route("/favorites", get(handlers::get_favorites))
        .route("/favorites/:id", delete(handlers::remove_favorite))
        // Preferences
        .route("/preferences", get(handlers::get_preferences))
        // Identity
        .route("/session/login", post(handlers::login))
        .route("/session/logout", post(handlers::logout))
        // Notifications badge
        .route(
            "/notifications/unread_count",
            get(handlers::unread_notifications),
        )
}
