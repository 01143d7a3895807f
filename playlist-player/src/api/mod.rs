//! REST API for the playlist player
//!
//! A thin adapter: each route decodes its arguments and calls exactly one
//! coordinator operation.

pub mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::playback::PlaybackCoordinator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<PlaybackCoordinator>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Playback control
        .route("/playback/play", post(handlers::play))
        .route("/playback/pause", post(handlers::pause))
        .route("/playback/next", post(handlers::next))
        .route("/playback/previous", post(handlers::previous))
        .route("/playback/status", get(handlers::status))
        // Playlist management
        .route("/playlist", get(handlers::get_playlist).post(handlers::add_song))
        .route("/playlist/:id", delete(handlers::delete_song))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
