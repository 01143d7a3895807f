//! HTTP request handlers

use crate::api::AppState;
use crate::db::in_play_order;
use crate::error::Error;
use crate::playback::PlaybackStatus;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use playlist_common::Track;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl StatusResponse {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    #[serde(default)]
    id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AddSongRequest {
    description: String,
    duration: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaylistQuery {
    #[serde(default)]
    ordered: bool,
}

#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    songs: Vec<Track>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        (
            status,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(self.to_string()),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, Error>;

/// Decode a JSON request body, reporting every failure as `InvalidArgument`
fn parse_json_body<T: DeserializeOwned>(headers: &HeaderMap, body: &[u8]) -> ApiResult<T> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("application/json") {
        return Err(Error::InvalidArgument(format!(
            "expected content-type application/json, got {:?}",
            content_type
        )));
    }

    serde_json::from_slice(body)
        .map_err(|e| Error::InvalidArgument(format!("malformed request body: {}", e)))
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "playlist_player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Playback Endpoints
// ============================================================================

/// POST /playback/play - Start or resume; body `{"id": n}` is optional
///
/// Only an empty body means `id = 0`; anything unparsable is rejected.
pub async fn play(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<StatusResponse>> {
    let id = if body.iter().all(u8::is_ascii_whitespace) {
        0
    } else {
        parse_json_body::<PlayRequest>(&headers, &body)?.id
    };
    info!("Play request (id={})", id);

    state.coordinator.play(id).await?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /playback/pause
pub async fn pause(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    info!("Pause request");
    state.coordinator.pause().await?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /playback/next
pub async fn next(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    info!("Skip next request");
    state.coordinator.next().await?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /playback/previous
pub async fn previous(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    info!("Skip previous request");
    state.coordinator.prev().await?;
    Ok(Json(StatusResponse::ok()))
}

/// GET /playback/status
pub async fn status(State(state): State<AppState>) -> Json<PlaybackStatus> {
    Json(state.coordinator.status().await)
}

// ============================================================================
// Playlist Endpoints
// ============================================================================

/// GET /playlist?ordered=true - All tracks, optionally in play order
pub async fn get_playlist(
    State(state): State<AppState>,
    Query(query): Query<PlaylistQuery>,
) -> ApiResult<Json<PlaylistResponse>> {
    let mut songs = state.coordinator.get_playlist().await?;
    if query.ordered {
        songs = in_play_order(songs)?;
    }
    Ok(Json(PlaylistResponse { songs }))
}

/// POST /playlist - Append a track
pub async fn add_song(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Track>)> {
    let request: AddSongRequest = parse_json_body(&headers, &body)?;
    info!("Add song request ({:?}, {}s)", request.description, request.duration);
    let track = state
        .coordinator
        .add_song(&request.description, request.duration)
        .await?;
    Ok((StatusCode::CREATED, Json(track)))
}

/// DELETE /playlist/:id
pub async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<StatusResponse>> {
    info!("Delete request (id={})", id);
    state.coordinator.delete(id).await?;
    Ok(Json(StatusResponse::ok()))
}
