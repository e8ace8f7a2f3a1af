//! Song query and edit handlers
//!
//! GET /api/songs, GET /api/songs/:id, PATCH /api/songs/:id

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::Song,
    AppState,
};

/// GET /api/songs
///
/// All songs, newest first.
pub async fn list_songs(State(state): State<AppState>) -> Json<Vec<Song>> {
    Json(state.library.list().await)
}

/// GET /api/songs/:id
pub async fn get_song(
    State(state): State<AppState>,
    Path(song_id): Path<Uuid>,
) -> ApiResult<Json<Song>> {
    state
        .library
        .get(song_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Song not found: {}", song_id)))
}

/// PATCH /api/songs/:id request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSongRequest {
    pub title: Option<String>,
    pub lyrics: Option<String>,
    pub genre: Option<String>,
    pub tags: Option<Vec<String>>,
    /// The record version the client based its edit on
    pub version: u64,
}

/// PATCH /api/songs/:id
///
/// User edits bypass the pipeline, but never race it: edits are rejected
/// with 409 while a generation is in flight, and the version check rejects
/// edits based on a stale copy of the record.
pub async fn update_song(
    State(state): State<AppState>,
    Path(song_id): Path<Uuid>,
    Json(request): Json<UpdateSongRequest>,
) -> ApiResult<Json<Song>> {
    let updated = state
        .library
        .update_checked(song_id, |song| {
            if !song.is_terminal() {
                return Err(tunesmith_common::Error::Conflict(format!(
                    "Song {} has a generation in flight ({})",
                    song_id, song.status
                )));
            }
            if song.version != request.version {
                return Err(tunesmith_common::Error::Conflict(format!(
                    "Song {} was modified concurrently (expected version {}, found {})",
                    song_id, request.version, song.version
                )));
            }

            if let Some(title) = request.title {
                song.title = Some(title);
            }
            if let Some(lyrics) = request.lyrics {
                song.lyrics = Some(lyrics);
            }
            if let Some(genre) = request.genre {
                song.genre = Some(genre);
            }
            if let Some(tags) = request.tags {
                song.tags = tags;
            }
            Ok(())
        })
        .await?;

    tracing::info!(song_id = %song_id, version = updated.version, "Song edited");

    Ok(Json(updated))
}

/// Build song routes
pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/songs", get(list_songs))
        .route("/songs/:id", get(get_song).patch(update_song))
}
