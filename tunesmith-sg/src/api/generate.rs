//! Generation API handlers
//!
//! POST /api/generate, POST /api/retry, POST /api/regenerate-video.
//! Each handler validates, persists, responds immediately with the updated
//! record, and leaves the actual generation to a supervised background
//! task observable through polling.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{AdvancedOptions, Song, SongStatus},
    AppState,
};

/// POST /api/generate request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: Option<String>,
    pub custom_lyrics: Option<String>,
    pub video_style: Option<String>,
    pub difficulty: Option<String>,
    pub advanced_options: Option<AdvancedOptions>,
}

/// Song reference inside retry/regenerate requests. Clients send the whole
/// record back; only the id matters, the rest is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRef {
    pub id: Uuid,
}

/// POST /api/retry request
#[derive(Debug, Deserialize)]
pub struct RetryRequest {
    pub song: SongRef,
}

/// POST /api/regenerate-video request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateVideoRequest {
    pub song: SongRef,
    pub video_style: String,
    pub difficulty: String,
}

/// POST /api/generate
///
/// Create the song record and start its pipeline. Returns 201 with the
/// freshly created record; progress is observed via GET /api/songs/:id.
pub async fn generate_song(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<(StatusCode, Json<Song>)> {
    let prompt = request
        .prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("prompt is required".to_string()))?;

    if let Some(options) = &request.advanced_options {
        options.validate()?;
    }

    let song = Song::new(
        prompt,
        request.custom_lyrics,
        request
            .video_style
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "cinematic".to_string()),
        request
            .difficulty
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "standard".to_string()),
        request.advanced_options,
    );

    state.library.insert(song.clone()).await?;

    tracing::info!(
        song_id = %song.id,
        "Song record created, starting generation pipeline"
    );

    let runner = state.runner();
    let song_id = song.id;
    state.spawn_pipeline(song_id, async move {
        runner.run(song_id, None).await;
    });

    Ok((StatusCode::CREATED, Json(song)))
}

/// POST /api/retry
///
/// Resume a failed song at its recorded failed step. 400 when the song has
/// no recorded failure, 404 when it does not exist.
pub async fn retry_song(
    State(state): State<AppState>,
    Json(request): Json<RetryRequest>,
) -> ApiResult<Json<Song>> {
    let song_id = request.song.id;

    let updated = state
        .library
        .update_checked(song_id, |song| {
            let step = song.failed_step.ok_or_else(|| {
                tunesmith_common::Error::InvalidInput(format!(
                    "Song {} has no recorded failure to retry",
                    song_id
                ))
            })?;
            song.set_progress(step, format!("Retrying from \"{}\"", step));
            Ok(())
        })
        .await?;

    let step = updated.status;
    tracing::info!(song_id = %song_id, step = %step, "Retrying song generation");

    let runner = state.runner();
    state.spawn_pipeline(song_id, async move {
        runner.run(song_id, Some(step)).await;
    });

    Ok(Json(updated))
}

/// POST /api/regenerate-video
///
/// Re-run only the video sub-pipeline with a new style/difficulty. Earlier
/// artifacts (lyrics, audio, cover art) are untouched.
pub async fn regenerate_video(
    State(state): State<AppState>,
    Json(request): Json<RegenerateVideoRequest>,
) -> ApiResult<Json<Song>> {
    let song_id = request.song.id;

    let updated = state
        .library
        .update(song_id, |song| {
            song.video_style = request.video_style;
            song.difficulty = request.difficulty;
            song.video_url = None;
            song.thumbnail_url = None;
            song.set_progress(
                SongStatus::GeneratingVideo,
                "Regenerating the music video",
            );
        })
        .await?;

    tracing::info!(song_id = %song_id, "Regenerating music video");

    let runner = state.runner();
    state.spawn_pipeline(song_id, async move {
        runner.run_video(song_id).await;
    });

    Ok(Json(updated))
}

/// Build generation routes
pub fn generate_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate_song))
        .route("/retry", post(retry_song))
        .route("/regenerate-video", post(regenerate_video))
}
