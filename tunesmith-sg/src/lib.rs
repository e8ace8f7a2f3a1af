//! tunesmith-sg library interface
//!
//! Song generation microservice: a prompt goes in, a generated song
//! (lyrics, audio, cover art, music video) comes out, assembled by chaining
//! three external generative providers. Clients poll per-song status until
//! a terminal state.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::services::{PipelineRunner, Providers, VideoPolling};
use crate::store::Library;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Disk-backed song library
    pub library: Arc<Library>,
    /// External generation capabilities
    pub providers: Providers,
    /// Video render polling knobs
    pub video: VideoPolling,
    /// Supervises detached pipeline tasks so shutdown can drain them
    pub tasks: TaskTracker,
    /// Cancelled when the server shuts down
    pub shutdown: CancellationToken,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(library: Arc<Library>, providers: Providers, video: VideoPolling) -> Self {
        Self {
            library,
            providers,
            video,
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            startup_time: Utc::now(),
        }
    }

    /// Build a pipeline runner bound to this state's library and providers.
    pub fn runner(&self) -> PipelineRunner {
        PipelineRunner::new(
            self.library.clone(),
            self.providers.clone(),
            self.video.clone(),
            self.shutdown.clone(),
        )
    }

    /// Spawn a supervised background pipeline task.
    ///
    /// The task records its own outcome into the song record; tracking here
    /// only exists so shutdown can wait for in-flight pipelines to settle.
    pub fn spawn_pipeline<F>(&self, song_id: Uuid, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(async move {
            tracing::debug!(song_id = %song_id, "Background pipeline task started");
            task.await;
            tracing::debug!(song_id = %song_id, "Background pipeline task finished");
        });
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            api::generate_routes().merge(api::song_routes()),
        )
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
