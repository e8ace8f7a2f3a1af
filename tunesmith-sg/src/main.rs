//! tunesmith-sg - Song Generation Microservice
//!
//! Accepts a text prompt over HTTP and assembles a song (lyrics, audio,
//! cover art, music video) by chaining external generative providers,
//! tracking per-song status that clients poll until completion.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunesmith_sg::{build_router, config::Settings, store::Library, AppState};

/// Command-line arguments for tunesmith-sg
#[derive(Parser, Debug)]
#[command(name = "tunesmith-sg")]
#[command(about = "Song generation microservice for Tunesmith")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5730", env = "TUNESMITH_SG_PORT")]
    port: u16,

    /// Data directory holding the song library snapshot
    #[arg(short, long)]
    root: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunesmith_sg=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting tunesmith-sg (Song Generation) on port {}", args.port);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Required provider credential is checked before anything else happens
    let settings = Settings::from_env().context("Invalid configuration")?;

    // Resolve and prepare the data directory
    let data_dir =
        tunesmith_common::config::resolve_data_dir(args.root.as_deref(), "TUNESMITH_ROOT");
    tunesmith_common::config::ensure_data_dir(&data_dir)
        .context("Failed to initialize data directory")?;

    let snapshot_path = data_dir.join("songs.json");
    info!("Song library: {}", snapshot_path.display());

    // A corrupt snapshot is fatal; a missing one is an empty library
    let library = Arc::new(
        Library::load(&snapshot_path)
            .await
            .context("Failed to load song library")?,
    );

    let providers = settings.providers().context("Failed to build providers")?;
    let state = AppState::new(library, providers, settings.video_polling.clone());
    let shutdown = state.shutdown.clone();
    let tasks = state.tasks.clone();

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Let in-flight pipelines observe the shutdown and persist retryable
    // error state before the process exits.
    shutdown.cancel();
    tasks.close();
    tasks.wait().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
