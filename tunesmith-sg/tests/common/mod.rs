//! Shared test helpers: fake providers and an app instance backed by a
//! temporary library snapshot.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use tunesmith_common::{Error, Result};
use tunesmith_sg::models::SongStatus;
use tunesmith_sg::services::{
    audio::{AudioAsset, AudioBrief, AudioGenerator},
    lyrics::{LyricsGenerator, SongBrief, SongText},
    media::{ArtBrief, ImageAsset, MediaGenerator, VideoAsset, VideoBrief, VideoJob},
    Providers, VideoPolling,
};
use tunesmith_sg::store::Library;
use tunesmith_sg::{build_router, AppState};
use uuid::Uuid;

/// Scriptable in-memory stand-in for all three providers
#[derive(Clone, Default)]
pub struct FakeNet {
    pub lyrics_fail: Arc<AtomicBool>,
    pub audio_fail: Arc<AtomicBool>,
    pub art_fail: Arc<AtomicBool>,
    pub video_submit_fail: Arc<AtomicBool>,
    pub lyrics_calls: Arc<AtomicUsize>,
    pub audio_calls: Arc<AtomicUsize>,
    pub art_calls: Arc<AtomicUsize>,
    pub video_jobs: Arc<AtomicUsize>,
    /// Number of "not done yet" poll responses before the render finishes
    pub pending_polls: Arc<AtomicUsize>,
}

impl FakeNet {
    pub fn stall_video(&self) {
        self.pending_polls.store(usize::MAX / 2, Ordering::SeqCst);
    }
}

#[async_trait]
impl LyricsGenerator for FakeNet {
    async fn generate(&self, brief: &SongBrief) -> Result<SongText> {
        self.lyrics_calls.fetch_add(1, Ordering::SeqCst);
        if self.lyrics_fail.load(Ordering::SeqCst) {
            return Err(Error::Provider("rate limited".to_string()));
        }
        Ok(SongText {
            title: format!("Song about {}", brief.prompt),
            lyrics: "Verse one\nChorus\nVerse two".to_string(),
            genre: Some("synthwave".to_string()),
            tempo_bpm: Some(104),
            key_signature: Some("A minor".to_string()),
            tags: vec!["retro".to_string(), "night".to_string()],
        })
    }
}

#[async_trait]
impl AudioGenerator for FakeNet {
    async fn generate(&self, song_id: Uuid, _brief: &AudioBrief) -> Result<AudioAsset> {
        self.audio_calls.fetch_add(1, Ordering::SeqCst);
        if self.audio_fail.load(Ordering::SeqCst) {
            return Err(Error::Provider("audio provider over capacity".to_string()));
        }
        Ok(AudioAsset {
            url: format!("https://tracks.test/{}.mp3", song_id),
        })
    }
}

#[async_trait]
impl MediaGenerator for FakeNet {
    async fn generate_cover_art(&self, _brief: &ArtBrief) -> Result<ImageAsset> {
        self.art_calls.fetch_add(1, Ordering::SeqCst);
        if self.art_fail.load(Ordering::SeqCst) {
            return Err(Error::Provider("art renderer offline".to_string()));
        }
        Ok(ImageAsset {
            url: "https://images.test/cover.png".to_string(),
        })
    }

    async fn start_video(&self, _brief: &VideoBrief) -> Result<VideoJob> {
        if self.video_submit_fail.load(Ordering::SeqCst) {
            return Err(Error::Provider("video renderer rejected the job".to_string()));
        }
        let n = self.video_jobs.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(VideoJob {
            operation: format!("op-{}", n),
        })
    }

    async fn poll_video(&self, job: &VideoJob) -> Result<Option<VideoAsset>> {
        let remaining = self.pending_polls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.pending_polls.store(remaining - 1, Ordering::SeqCst);
            return Ok(None);
        }
        Ok(Some(VideoAsset {
            video_url: format!("https://videos.test/{}.mp4", job.operation),
            thumbnail_url: format!("https://videos.test/{}.jpg", job.operation),
        }))
    }
}

/// Router plus handles for scripting provider behavior
pub struct TestApp {
    pub app: Router,
    pub net: FakeNet,
    _tmp: TempDir,
}

/// Build an app over fake providers and a fresh temp-dir library.
pub async fn spawn_app() -> TestApp {
    let tmp = tempfile::tempdir().expect("Should create temp dir");
    let library = Arc::new(
        Library::load(tmp.path().join("songs.json"))
            .await
            .expect("Should load empty library"),
    );

    let net = FakeNet::default();
    let providers = Providers {
        lyrics: Arc::new(net.clone()),
        audio: Arc::new(net.clone()),
        media: Arc::new(net.clone()),
    };
    // Fast polling so video completion and timeouts both land quickly
    let video = VideoPolling {
        interval: Duration::from_millis(5),
        timeout: Duration::from_millis(500),
    };

    let state = AppState::new(library, providers, video);
    let app = build_router(state);

    TestApp {
        app,
        net,
        _tmp: tmp,
    }
}

/// Build a JSON request
pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a bodyless request
pub fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Extract raw body bytes from a response
pub async fn extract_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

/// Extract JSON body from a response
pub async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&extract_bytes(body).await).expect("Should parse JSON")
}

/// Send a request and return (status, json body)
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = extract_json(response.into_body()).await;
    (status, body)
}

/// POST /api/generate with the given prompt, returning the created record
pub async fn generate_song(app: &Router, body: Value) -> (StatusCode, Value) {
    send(app, json_request("POST", "/api/generate", body)).await
}

/// GET /api/songs/:id
pub async fn get_song(app: &Router, id: &str) -> Value {
    let (status, body) = send(app, test_request("GET", &format!("/api/songs/{}", id))).await;
    assert_eq!(status, StatusCode::OK, "song {} should exist: {}", id, body);
    body
}

/// Poll GET /api/songs/:id until the song reaches a terminal state
pub async fn wait_for_terminal(app: &Router, id: &str) -> Value {
    for _ in 0..400 {
        let song = get_song(app, id).await;
        let status = song["status"].as_str().unwrap_or_default().to_string();
        if status == SongStatus::Complete.as_str() || status == SongStatus::Error.as_str() {
            return song;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("song {} never reached a terminal state", id);
}
