//! Lyrics and song-concept generation client
//!
//! The text provider turns a prompt into the full song concept: title,
//! lyrics, genre, tempo, key signature and tags. The provider wire format
//! is owned end-to-end by this adapter; the pipeline only sees the
//! capability trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use tunesmith_common::{Error, Result};

use super::retry::{with_backoff, BackoffPolicy, CircuitBreaker};
use crate::models::VocalGender;

pub(crate) const USER_AGENT: &str = "Tunesmith/0.1.0 (https://github.com/tunesmith/tunesmith)";
const DEFAULT_BASE_URL: &str = "https://api.versecraft.dev/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Inputs for the lyrics step
#[derive(Debug, Clone)]
pub struct SongBrief {
    pub prompt: String,
    pub exclude_styles: Vec<String>,
    pub vocal_gender: Option<VocalGender>,
    pub style_influence: Option<u8>,
    pub weirdness: Option<u8>,
}

/// Song concept produced by the text provider
#[derive(Debug, Clone)]
pub struct SongText {
    pub title: String,
    pub lyrics: String,
    pub genre: Option<String>,
    pub tempo_bpm: Option<u16>,
    pub key_signature: Option<String>,
    pub tags: Vec<String>,
}

/// Text generation capability consumed by the pipeline
#[async_trait]
pub trait LyricsGenerator: Send + Sync {
    async fn generate(&self, brief: &SongBrief) -> Result<SongText>;
}

#[derive(Debug, Serialize)]
struct ComposeRequest<'a> {
    prompt: &'a str,
    exclude_styles: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    vocal_gender: Option<VocalGender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style_influence: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    weirdness: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct ComposeResponse {
    title: String,
    lyrics: String,
    genre: Option<String>,
    tempo_bpm: Option<u16>,
    key_signature: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// HTTP client for the text provider
pub struct HttpLyricsGenerator {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    policy: BackoffPolicy,
    breaker: CircuitBreaker,
}

impl HttpLyricsGenerator {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            policy: BackoffPolicy::default(),
            breaker: CircuitBreaker::for_provider("lyrics provider"),
        })
    }

    async fn request(&self, brief: &SongBrief) -> Result<SongText> {
        let url = format!("{}/songs/compose", self.base_url);
        let body = ComposeRequest {
            prompt: &brief.prompt,
            exclude_styles: &brief.exclude_styles,
            vocal_gender: brief.vocal_gender,
            style_influence: brief.style_influence,
            weirdness: brief.weirdness,
        };

        tracing::debug!(url = %url, "Querying lyrics provider");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("lyrics provider unreachable: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(Error::ProviderUnavailable(format!(
                "lyrics provider returned {}",
                status
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "lyrics provider rejected the request ({}): {}",
                status, detail
            )));
        }

        let parsed: ComposeResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("lyrics provider response malformed: {}", e)))?;

        Ok(SongText {
            title: parsed.title,
            lyrics: parsed.lyrics,
            genre: parsed.genre,
            tempo_bpm: parsed.tempo_bpm,
            key_signature: parsed.key_signature,
            tags: parsed.tags,
        })
    }
}

#[async_trait]
impl LyricsGenerator for HttpLyricsGenerator {
    async fn generate(&self, brief: &SongBrief) -> Result<SongText> {
        self.breaker
            .call(|| with_backoff("lyrics generation", &self.policy, || self.request(brief)))
            .await
    }
}
