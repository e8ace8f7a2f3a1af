//! Audio track generation client
//!
//! The audio provider renders a full track from lyrics and song metadata.
//! Its credential is optional: without one, generation degrades to a
//! deterministic placeholder track instead of failing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

use tunesmith_common::{Error, Result};

use super::lyrics::USER_AGENT;
use super::retry::{with_backoff, BackoffPolicy, CircuitBreaker};
use crate::models::VocalGender;

const DEFAULT_BASE_URL: &str = "https://api.waveloom.dev/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Inputs for the audio step
#[derive(Debug, Clone)]
pub struct AudioBrief {
    pub lyrics: String,
    pub genre: Option<String>,
    pub tempo_bpm: Option<u16>,
    pub key_signature: Option<String>,
    pub vocal_gender: Option<VocalGender>,
    pub exclude_styles: Vec<String>,
}

/// Rendered track reference
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub url: String,
}

/// Audio generation capability consumed by the pipeline
#[async_trait]
pub trait AudioGenerator: Send + Sync {
    async fn generate(&self, song_id: Uuid, brief: &AudioBrief) -> Result<AudioAsset>;
}

#[derive(Debug, Serialize)]
struct RenderTrackRequest<'a> {
    lyrics: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    genre: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tempo_bpm: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_signature: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vocal_gender: Option<VocalGender>,
    exclude_styles: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RenderTrackResponse {
    url: String,
}

/// HTTP client for the audio provider
pub struct HttpAudioGenerator {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    policy: BackoffPolicy,
    breaker: CircuitBreaker,
}

impl HttpAudioGenerator {
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
            breaker: CircuitBreaker::for_provider("audio provider"),
        })
    }

    async fn request(&self, brief: &AudioBrief) -> Result<AudioAsset> {
        let url = format!("{}/tracks/render", self.base_url);
        let body = RenderTrackRequest {
            lyrics: &brief.lyrics,
            genre: brief.genre.as_deref(),
            tempo_bpm: brief.tempo_bpm,
            key_signature: brief.key_signature.as_deref(),
            vocal_gender: brief.vocal_gender,
            exclude_styles: &brief.exclude_styles,
        };

        tracing::debug!(url = %url, "Querying audio provider");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("audio provider unreachable: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(Error::ProviderUnavailable(format!(
                "audio provider returned {}",
                status
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "audio provider rejected the request ({}): {}",
                status, detail
            )));
        }

        let parsed: RenderTrackResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("audio provider response malformed: {}", e)))?;

        Ok(AudioAsset { url: parsed.url })
    }
}

#[async_trait]
impl AudioGenerator for HttpAudioGenerator {
    async fn generate(&self, _song_id: Uuid, brief: &AudioBrief) -> Result<AudioAsset> {
        self.breaker
            .call(|| with_backoff("audio generation", &self.policy, || self.request(brief)))
            .await
    }
}

/// Stand-in audio generator used when no audio credential is configured.
///
/// The track reference is derived from the song id, so repeated runs for
/// the same song always produce the same placeholder.
pub struct PlaceholderAudioGenerator;

#[async_trait]
impl AudioGenerator for PlaceholderAudioGenerator {
    async fn generate(&self, song_id: Uuid, _brief: &AudioBrief) -> Result<AudioAsset> {
        let digest = Sha256::digest(song_id.as_bytes());
        let tag: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();

        tracing::debug!(
            song_id = %song_id,
            "No audio credential configured, emitting placeholder track"
        );

        Ok(AudioAsset {
            url: format!("/assets/placeholder/{}.mp3", tag),
        })
    }
}
