//! Cover art and music video generation client
//!
//! One provider covers both image and video capabilities. Video rendering
//! is a submit-then-poll protocol: `start_video` returns an operation
//! handle and `poll_video` reports `None` until the render finishes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use tunesmith_common::{Error, Result};

use super::lyrics::USER_AGENT;
use super::retry::{with_backoff, BackoffPolicy, CircuitBreaker};

const DEFAULT_BASE_URL: &str = "https://api.framelight.dev/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Inputs for the cover art step
#[derive(Debug, Clone)]
pub struct ArtBrief {
    pub title: Option<String>,
    pub prompt: String,
    pub genre: Option<String>,
    pub tags: Vec<String>,
}

/// Rendered cover art reference
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub url: String,
}

/// Inputs for the video sub-pipeline
#[derive(Debug, Clone)]
pub struct VideoBrief {
    pub title: Option<String>,
    pub prompt: String,
    pub style: String,
    pub difficulty: String,
    pub style_influence: Option<u8>,
    pub weirdness: Option<u8>,
    pub cover_art_url: Option<String>,
}

/// Handle for an in-flight video render operation
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub operation: String,
}

/// Finished video render
#[derive(Debug, Clone)]
pub struct VideoAsset {
    pub video_url: String,
    pub thumbnail_url: String,
}

/// Image and video generation capability consumed by the pipeline
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    async fn generate_cover_art(&self, brief: &ArtBrief) -> Result<ImageAsset>;

    /// Submit a video render job; completion is observed via
    /// [`poll_video`](Self::poll_video).
    async fn start_video(&self, brief: &VideoBrief) -> Result<VideoJob>;

    /// Check a render job. `Ok(None)` means not done yet.
    async fn poll_video(&self, job: &VideoJob) -> Result<Option<VideoAsset>>;
}

#[derive(Debug, Serialize)]
struct RenderImageRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    genre: Option<&'a str>,
    tags: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RenderImageResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct RenderVideoRequest<'a> {
    prompt: &'a str,
    style: &'a str,
    difficulty: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style_influence: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    weirdness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover_art_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RenderVideoResponse {
    operation: String,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    done: bool,
    error: Option<String>,
    video_url: Option<String>,
    thumbnail_url: Option<String>,
}

/// HTTP client for the image/video provider
pub struct HttpMediaGenerator {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    policy: BackoffPolicy,
    breaker: CircuitBreaker,
}

impl HttpMediaGenerator {
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
            breaker: CircuitBreaker::for_provider("media provider"),
        })
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("media provider unreachable: {}", e)))?;

        Self::decode(response).await
    }

    async fn get_json<R>(&self, url: &str) -> Result<R>
    where
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("media provider unreachable: {}", e)))?;

        Self::decode(response).await
    }

    async fn decode<R>(response: reqwest::Response) -> Result<R>
    where
        R: serde::de::DeserializeOwned,
    {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(Error::ProviderUnavailable(format!(
                "media provider returned {}",
                status
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "media provider rejected the request ({}): {}",
                status, detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("media provider response malformed: {}", e)))
    }
}

#[async_trait]
impl MediaGenerator for HttpMediaGenerator {
    async fn generate_cover_art(&self, brief: &ArtBrief) -> Result<ImageAsset> {
        let url = format!("{}/images/render", self.base_url);
        let body = RenderImageRequest {
            prompt: &brief.prompt,
            title: brief.title.as_deref(),
            genre: brief.genre.as_deref(),
            tags: &brief.tags,
        };

        let parsed: RenderImageResponse = self
            .breaker
            .call(|| with_backoff("cover art generation", &self.policy, || self.post_json(&url, &body)))
            .await?;

        Ok(ImageAsset { url: parsed.url })
    }

    async fn start_video(&self, brief: &VideoBrief) -> Result<VideoJob> {
        let url = format!("{}/videos/render", self.base_url);
        let body = RenderVideoRequest {
            prompt: &brief.prompt,
            style: &brief.style,
            difficulty: &brief.difficulty,
            title: brief.title.as_deref(),
            style_influence: brief.style_influence,
            weirdness: brief.weirdness,
            cover_art_url: brief.cover_art_url.as_deref(),
        };

        let parsed: RenderVideoResponse = self
            .breaker
            .call(|| with_backoff("video submission", &self.policy, || self.post_json(&url, &body)))
            .await?;

        Ok(VideoJob {
            operation: parsed.operation,
        })
    }

    async fn poll_video(&self, job: &VideoJob) -> Result<Option<VideoAsset>> {
        let url = format!("{}/operations/{}", self.base_url, job.operation);

        let parsed: OperationResponse = self
            .breaker
            .call(|| with_backoff("video poll", &self.policy, || self.get_json(&url)))
            .await?;

        if !parsed.done {
            return Ok(None);
        }
        if let Some(message) = parsed.error {
            return Err(Error::Provider(message));
        }
        match (parsed.video_url, parsed.thumbnail_url) {
            (Some(video_url), Some(thumbnail_url)) => Ok(Some(VideoAsset {
                video_url,
                thumbnail_url,
            })),
            _ => Err(Error::Provider(
                "media provider reported a finished render without asset URLs".to_string(),
            )),
        }
    }
}
