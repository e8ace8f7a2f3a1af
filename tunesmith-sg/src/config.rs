//! Service configuration
//!
//! Credentials come from the environment: `TUNESMITH_MEDIA_API_KEY` is
//! required (the text/image/video provider), `TUNESMITH_AUDIO_API_KEY` is
//! optional — without it audio generation degrades to a deterministic
//! placeholder instead of failing. Provider base URLs and the video poll
//! knobs are overridable for tests and ops.

use std::sync::Arc;
use std::time::Duration;

use tunesmith_common::{Error, Result};

use crate::services::{
    HttpAudioGenerator, HttpLyricsGenerator, HttpMediaGenerator, PlaceholderAudioGenerator,
    Providers, VideoPolling,
};

pub const MEDIA_API_KEY_VAR: &str = "TUNESMITH_MEDIA_API_KEY";
pub const AUDIO_API_KEY_VAR: &str = "TUNESMITH_AUDIO_API_KEY";

/// Runtime settings resolved from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub media_api_key: String,
    pub audio_api_key: Option<String>,
    pub media_base_url: Option<String>,
    pub audio_base_url: Option<String>,
    pub video_polling: VideoPolling,
}

impl Settings {
    /// Load settings, refusing to start without the required credential.
    pub fn from_env() -> Result<Self> {
        let media_api_key = env_opt(MEDIA_API_KEY_VAR).ok_or_else(|| {
            Error::Config(format!(
                "{} is required (text/image/video provider credential)",
                MEDIA_API_KEY_VAR
            ))
        })?;

        let video_polling = VideoPolling {
            interval: Duration::from_secs(env_secs("TUNESMITH_VIDEO_POLL_SECS", 10)?),
            timeout: Duration::from_secs(env_secs("TUNESMITH_VIDEO_TIMEOUT_SECS", 600)?),
        };

        Ok(Self {
            media_api_key,
            audio_api_key: env_opt(AUDIO_API_KEY_VAR),
            media_base_url: env_opt("TUNESMITH_MEDIA_BASE_URL"),
            audio_base_url: env_opt("TUNESMITH_AUDIO_BASE_URL"),
            video_polling,
        })
    }

    /// Build the provider set these settings describe.
    pub fn providers(&self) -> Result<Providers> {
        let lyrics = Arc::new(HttpLyricsGenerator::new(
            self.media_api_key.clone(),
            self.media_base_url.clone(),
        )?);
        let media = Arc::new(HttpMediaGenerator::new(
            self.media_api_key.clone(),
            self.media_base_url.clone(),
        )?);

        let audio: Arc<dyn crate::services::AudioGenerator> = match &self.audio_api_key {
            Some(key) => Arc::new(HttpAudioGenerator::new(
                key.clone(),
                self.audio_base_url.clone(),
            )?),
            None => {
                tracing::warn!(
                    "{} not set, audio generation degrades to placeholder tracks",
                    AUDIO_API_KEY_VAR
                );
                Arc::new(PlaceholderAudioGenerator)
            }
        };

        Ok(Providers {
            lyrics,
            audio,
            media,
        })
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_secs(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) if !raw.is_empty() => raw
            .parse::<u64>()
            .map_err(|_| Error::Config(format!("{} must be a number of seconds, got {:?}", name, raw))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn missing_media_key_is_fatal() {
        std::env::remove_var(MEDIA_API_KEY_VAR);
        assert!(Settings::from_env().is_err());
    }

    #[test]
    #[serial]
    fn audio_key_is_optional() {
        std::env::set_var(MEDIA_API_KEY_VAR, "test-key");
        std::env::remove_var(AUDIO_API_KEY_VAR);

        let settings = Settings::from_env().unwrap();
        assert!(settings.audio_api_key.is_none());
        assert_eq!(settings.video_polling.interval, Duration::from_secs(10));
        assert_eq!(settings.video_polling.timeout, Duration::from_secs(600));

        std::env::remove_var(MEDIA_API_KEY_VAR);
    }

    #[test]
    #[serial]
    fn invalid_poll_seconds_is_rejected() {
        std::env::set_var(MEDIA_API_KEY_VAR, "test-key");
        std::env::set_var("TUNESMITH_VIDEO_POLL_SECS", "soon");

        assert!(Settings::from_env().is_err());

        std::env::remove_var("TUNESMITH_VIDEO_POLL_SECS");
        std::env::remove_var(MEDIA_API_KEY_VAR);
    }
}
