//! Song record and generation state machine
//!
//! A song progresses through the ordered pipeline stages
//! writing lyrics → composing audio → painting cover art → generating video
//! → rendering video, ending in `complete` or `error`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tunesmith_common::{Error, Result};
use uuid::Uuid;

/// Generation pipeline state
///
/// Wire values double as the human-readable stage names clients display,
/// so renames here are a breaking API change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SongStatus {
    /// Text provider produces title, lyrics and song metadata
    #[serde(rename = "writing lyrics")]
    GeneratingLyrics,
    /// Audio provider renders the track
    #[serde(rename = "composing audio")]
    GeneratingAudio,
    /// Media provider paints the cover art
    #[serde(rename = "painting cover art")]
    GeneratingArt,
    /// Video render job submitted
    #[serde(rename = "generating video")]
    GeneratingVideo,
    /// Awaiting the video render job
    #[serde(rename = "rendering video")]
    PollingVideo,
    /// All artifacts produced
    #[serde(rename = "complete")]
    Complete,
    /// A step failed; `failed_step` records where
    #[serde(rename = "error")]
    Error,
}

impl SongStatus {
    /// Main pipeline steps, in execution order. The video sub-pipeline runs
    /// unconditionally after these and is not part of the list.
    pub const PIPELINE_STEPS: [SongStatus; 3] = [
        SongStatus::GeneratingLyrics,
        SongStatus::GeneratingAudio,
        SongStatus::GeneratingArt,
    ];

    /// Check if no further automatic transition occurs from this state
    pub fn is_terminal(self) -> bool {
        matches!(self, SongStatus::Complete | SongStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SongStatus::GeneratingLyrics => "writing lyrics",
            SongStatus::GeneratingAudio => "composing audio",
            SongStatus::GeneratingArt => "painting cover art",
            SongStatus::GeneratingVideo => "generating video",
            SongStatus::PollingVideo => "rendering video",
            SongStatus::Complete => "complete",
            SongStatus::Error => "error",
        }
    }
}

impl fmt::Display for SongStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vocal preference forwarded to the audio provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocalGender {
    Male,
    Female,
}

/// Optional generation tuning supplied by the advanced form section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedOptions {
    /// Styles the providers must avoid
    #[serde(default)]
    pub exclude_styles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocal_gender: Option<VocalGender>,
    /// 0-100, how strongly the prompt's style steers generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_influence: Option<u8>,
    /// 0-100, how far from the prompt the result may stray
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weirdness: Option<u8>,
}

impl AdvancedOptions {
    /// Validate the influence scalars are within 0-100
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("styleInfluence", self.style_influence),
            ("weirdness", self.weirdness),
        ] {
            if let Some(v) = value {
                if v > 100 {
                    return Err(Error::InvalidInput(format!(
                        "{} must be between 0 and 100, got {}",
                        name, v
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The persisted representation of one song and its generation progress
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Unique song identifier (immutable)
    pub id: Uuid,
    pub created_at: DateTime<Utc>,

    /// The user's free-text prompt
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_lyrics: Option<String>,
    pub video_style: String,
    pub difficulty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_options: Option<AdvancedOptions>,

    // Generated artifacts, each populated by its pipeline step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Tempo in BPM
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_signature: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_art_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    pub status: SongStatus,
    pub status_message: String,
    /// Present iff status == error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<SongStatus>,

    /// Mutation counter; edits must present the version they saw
    #[serde(default)]
    pub version: u64,
}

impl Song {
    /// Create a new song record queued at the first pipeline stage.
    ///
    /// Custom lyrics are copied into `lyrics` up front so the lyrics step
    /// sees its artifact precondition satisfied and no-ops.
    pub fn new(
        prompt: String,
        custom_lyrics: Option<String>,
        video_style: String,
        difficulty: String,
        advanced_options: Option<AdvancedOptions>,
    ) -> Self {
        let lyrics = custom_lyrics.clone().filter(|l| !l.trim().is_empty());
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            prompt,
            custom_lyrics,
            video_style,
            difficulty,
            advanced_options,
            title: None,
            lyrics,
            genre: None,
            tempo: None,
            key_signature: None,
            tags: Vec::new(),
            cover_art_url: None,
            audio_url: None,
            video_url: None,
            thumbnail_url: None,
            status: SongStatus::GeneratingLyrics,
            status_message: String::from("Queued for generation"),
            failed_step: None,
            version: 0,
        }
    }

    /// Move to a new stage with a progress message.
    ///
    /// Leaving `error` through here clears `failed_step`, keeping the
    /// failed-step-iff-error invariant in one place.
    pub fn set_progress(&mut self, status: SongStatus, message: impl Into<String>) {
        self.status = status;
        self.status_message = message.into();
        if status != SongStatus::Error {
            self.failed_step = None;
        }
    }

    /// Record a failure at `failed_step` and move to `error`.
    pub fn record_failure(&mut self, failed_step: SongStatus, message: impl Into<String>) {
        let message = message.into();
        self.failed_step = Some(failed_step);
        self.status = SongStatus::Error;
        self.status_message = if message.is_empty() {
            String::from("Song generation failed")
        } else {
            message
        };
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
