//! Song generation pipeline
//!
//! Drives the ordered steps lyrics → audio → art, then the video
//! sub-pipeline, persisting the record around every side effect: the status
//! is set and flushed before a step runs, and its artifacts are flushed
//! before the next step starts. Errors are recorded into the song as
//! status/failedStep/message and never propagated — the pipeline runs
//! detached from the request that started it.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tunesmith_common::{Error, Result};
use uuid::Uuid;

use super::audio::AudioBrief;
use super::lyrics::SongBrief;
use super::media::{ArtBrief, VideoBrief};
use super::Providers;
use crate::models::{Song, SongStatus};
use crate::store::Library;

/// Video render polling knobs
#[derive(Debug, Clone)]
pub struct VideoPolling {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for VideoPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Runs generation pipelines for one song at a time.
///
/// Steps within one song are strictly sequential; different songs run
/// through independent runner instances concurrently.
pub struct PipelineRunner {
    library: Arc<Library>,
    providers: Providers,
    video: VideoPolling,
    shutdown: CancellationToken,
}

impl PipelineRunner {
    pub fn new(
        library: Arc<Library>,
        providers: Providers,
        video: VideoPolling,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            library,
            providers,
            video,
            shutdown,
        }
    }

    /// Run the pipeline for `song_id`, starting at `start_at`.
    ///
    /// An absent or unknown start step falls back to the first step; steps
    /// whose artifact already exists pass through their stage without
    /// re-invoking the provider, which is what makes the fallback safe for
    /// video-only retries.
    pub async fn run(&self, song_id: Uuid, start_at: Option<SongStatus>) {
        let start_index = start_at
            .and_then(|step| {
                SongStatus::PIPELINE_STEPS
                    .iter()
                    .position(|&s| s == step)
            })
            .unwrap_or(0);

        if let Err(err) = self.run_steps(song_id, start_index).await {
            self.record_failure(song_id, err).await;
            return;
        }
        self.run_video(song_id).await;
    }

    /// Run the video sub-pipeline alone (regeneration, or the tail of
    /// [`run`](Self::run)). Failures are recorded with
    /// `failedStep = generating video`; earlier artifacts survive.
    pub async fn run_video(&self, song_id: Uuid) {
        if let Err(err) = self.run_video_inner(song_id).await {
            tracing::error!(song_id = %song_id, error = %err, "Video generation failed");
            let persisted = self
                .library
                .update(song_id, |song| {
                    song.record_failure(SongStatus::GeneratingVideo, err.to_string());
                })
                .await;
            if let Err(persist_err) = persisted {
                tracing::error!(
                    song_id = %song_id,
                    error = %persist_err,
                    "Failed to persist video failure state"
                );
            }
        }
    }

    async fn run_steps(&self, song_id: Uuid, start_index: usize) -> Result<()> {
        for &step in &SongStatus::PIPELINE_STEPS[start_index..] {
            if self.shutdown.is_cancelled() {
                return Err(Error::Internal(
                    "generation interrupted by server shutdown".to_string(),
                ));
            }

            // Stage transition is durable before the step's side effect runs.
            let song = self
                .library
                .update(song_id, |song| {
                    song.set_progress(step, progress_message(step));
                })
                .await?;

            tracing::info!(song_id = %song_id, step = %step, "Pipeline step starting");

            match step {
                SongStatus::GeneratingLyrics => self.step_lyrics(song_id, &song).await?,
                SongStatus::GeneratingAudio => self.step_audio(song_id, &song).await?,
                SongStatus::GeneratingArt => self.step_art(song_id, &song).await?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn step_lyrics(&self, song_id: Uuid, song: &Song) -> Result<()> {
        if song.lyrics.as_deref().is_some_and(|l| !l.is_empty()) {
            tracing::debug!(song_id = %song_id, "Lyrics already present, step passes through");
            return Ok(());
        }

        let advanced = song.advanced_options.clone().unwrap_or_default();
        let brief = SongBrief {
            prompt: song.prompt.clone(),
            exclude_styles: advanced.exclude_styles,
            vocal_gender: advanced.vocal_gender,
            style_influence: advanced.style_influence,
            weirdness: advanced.weirdness,
        };

        let text = self.providers.lyrics.generate(&brief).await?;

        self.library
            .update(song_id, |song| {
                song.title = Some(text.title);
                song.lyrics = Some(text.lyrics);
                song.genre = text.genre;
                song.tempo = text.tempo_bpm;
                song.key_signature = text.key_signature;
                song.tags = text.tags;
            })
            .await?;
        Ok(())
    }

    async fn step_audio(&self, song_id: Uuid, song: &Song) -> Result<()> {
        if song.audio_url.is_some() {
            tracing::debug!(song_id = %song_id, "Audio already present, step passes through");
            return Ok(());
        }

        let advanced = song.advanced_options.clone().unwrap_or_default();
        let brief = AudioBrief {
            lyrics: song.lyrics.clone().unwrap_or_default(),
            genre: song.genre.clone(),
            tempo_bpm: song.tempo,
            key_signature: song.key_signature.clone(),
            vocal_gender: advanced.vocal_gender,
            exclude_styles: advanced.exclude_styles,
        };

        let asset = self.providers.audio.generate(song_id, &brief).await?;

        self.library
            .update(song_id, |song| {
                song.audio_url = Some(asset.url);
            })
            .await?;
        Ok(())
    }

    async fn step_art(&self, song_id: Uuid, song: &Song) -> Result<()> {
        if song.cover_art_url.is_some() {
            tracing::debug!(song_id = %song_id, "Cover art already present, step passes through");
            return Ok(());
        }

        let brief = ArtBrief {
            title: song.title.clone(),
            prompt: song.prompt.clone(),
            genre: song.genre.clone(),
            tags: song.tags.clone(),
        };

        let asset = self.providers.media.generate_cover_art(&brief).await?;

        self.library
            .update(song_id, |song| {
                song.cover_art_url = Some(asset.url);
            })
            .await?;
        Ok(())
    }

    async fn run_video_inner(&self, song_id: Uuid) -> Result<()> {
        let song = self
            .library
            .update(song_id, |song| {
                song.set_progress(
                    SongStatus::GeneratingVideo,
                    progress_message(SongStatus::GeneratingVideo),
                );
            })
            .await?;

        let advanced = song.advanced_options.clone().unwrap_or_default();
        let brief = VideoBrief {
            title: song.title.clone(),
            prompt: song.prompt.clone(),
            style: song.video_style.clone(),
            difficulty: song.difficulty.clone(),
            style_influence: advanced.style_influence,
            weirdness: advanced.weirdness,
            cover_art_url: song.cover_art_url.clone(),
        };

        let job = self.providers.media.start_video(&brief).await?;
        tracing::info!(
            song_id = %song_id,
            operation = %job.operation,
            "Video render job submitted"
        );

        self.library
            .update(song_id, |song| {
                song.set_progress(
                    SongStatus::PollingVideo,
                    progress_message(SongStatus::PollingVideo),
                );
            })
            .await?;

        let deadline = tokio::time::Instant::now() + self.video.timeout;
        loop {
            if let Some(asset) = self.providers.media.poll_video(&job).await? {
                self.library
                    .update(song_id, |song| {
                        song.video_url = Some(asset.video_url);
                        song.thumbnail_url = Some(asset.thumbnail_url);
                        song.set_progress(SongStatus::Complete, "Song ready");
                    })
                    .await?;
                tracing::info!(song_id = %song_id, "Song generation complete");
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout(format!(
                    "video rendering timed out after {}s",
                    self.video.timeout.as_secs()
                )));
            }

            tokio::select! {
                _ = tokio::time::sleep(self.video.interval) => {}
                _ = self.shutdown.cancelled() => {
                    return Err(Error::Internal(
                        "video rendering interrupted by server shutdown".to_string(),
                    ));
                }
            }
        }
    }

    /// Record a pipeline failure: the status active at the moment of
    /// failure becomes `failedStep` and the song moves to `error`.
    async fn record_failure(&self, song_id: Uuid, err: Error) {
        tracing::error!(song_id = %song_id, error = %err, "Pipeline failed");
        let persisted = self
            .library
            .update(song_id, |song| {
                let failed_step = if song.status.is_terminal() {
                    song.failed_step.unwrap_or(SongStatus::GeneratingLyrics)
                } else {
                    song.status
                };
                song.record_failure(failed_step, err.to_string());
            })
            .await;
        if let Err(persist_err) = persisted {
            tracing::error!(
                song_id = %song_id,
                error = %persist_err,
                "Failed to persist pipeline failure state"
            );
        }
    }
}

fn progress_message(step: SongStatus) -> &'static str {
    match step {
        SongStatus::GeneratingLyrics => "Writing lyrics and song concept",
        SongStatus::GeneratingAudio => "Composing the audio track",
        SongStatus::GeneratingArt => "Painting the cover art",
        SongStatus::GeneratingVideo => "Generating the music video",
        SongStatus::PollingVideo => "Rendering the music video",
        SongStatus::Complete => "Song ready",
        SongStatus::Error => "Song generation failed",
    }
}
