//! External provider clients and the generation pipeline

pub mod audio;
pub mod lyrics;
pub mod media;
pub mod pipeline;
pub mod retry;

use std::sync::Arc;

pub use audio::{AudioGenerator, HttpAudioGenerator, PlaceholderAudioGenerator};
pub use lyrics::{HttpLyricsGenerator, LyricsGenerator};
pub use media::{HttpMediaGenerator, MediaGenerator};
pub use pipeline::{PipelineRunner, VideoPolling};

/// The three generation capabilities the pipeline chains together
#[derive(Clone)]
pub struct Providers {
    pub lyrics: Arc<dyn LyricsGenerator>,
    pub audio: Arc<dyn AudioGenerator>,
    pub media: Arc<dyn MediaGenerator>,
}
