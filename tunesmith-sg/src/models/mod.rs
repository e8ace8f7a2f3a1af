//! Data models for the song generation service

pub mod song;

pub use song::{AdvancedOptions, Song, SongStatus, VocalGender};
