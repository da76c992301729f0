//! Transcription module for rcbot.
//!
//! Speech-to-text is an external capability. The pipeline only depends on the
//! [`Transcriber`] trait; the default implementation drives a local
//! faster-whisper command line tool.

mod format;
mod models;
mod whisper;

pub use format::render_transcript_file;
pub use models::{format_timestamp, Transcript, TranscriptSegment};
pub use whisper::WhisperCliTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a media file.
    ///
    /// `Ok(None)` means no transcript is available: the capability is not
    /// installed or the media produced no speech.
    async fn transcribe(&self, media_path: &Path) -> Result<Option<Transcript>>;

    /// Human-readable model description for transcript headers.
    fn model_label(&self) -> String;
}
