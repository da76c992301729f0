//! Local Whisper transcription through a faster-whisper compatible CLI.

use super::{Transcriber, Transcript, TranscriptSegment};
use crate::config::TranscriptionSettings;
use crate::error::{RcbotError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Transcriber that shells out to `whisper-ctranslate2` (or a compatible tool).
pub struct WhisperCliTranscriber {
    settings: TranscriptionSettings,
}

/// JSON written by the CLI with `--output_format json`.
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
}

impl WhisperCliTranscriber {
    pub fn new(settings: TranscriptionSettings) -> Self {
        Self { settings }
    }

    fn build_command(&self, media_path: &Path, output_dir: &Path) -> Command {
        let s = &self.settings;
        let mut cmd = Command::new(&s.command);
        cmd.arg(media_path)
            .arg("--model")
            .arg(&s.model)
            .arg("--device")
            .arg(&s.device)
            .arg("--compute_type")
            .arg(&s.compute_type)
            .arg("--beam_size")
            .arg(s.beam_size.to_string())
            .arg("--vad_filter")
            .arg(if s.vad_filter { "True" } else { "False" })
            .arg("--output_format")
            .arg("json")
            .arg("--output_dir")
            .arg(output_dir);
        if let Some(lang) = s.language.as_deref().filter(|l| !l.is_empty()) {
            cmd.arg("--language").arg(lang);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }

    async fn run_cli(&self, media_path: &Path, output_dir: &Path) -> Result<std::process::Output> {
        match self.build_command(media_path, output_dir).output().await {
            Ok(output) => Ok(output),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RcbotError::CapabilityUnavailable(format!(
                    "{} is not installed",
                    self.settings.command
                )))
            }
            Err(e) => Err(RcbotError::CapabilityFailed(format!(
                "{} execution failed: {e}",
                self.settings.command
            ))),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    #[instrument(skip(self), fields(media = %media_path.display()))]
    async fn transcribe(&self, media_path: &Path) -> Result<Option<Transcript>> {
        let output_dir = tempfile::tempdir()?;

        info!("Transcribing with {} ({})", self.settings.command, self.model_label());
        let output = match self.run_cli(media_path, output_dir.path()).await {
            Ok(o) => o,
            Err(RcbotError::CapabilityUnavailable(reason)) => {
                warn!("{}; skipping transcription", reason);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RcbotError::CapabilityFailed(format!(
                "{} failed: {}",
                self.settings.command,
                stderr.trim()
            )));
        }

        let stem = media_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let json_path = output_dir.path().join(format!("{}.json", stem));
        let content = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            RcbotError::CapabilityFailed(format!(
                "Missing transcription output {}: {e}",
                json_path.display()
            ))
        })?;

        let transcript = parse_output(&content)?;
        debug!("Transcribed {} segments", transcript.as_ref().map_or(0, |t| t.segments.len()));
        Ok(transcript)
    }

    fn model_label(&self) -> String {
        format!(
            "{} ({}/{})",
            self.settings.model,
            self.settings.device,
            self.settings.compute_type
        )
    }
}

/// Parse CLI JSON output. An output with no usable text is `None`.
fn parse_output(content: &str) -> Result<Option<Transcript>> {
    let parsed: WhisperOutput = serde_json::from_str(content)
        .map_err(|e| RcbotError::CapabilityFailed(format!("Invalid transcription output: {e}")))?;

    let segments: Vec<TranscriptSegment> = if parsed.segments.is_empty() {
        vec![TranscriptSegment::new(0.0, 0.0, parsed.text.clone())]
    } else {
        parsed
            .segments
            .into_iter()
            .map(|s| TranscriptSegment::new(s.start, s.end, s.text))
            .collect()
    };

    let transcript = Transcript::new(segments).with_language(parsed.language);
    Ok((!transcript.is_empty()).then_some(transcript))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_segments() {
        let json = r#"{"text": "Hello there. General Kenobi.", "language": "en",
            "segments": [
                {"id": 0, "start": 0.0, "end": 1.5, "text": " Hello there."},
                {"id": 1, "start": 1.5, "end": 3.0, "text": " General Kenobi."}
            ]}"#;

        let transcript = parse_output(json).unwrap().unwrap();
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].text, "Hello there.");
        assert_eq!(transcript.language.as_deref(), Some("en"));
        assert_eq!(transcript.duration_seconds, 3.0);
    }

    #[test]
    fn test_parse_output_empty_is_none() {
        let json = r#"{"text": "", "segments": [{"start": 0, "end": 1, "text": "  "}]}"#;
        assert!(parse_output(json).unwrap().is_none());
    }

    #[test]
    fn test_parse_output_invalid() {
        assert!(matches!(parse_output("not json"), Err(RcbotError::CapabilityFailed(_))));
    }

    #[test]
    fn test_model_label() {
        let transcriber = WhisperCliTranscriber::new(TranscriptionSettings::default());
        assert_eq!(transcriber.model_label(), "base (auto/int8)");
    }

    #[tokio::test]
    async fn test_missing_tool_is_soft_none() {
        let settings = TranscriptionSettings {
            command: "rcbot-no-such-whisper".to_string(),
            ..Default::default()
        };
        let transcriber = WhisperCliTranscriber::new(settings);
        let result = transcriber.transcribe(Path::new("/tmp/none.mp4")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported_unavailable() {
        let settings = TranscriptionSettings {
            command: "rcbot-no-such-whisper".to_string(),
            ..Default::default()
        };
        let transcriber = WhisperCliTranscriber::new(settings);
        let dir = tempfile::tempdir().unwrap();
        let err = transcriber
            .run_cli(Path::new("/tmp/none.mp4"), dir.path())
            .await
            .unwrap_err();
        match err {
            RcbotError::CapabilityUnavailable(reason) => assert!(reason.contains("rcbot-no-such-whisper")),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
