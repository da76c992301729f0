//! Transcript file rendering.

use super::Transcript;
use chrono::{DateTime, Local};

/// Render the text file published for a transcript: a short header followed
/// by one timestamped line per segment.
pub fn render_transcript_file(
    transcript: &Transcript,
    source_name: &str,
    model_label: &str,
    transcribed_at: DateTime<Local>,
) -> String {
    let mut output = String::new();
    output.push_str(&format!("Source file: {}\n", source_name));
    output.push_str(&format!(
        "Transcribed at: {}\n",
        transcribed_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!("Model: {}\n", model_label));
    if let Some(lang) = &transcript.language {
        output.push_str(&format!("Language: {}\n", lang));
    }
    output.push('\n');
    output.push_str(&transcript.format_with_timestamps());
    output.push('\n');
    output
}
