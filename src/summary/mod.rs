//! Transcript summarization.
//!
//! Like transcription, summarization is an external capability behind a
//! trait. No summarizer is constructed when no API credential is configured.

mod openai;

pub use openai::OpenAISummarizer;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};

/// A generated summary.
#[derive(Debug, Clone)]
pub struct Summary {
    pub content: String,
    /// Model that produced the summary.
    pub model: String,
    /// Whether the transcript was cut before being sent.
    pub truncated: bool,
    /// Characters of transcript sent to the model.
    pub input_chars: usize,
}

/// Trait for summarization services.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize transcript text. `Ok(None)` means the model returned nothing.
    async fn summarize(&self, transcript: &str) -> Result<Option<Summary>>;
}

/// Cut `text` to at most `max_chars` characters. Returns the text and whether it was cut.
pub fn truncate_input(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

/// Render the text file published for a summary.
pub fn render_summary_file(summary: &Summary, source_name: &str, generated_at: DateTime<Local>) -> String {
    let mut output = String::new();
    output.push_str(summary.content.trim());
    output.push_str("\n\n---\n");
    output.push_str(&format!("Source file: {}\n", source_name));
    output.push_str(&format!(
        "Generated at: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!("Model: {}\n", summary.model));
    if summary.truncated {
        output.push_str(&format!(
            "Note: transcript truncated to {} characters before summarizing\n",
            summary.input_chars
        ));
    }
    output
}
