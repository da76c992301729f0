//! Error types for rcbot.

use thiserror::Error;

/// Maximum number of characters of failure text shown in a conversation.
pub const MAX_MESSAGE_CHARS: usize = 400;

/// Library-level error type for rcbot operations.
#[derive(Error, Debug)]
pub enum RcbotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote storage unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Invalid remote path: {0}")]
    InvalidPath(String),

    #[error("Remote listing could not be parsed: {0}")]
    ProtocolError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Capability failed: {0}")]
    CapabilityFailed(String),

    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Unknown or expired token: {0}")]
    TokenNotFound(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("Chat transport error: {0}")]
    Transport(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for rcbot operations.
pub type Result<T> = std::result::Result<T, RcbotError>;

/// Clamp text to [`MAX_MESSAGE_CHARS`] characters for display.
pub fn truncate_message(text: &str) -> String {
    truncate_chars(text, MAX_MESSAGE_CHARS)
}

/// Clamp text to `max_chars` characters, appending an ellipsis when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_chars("  hello ", 10), "hello");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "전사 작업 중 오류가 발생했습니다";
        let cut = truncate_chars(text, 4);
        assert_eq!(cut, "전사 작…");
    }

    #[test]
    fn test_truncate_message_bound() {
        let long = "x".repeat(MAX_MESSAGE_CHARS * 2);
        let cut = truncate_message(&long);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_CHARS + 1);
    }
}
