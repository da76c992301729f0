//! Chat transport abstraction.
//!
//! The bot only needs a handful of operations from a chat service: receive
//! commands and button callbacks, send text, send or edit a message carrying
//! buttons, and acknowledge a callback.

mod telegram;

pub use telegram::TelegramTransport;

use crate::error::Result;
use async_trait::async_trait;

pub type ChatId = i64;
pub type MessageId = i64;

/// One button: a label and the opaque callback reference sent back when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub callback: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, callback: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback: callback.into(),
        }
    }
}

/// Rows of buttons, rendered top to bottom.
pub type ChoiceRows = Vec<Vec<Choice>>;

/// Inbound event from the chat service.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A `/command arg...` message.
    Command {
        chat_id: ChatId,
        name: String,
        args: String,
    },
    /// A button press.
    Callback {
        callback_id: String,
        chat_id: ChatId,
        message_id: Option<MessageId>,
        data: String,
    },
}

impl Inbound {
    pub fn chat_id(&self) -> ChatId {
        match self {
            Inbound::Command { chat_id, .. } | Inbound::Callback { chat_id, .. } => *chat_id,
        }
    }
}

/// Trait for chat services.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Wait for the next batch of inbound events (may be empty).
    async fn poll(&self) -> Result<Vec<Inbound>>;

    /// Send a plain text message.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageId>;

    /// Send a message with buttons.
    async fn send_choices(&self, chat_id: ChatId, text: &str, rows: &ChoiceRows) -> Result<MessageId>;

    /// Replace an existing message's text and buttons in place.
    async fn edit_choices(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        rows: &ChoiceRows,
    ) -> Result<()>;

    /// Acknowledge a button press, optionally with a short notice.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

/// Split `/name@bot args` into a lowercase command name and its argument text.
pub fn parse_command(text: &str) -> Option<(String, String)> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some((name, args.to_string()))
}
