//! Telegram Bot API transport.
//!
//! Long-polls `getUpdates` and maps messages and inline keyboard presses to
//! [`Inbound`] events. Outbound messages use `sendMessage`,
//! `editMessageText` and `answerCallbackQuery`.

use super::{parse_command, ChatId, ChatTransport, ChoiceRows, Inbound, MessageId};
use crate::config::TelegramSettings;
use crate::error::{RcbotError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Telegram Bot API client.
pub struct TelegramTransport {
    base_url: String,
    poll_timeout: u64,
    allowed_chats: Vec<ChatId>,
    client: reqwest::Client,
    /// Highest update id seen so far.
    offset: Mutex<Option<i64>>,
}

/// Response envelope from the Telegram API.
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    data: Option<String>,
}

impl TelegramTransport {
    /// Create a new client against `api_base` (normally `https://api.telegram.org`).
    pub fn new(api_base: &str, bot_token: &str, poll_timeout: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout + 30))
            .build()?;

        Ok(Self {
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token),
            poll_timeout,
            allowed_chats: Vec::new(),
            client,
            offset: Mutex::new(None),
        })
    }

    pub fn from_settings(settings: &TelegramSettings) -> Result<Self> {
        let token = settings
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RcbotError::Config("BOT_TOKEN is not set".to_string()))?;

        Ok(Self::new(&settings.api_base, token, settings.poll_timeout_seconds)?
            .with_allowed_chats(settings.allowed_chat_ids.clone()))
    }

    /// Only accept events from these chats. An empty list accepts every chat.
    pub fn with_allowed_chats(mut self, chats: Vec<ChatId>) -> Self {
        self.allowed_chats = chats;
        self
    }

    /// Build API URL.
    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, method: &str, payload: Value) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&payload)
            .send()
            .await?;

        let result: TelegramResponse<T> = response.json().await?;
        if !result.ok {
            return Err(RcbotError::Transport(format!(
                "{} failed: {}",
                method,
                result.description.unwrap_or_default()
            )));
        }
        result
            .result
            .ok_or_else(|| RcbotError::Transport(format!("{} returned no result", method)))
    }

    fn is_allowed(&self, chat_id: ChatId) -> bool {
        self.allowed_chats.is_empty() || self.allowed_chats.contains(&chat_id)
    }

    fn to_inbound(&self, update: Update) -> Option<Inbound> {
        if let Some(cb) = update.callback_query {
            let message = cb.message?;
            return Some(Inbound::Callback {
                callback_id: cb.id,
                chat_id: message.chat.id,
                message_id: Some(message.message_id),
                data: cb.data.unwrap_or_default(),
            });
        }

        let message = update.message?;
        let (name, args) = parse_command(message.text.as_deref()?)?;
        Some(Inbound::Command {
            chat_id: message.chat.id,
            name,
            args,
        })
    }
}

fn keyboard(rows: &ChoiceRows) -> Value {
    let rows: Vec<Vec<Value>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| json!({ "text": c.label, "callback_data": c.callback }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn poll(&self) -> Result<Vec<Inbound>> {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        let mut payload = json!({
            "timeout": self.poll_timeout,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(last) = offset {
            payload["offset"] = json!(last + 1);
        }

        let updates: Vec<Update> = self.call("getUpdates", payload).await?;
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            *self.offset.lock().unwrap_or_else(|e| e.into_inner()) = Some(last);
        }

        let mut events = Vec::with_capacity(updates.len());
        for update in updates {
            if let Some(cb) = update.callback_query.as_ref().filter(|cb| cb.message.is_none()) {
                // Inline-mode callbacks carry no message; acknowledge only.
                debug!("Acknowledging callback {} without a message", cb.id);
                if let Err(e) = self.answer_callback(&cb.id, None).await {
                    warn!("Failed to answer callback {}: {}", cb.id, e);
                }
                continue;
            }
            let Some(event) = self.to_inbound(update) else { continue };
            if !self.is_allowed(event.chat_id()) {
                warn!("Ignoring event from chat {}", event.chat_id());
                continue;
            }
            events.push(event);
        }
        debug!("Received {} events", events.len());
        Ok(events)
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageId> {
        let message: Message = self
            .call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(message.message_id)
    }

    async fn send_choices(&self, chat_id: ChatId, text: &str, rows: &ChoiceRows) -> Result<MessageId> {
        let message: Message = self
            .call(
                "sendMessage",
                json!({ "chat_id": chat_id, "text": text, "reply_markup": keyboard(rows) }),
            )
            .await?;
        Ok(message.message_id)
    }

    async fn edit_choices(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        rows: &ChoiceRows,
    ) -> Result<()> {
        // editMessageText answers with the edited Message (or `true` for inline messages)
        let _: Value = self
            .call(
                "editMessageText",
                json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                    "text": text,
                    "reply_markup": keyboard(rows),
                }),
            )
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut payload = json!({ "callback_query_id": callback_id });
        if let Some(t) = text {
            payload["text"] = json!(t);
        }
        let _: Value = self.call("answerCallbackQuery", payload).await?;
        Ok(())
    }
}
