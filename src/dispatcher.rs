//! Callback dispatcher.
//!
//! A button press carries only a token id. The dispatcher resolves it once
//! into a [`Dispatch`] and acts on that: re-render the browser in place, or
//! start a processing job in the background.

use crate::browser::DirectoryBrowser;
use crate::error::{truncate_message, Result};
use crate::pipeline::{JobReport, ProcessingPipeline};
use crate::session::{Intent, TokenStore};
use crate::transport::{ChatId, ChatTransport, MessageId};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// What a callback asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Navigate { path: String },
    Paginate { path: String, offset: usize },
    Launch { path: String },
    Unknown,
}

impl Dispatch {
    /// Resolve callback data against the token store.
    pub fn resolve(tokens: &TokenStore, data: &str) -> Self {
        match tokens.resolve(data) {
            Ok(Intent::Navigate { path }) => Dispatch::Navigate { path },
            Ok(Intent::Paginate { path, offset }) => Dispatch::Paginate { path, offset },
            Ok(Intent::Process { path }) => Dispatch::Launch { path },
            Err(e) => {
                debug!("{}", e);
                Dispatch::Unknown
            }
        }
    }
}

/// What handling a callback did.
#[derive(Debug)]
pub enum Handled {
    /// A view was rendered.
    Rendered,
    /// The listing failed and an error notice was sent.
    RenderFailed,
    /// A job was started.
    Launched(JoinHandle<JobReport>),
    /// The token was unknown; nothing changed.
    Ignored,
}

/// Routes callbacks to the browser or the processing pipeline.
pub struct CallbackDispatcher {
    transport: Arc<dyn ChatTransport>,
    tokens: Arc<TokenStore>,
    browser: Arc<DirectoryBrowser>,
    pipeline: Arc<ProcessingPipeline>,
}

impl CallbackDispatcher {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        tokens: Arc<TokenStore>,
        browser: Arc<DirectoryBrowser>,
        pipeline: Arc<ProcessingPipeline>,
    ) -> Self {
        Self {
            transport,
            tokens,
            browser,
            pipeline,
        }
    }

    /// Handle one button press. The callback is always acknowledged first.
    #[instrument(skip(self, callback_id))]
    pub async fn handle_callback(
        &self,
        callback_id: &str,
        chat_id: ChatId,
        message_id: Option<MessageId>,
        data: &str,
    ) -> Handled {
        let dispatch = Dispatch::resolve(&self.tokens, data);
        debug!("Resolved callback to {:?}", dispatch);

        let notice = match &dispatch {
            Dispatch::Launch { .. } => Some("Starting job"),
            _ => None,
        };
        if let Err(e) = self.transport.answer_callback(callback_id, notice).await {
            warn!("Failed to acknowledge callback: {}", e);
        }

        match dispatch {
            Dispatch::Navigate { path } => self.present(chat_id, message_id, &path, 0).await,
            Dispatch::Paginate { path, offset } => self.present(chat_id, message_id, &path, offset).await,
            Dispatch::Launch { path } => {
                info!("Launching job for {}", path);
                let pipeline = self.pipeline.clone();
                Handled::Launched(tokio::spawn(async move { pipeline.run(chat_id, &path).await }))
            }
            Dispatch::Unknown => {
                info!("Ignoring unknown or expired token");
                Handled::Ignored
            }
        }
    }

    /// Render `path` at `offset`, replacing `message_id` when given and
    /// sending a new message otherwise. Listing errors are reported as a
    /// separate notice so the previous view stays usable.
    pub async fn present(
        &self,
        chat_id: ChatId,
        message_id: Option<MessageId>,
        path: &str,
        offset: usize,
    ) -> Handled {
        let view = match self.browser.render(path, offset).await {
            Ok(view) => view,
            Err(e) => {
                warn!("Failed to list {}: {}", path, e);
                let text = format!("⚠️ Could not open /{}: {}", path.trim_matches('/'), e);
                self.send_notice(chat_id, &text).await;
                return Handled::RenderFailed;
            }
        };

        let result: Result<()> = match message_id {
            Some(message_id) => {
                self.transport
                    .edit_choices(chat_id, message_id, &view.title(), &view.rows())
                    .await
            }
            None => self
                .transport
                .send_choices(chat_id, &view.title(), &view.rows())
                .await
                .map(|_| ()),
        };
        if let Err(e) = result {
            warn!("Failed to deliver view: {}", e);
        }
        Handled::Rendered
    }

    async fn send_notice(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.transport.send_text(chat_id, &truncate_message(text)).await {
            warn!("Failed to send notice: {}", e);
        }
    }
}
