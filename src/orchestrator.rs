//! Bot orchestrator for rcbot.
//!
//! Wires configuration into concrete components and runs the single
//! receiving loop: commands are handled inline, button presses go through
//! the [`CallbackDispatcher`], and processing jobs run on their own tasks.

use crate::browser::DirectoryBrowser;
use crate::config::{Prompts, Settings};
use crate::dispatcher::{CallbackDispatcher, Handled};
use crate::error::{truncate_message, Result};
use crate::pipeline::direct_link::format_size;
use crate::pipeline::{Destinations, DirectLinkPipeline, ProcessingPipeline};
use crate::remote::{RcloneClient, RemoteStorage};
use crate::session::TokenStore;
use crate::summary::{OpenAISummarizer, Summarizer};
use crate::transcription::{Transcriber, WhisperCliTranscriber};
use crate::transport::{ChatId, ChatTransport, Inbound, TelegramTransport};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Pause after a failed poll before trying again.
const POLL_BACKOFF: Duration = Duration::from_secs(2);

const HELP_TEXT: &str = "Commands:
/browse [path] - browse remote storage and pick a file to transcribe
/link <url> - download a link (Google Drive and Dropbox share links are rewritten) and upload it
/rawlink <url> - download a link as-is and upload it
/help - show this message";

/// External capabilities built from settings.
pub struct Components {
    pub storage: Arc<dyn RemoteStorage>,
    pub transcriber: Arc<dyn Transcriber>,
    pub summarizer: Option<Arc<dyn Summarizer>>,
}

impl Components {
    /// Build rclone storage, the whisper transcriber and, when an API key is
    /// configured, the summarizer.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        let summarizer = match OpenAISummarizer::from_settings(&settings.summary)? {
            Some(s) => {
                info!("Summaries enabled with {}", s.model());
                Some(Arc::new(s.with_prompts(prompts)) as Arc<dyn Summarizer>)
            }
            None => {
                info!("No OpenAI API key configured; summaries disabled");
                None
            }
        };

        Ok(Self {
            storage: Arc::new(RcloneClient::from_settings(&settings.remote)),
            transcriber: Arc::new(WhisperCliTranscriber::new(settings.transcription.clone())),
            summarizer,
        })
    }

    /// Processing pipeline reporting to `transport`.
    pub fn pipeline(&self, settings: &Settings, transport: Arc<dyn ChatTransport>) -> ProcessingPipeline {
        ProcessingPipeline::new(
            self.storage.clone(),
            transport,
            self.transcriber.clone(),
            self.summarizer.clone(),
            Destinations {
                transcripts: settings.remote.transcripts_dest.clone(),
                summaries: settings.remote.summaries_dest().to_string(),
            },
            settings.workspace_root(),
        )
        .with_stage_timeout(settings.pipeline.stage_timeout())
    }

    pub fn direct_links(&self, settings: &Settings) -> Result<DirectLinkPipeline> {
        DirectLinkPipeline::new(
            self.storage.clone(),
            &settings.remote.videos_dest,
            settings.downloads_dir(),
        )
    }
}

/// The chat bot: one receiving loop over a [`ChatTransport`].
pub struct Orchestrator {
    transport: Arc<dyn ChatTransport>,
    dispatcher: CallbackDispatcher,
    direct_links: DirectLinkPipeline,
    browse_root: String,
}

impl Orchestrator {
    /// Create the bot from settings, talking to Telegram.
    pub fn new(settings: Settings) -> Result<Self> {
        let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::from_settings(&settings.telegram)?);
        let components = Components::from_settings(&settings)?;
        Self::with_components(&settings, components, transport)
    }

    /// Create the bot from prebuilt components.
    pub fn with_components(
        settings: &Settings,
        components: Components,
        transport: Arc<dyn ChatTransport>,
    ) -> Result<Self> {
        std::fs::create_dir_all(settings.temp_dir())?;

        let tokens = Arc::new(TokenStore::new(settings.browser.token_capacity));
        let browser = Arc::new(DirectoryBrowser::new(
            components.storage.clone(),
            tokens.clone(),
            settings.browser.page_size,
        ));
        let pipeline = Arc::new(components.pipeline(settings, transport.clone()));
        let direct_links = components.direct_links(settings)?;

        Ok(Self {
            dispatcher: CallbackDispatcher::new(transport.clone(), tokens, browser, pipeline),
            transport,
            direct_links,
            browse_root: settings.remote.browse_root.clone(),
        })
    }

    /// Receive and handle events until `shutdown` completes.
    ///
    /// Poll failures are logged and retried after a short pause.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        info!("Listening for chat events");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down event loop");
                    break;
                }
                polled = self.transport.poll() => match polled {
                    Ok(events) => {
                        for event in events {
                            self.handle(event).await;
                        }
                    }
                    Err(e) => {
                        warn!("Polling failed: {}", e);
                        tokio::time::sleep(POLL_BACKOFF).await;
                    }
                }
            }
        }
    }

    /// Handle one inbound event. Errors are reported to the chat, never returned.
    pub async fn handle(&self, event: Inbound) {
        match event {
            Inbound::Command { chat_id, name, args } => {
                self.handle_command(chat_id, &name, args.trim()).await;
            }
            Inbound::Callback {
                callback_id,
                chat_id,
                message_id,
                data,
            } => {
                let handled = self
                    .dispatcher
                    .handle_callback(&callback_id, chat_id, message_id, &data)
                    .await;
                if let Handled::Launched(_) = handled {
                    debug!("Job running in background for chat {}", chat_id);
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn handle_command(&self, chat_id: ChatId, name: &str, args: &str) {
        match name {
            "start" | "help" => self.reply(chat_id, HELP_TEXT).await,
            "browse" => {
                let path = if args.is_empty() { self.browse_root.as_str() } else { args };
                self.dispatcher.present(chat_id, None, path, 0).await;
            }
            "link" => self.fetch_link(chat_id, args, true).await,
            "rawlink" => self.fetch_link(chat_id, args, false).await,
            other => {
                self.reply(chat_id, &format!("Unknown command /{}. Send /help for the list.", other))
                    .await
            }
        }
    }

    async fn fetch_link(&self, chat_id: ChatId, url: &str, rewrite: bool) {
        if url.is_empty() {
            let usage = if rewrite { "Usage: /link <url>" } else { "Usage: /rawlink <url>" };
            self.reply(chat_id, usage).await;
            return;
        }

        self.reply(chat_id, "⬇️ Downloading link").await;
        match self.direct_links.run(url, rewrite).await {
            Ok(report) => {
                let text = format!(
                    "✅ Uploaded {} ({}) to {}",
                    report.file_name,
                    format_size(report.size_bytes),
                    report.remote_dir
                );
                self.reply(chat_id, &text).await;
            }
            Err(e) => {
                error!("Direct link failed: {}", e);
                self.reply(chat_id, &format!("❌ Download failed: {}", truncate_message(&e.to_string())))
                    .await;
            }
        }
    }

    async fn reply(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.transport.send_text(chat_id, text).await {
            warn!("Failed to reply to chat {}: {}", chat_id, e);
        }
    }
}
