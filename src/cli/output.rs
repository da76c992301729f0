//! CLI output formatting utilities.

use crate::browser::BrowseView;
use crate::error::Result;
use crate::transport::{ChatId, ChatTransport, ChoiceRows, Inbound, MessageId};
use async_trait::async_trait;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicI64, Ordering};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a rendered directory page.
    pub fn browse_view(view: &BrowseView) {
        Output::header(&view.title());
        for item in &view.items {
            let marker = if item.entry.is_directory { "/" } else { "" };
            let modified = item
                .entry
                .modified_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "  {} {}{}  {}",
                style("*").cyan(),
                style(&item.entry.name).bold(),
                marker,
                style(modified).dim()
            );
        }
        if view.next.is_some() {
            let next = view.page_offset.saturating_add(view.page_size);
            println!("\n  {}", style(format!("more: --offset {}", next)).dim());
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Chat transport that prints to the terminal, used to run jobs from the CLI.
///
/// It never receives events.
pub struct TerminalTransport {
    spinner: ProgressBar,
    next_id: AtomicI64,
}

impl TerminalTransport {
    pub fn new(initial: &str) -> Self {
        Self {
            spinner: Output::spinner(initial),
            next_id: AtomicI64::new(1),
        }
    }

    /// Stop the spinner.
    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

#[async_trait]
impl ChatTransport for TerminalTransport {
    async fn poll(&self) -> Result<Vec<Inbound>> {
        Ok(Vec::new())
    }

    async fn send_text(&self, _chat_id: ChatId, text: &str) -> Result<MessageId> {
        self.spinner.println(text);
        self.spinner.set_message(text.lines().next().unwrap_or_default().to_string());
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn send_choices(&self, chat_id: ChatId, text: &str, _rows: &ChoiceRows) -> Result<MessageId> {
        self.send_text(chat_id, text).await
    }

    async fn edit_choices(
        &self,
        chat_id: ChatId,
        _message_id: MessageId,
        text: &str,
        rows: &ChoiceRows,
    ) -> Result<()> {
        self.send_choices(chat_id, text, rows).await.map(|_| ())
    }

    async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> Result<()> {
        Ok(())
    }
}
