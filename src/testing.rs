//! In-memory fakes shared by unit tests.

use crate::error::{RcbotError, Result};
use crate::remote::{self, DirectoryEntry, RemoteStorage};
use crate::summary::{Summarizer, Summary};
use crate::transcription::{Transcriber, Transcript, TranscriptSegment};
use crate::transport::{ChatId, ChatTransport, ChoiceRows, Inbound, MessageId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A file that reached the fake remote through `copy_out`.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub remote_dir: String,
    pub file_name: String,
    pub contents: String,
}

/// Remote storage held in memory.
#[derive(Default)]
pub struct FakeStorage {
    listings: Mutex<HashMap<String, Vec<DirectoryEntry>>>,
    list_error: Mutex<Option<RcbotError>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    copy_in_error: Mutex<Option<String>>,
    copy_in_delay: Mutex<Option<Duration>>,
    copy_out_failures: Mutex<Vec<String>>,
    fetch_dirs: Mutex<Vec<PathBuf>>,
    uploads: Mutex<Vec<Upload>>,
    list_calls: AtomicUsize,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listing(&self, path: &str, entries: Vec<DirectoryEntry>) {
        self.listings.lock().unwrap().insert(remote::normalize(path), entries);
    }

    /// Fail the next `list` call with `err`.
    pub fn fail_list(&self, err: RcbotError) {
        *self.list_error.lock().unwrap() = Some(err);
    }

    pub fn add_file(&self, path: &str, contents: &[u8]) {
        self.files.lock().unwrap().insert(remote::normalize(path), contents.to_vec());
    }

    /// Fail every `copy_in` with a transfer error.
    pub fn fail_copy_in(&self, reason: &str) {
        *self.copy_in_error.lock().unwrap() = Some(reason.to_string());
    }

    pub fn delay_copy_in(&self, delay: Duration) {
        *self.copy_in_delay.lock().unwrap() = Some(delay);
    }

    /// Fail `copy_out` for local files whose name contains `pattern`.
    pub fn fail_copy_out_matching(&self, pattern: &str) {
        self.copy_out_failures.lock().unwrap().push(pattern.to_string());
    }

    /// Local directories files were fetched into.
    pub fn fetch_dirs(&self) -> Vec<PathBuf> {
        self.fetch_dirs.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStorage for FakeStorage {
    async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_error.lock().unwrap().take() {
            return Err(err);
        }
        let path = remote::normalize(path);
        self.listings
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .ok_or(RcbotError::InvalidPath(path))
    }

    async fn copy_in(&self, remote_path: &str, local_dir: &Path) -> Result<PathBuf> {
        let delay = *self.copy_in_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.fetch_dirs.lock().unwrap().push(local_dir.to_path_buf());

        if let Some(reason) = self.copy_in_error.lock().unwrap().clone() {
            return Err(RcbotError::TransferFailed(reason));
        }

        let path = remote::normalize(remote_path);
        let contents = self
            .files
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .ok_or_else(|| RcbotError::NotFound(path.clone()))?;

        let local = local_dir.join(remote::file_name(&path));
        tokio::fs::write(&local, contents).await?;
        Ok(local)
    }

    async fn copy_out(&self, local_file: &Path, remote_dir: &str) -> Result<()> {
        let file_name = local_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let failing = self
            .copy_out_failures
            .lock()
            .unwrap()
            .iter()
            .any(|p| file_name.contains(p.as_str()));
        if failing {
            return Err(RcbotError::TransferFailed(format!("upload of {} rejected", file_name)));
        }

        let contents = tokio::fs::read_to_string(local_file).await.unwrap_or_default();
        self.uploads.lock().unwrap().push(Upload {
            remote_dir: remote::normalize(remote_dir),
            file_name,
            contents,
        });
        Ok(())
    }
}

/// Everything a [`RecordingTransport`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat_id: ChatId,
        text: String,
    },
    Choices {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        rows: ChoiceRows,
    },
    Edit {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        rows: ChoiceRows,
    },
    Answer {
        callback_id: String,
        text: Option<String>,
    },
}

/// Chat transport that records outbound calls and replays queued inbound batches.
#[derive(Default)]
pub struct RecordingTransport {
    inbound: Mutex<VecDeque<Result<Vec<Inbound>>>>,
    sent: Mutex<Vec<Sent>>,
    next_message_id: AtomicI64,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&self, batch: Vec<Inbound>) {
        self.inbound.lock().unwrap().push_back(Ok(batch));
    }

    pub fn push_poll_error(&self, err: RcbotError) {
        self.inbound.lock().unwrap().push_back(Err(err));
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts of plain messages, in order.
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn poll(&self) -> Result<Vec<Inbound>> {
        let next = self.inbound.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageId> {
        self.record(Sent::Text {
            chat_id,
            text: text.to_string(),
        });
        Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn send_choices(&self, chat_id: ChatId, text: &str, rows: &ChoiceRows) -> Result<MessageId> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(Sent::Choices {
            chat_id,
            message_id,
            text: text.to_string(),
            rows: rows.clone(),
        });
        Ok(message_id)
    }

    async fn edit_choices(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        rows: &ChoiceRows,
    ) -> Result<()> {
        self.record(Sent::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            rows: rows.clone(),
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.record(Sent::Answer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }
}

enum StubBehavior {
    Text(String),
    Nothing,
    Fail(String),
}

/// Transcriber returning a fixed result.
pub struct StubTranscriber {
    behavior: StubBehavior,
    delay: Option<Duration>,
}

impl StubTranscriber {
    pub fn text(text: &str) -> Self {
        Self {
            behavior: StubBehavior::Text(text.to_string()),
            delay: None,
        }
    }

    pub fn nothing() -> Self {
        Self {
            behavior: StubBehavior::Nothing,
            delay: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            behavior: StubBehavior::Fail(reason.to_string()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _media_path: &Path) -> Result<Option<Transcript>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            StubBehavior::Text(text) => Ok(Some(Transcript::new(vec![TranscriptSegment::new(
                0.0,
                4.0,
                text.clone(),
            )]))),
            StubBehavior::Nothing => Ok(None),
            StubBehavior::Fail(reason) => Err(RcbotError::CapabilityFailed(reason.clone())),
        }
    }

    fn model_label(&self) -> String {
        "stub".to_string()
    }
}

/// Summarizer returning a fixed result and counting calls.
pub struct StubSummarizer {
    behavior: StubBehavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubSummarizer {
    pub fn text(text: &str) -> Self {
        Self {
            behavior: StubBehavior::Text(text.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            behavior: StubBehavior::Fail(reason.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<Option<Summary>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            StubBehavior::Text(text) => Ok(Some(Summary {
                content: text.clone(),
                model: "stub-model".to_string(),
                truncated: false,
                input_chars: transcript.chars().count(),
            })),
            StubBehavior::Nothing => Ok(None),
            StubBehavior::Fail(reason) => Err(RcbotError::CapabilityFailed(reason.clone())),
        }
    }
}
