//! Background processing jobs.
//!
//! A job fetches one remote media file into a private workspace, transcribes
//! it, summarizes the transcript and publishes the resulting text files back
//! to remote storage. The workspace is removed when the job ends, whatever
//! the outcome.

pub mod direct_link;

pub use direct_link::{DirectLinkPipeline, DirectLinkReport};

use crate::error::{truncate_message, RcbotError, Result};
use crate::remote::{self, RemoteStorage};
use crate::summary::{render_summary_file, Summarizer};
use crate::transcription::{render_transcript_file, Transcriber, Transcript};
use crate::transport::{ChatId, ChatTransport};
use chrono::Local;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// One step of a processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Transcribe,
    Summarize,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Transcribe => "transcribe",
            Stage::Summarize => "summarize",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Final state of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded,
    FailedAtStage { stage: Stage, reason: String },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Transcript,
    Summary,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Transcript => f.write_str("transcript"),
            ArtifactKind::Summary => f.write_str("summary"),
        }
    }
}

/// A text file uploaded by a job.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedArtifact {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub remote_dir: String,
}

/// What a finished job did.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub remote_path: String,
    /// Workspace used by the job. It no longer exists once the report is returned.
    pub workspace: Option<PathBuf>,
    pub outcome: JobOutcome,
    pub published: Vec<PublishedArtifact>,
    /// Per-artifact upload failures.
    pub publish_failures: Vec<String>,
    /// Optional steps that were skipped and why.
    pub notes: Vec<String>,
}

impl JobReport {
    fn new(remote_path: &str) -> Self {
        Self {
            remote_path: remote_path.to_string(),
            workspace: None,
            outcome: JobOutcome::Succeeded,
            published: Vec::new(),
            publish_failures: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Status message sent to the conversation when the job ends.
    pub fn status_message(&self) -> String {
        let name = remote::file_name(&self.remote_path);
        match &self.outcome {
            JobOutcome::FailedAtStage { stage, reason } => {
                format!("❌ {} failed at {}: {}", name, stage, truncate_message(reason))
            }
            JobOutcome::Succeeded => {
                let mut lines = vec![format!("✅ Done: {}", name)];
                for artifact in &self.published {
                    lines.push(format!(
                        "📄 {} uploaded to {}/{}",
                        artifact.kind, artifact.remote_dir, artifact.file_name
                    ));
                }
                for note in &self.notes {
                    lines.push(format!("ℹ️ {}", truncate_message(note)));
                }
                for failure in &self.publish_failures {
                    lines.push(format!("⚠️ {}", truncate_message(failure)));
                }
                lines.join("\n")
            }
        }
    }
}

/// Remote folders artifacts are published to.
#[derive(Debug, Clone)]
pub struct Destinations {
    pub transcripts: String,
    pub summaries: String,
}

/// A stage that could not complete.
#[derive(Debug)]
struct StageFailure {
    stage: Stage,
    reason: String,
}

impl StageFailure {
    fn new(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// Runs processing jobs. Cheap to share between tasks behind an `Arc`.
pub struct ProcessingPipeline {
    storage: Arc<dyn RemoteStorage>,
    transport: Arc<dyn ChatTransport>,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Option<Arc<dyn Summarizer>>,
    destinations: Destinations,
    workspace_root: PathBuf,
    stage_timeout: Option<Duration>,
}

impl ProcessingPipeline {
    pub fn new(
        storage: Arc<dyn RemoteStorage>,
        transport: Arc<dyn ChatTransport>,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Option<Arc<dyn Summarizer>>,
        destinations: Destinations,
        workspace_root: PathBuf,
    ) -> Self {
        Self {
            storage,
            transport,
            transcriber,
            summarizer,
            destinations,
            workspace_root,
            stage_timeout: None,
        }
    }

    /// Bound every stage by `timeout`. `None` lets stages run until they return.
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Run one job to completion and report the outcome to `chat_id`.
    #[instrument(skip(self))]
    pub async fn run(&self, chat_id: ChatId, remote_path: &str) -> JobReport {
        let mut report = JobReport::new(remote_path);
        let name = remote::file_name(remote_path).to_string();
        self.notify(chat_id, &format!("⏳ Processing {}", name)).await;

        match self.create_workspace() {
            Ok(workspace) => {
                report.workspace = Some(workspace.path().to_path_buf());
                let result = self.execute(chat_id, remote_path, workspace.path(), &mut report).await;
                if let Err(failure) = result {
                    report.outcome = JobOutcome::FailedAtStage {
                        stage: failure.stage,
                        reason: failure.reason,
                    };
                }
                let path = workspace.path().to_path_buf();
                if let Err(e) = workspace.close() {
                    warn!("Failed to remove workspace {}: {}", path.display(), e);
                }
            }
            Err(e) => {
                report.outcome = JobOutcome::FailedAtStage {
                    stage: Stage::Fetch,
                    reason: format!("could not create workspace: {}", e),
                };
            }
        }

        match &report.outcome {
            JobOutcome::Succeeded => info!("Job for {} succeeded", remote_path),
            JobOutcome::FailedAtStage { stage, reason } => {
                error!("Job for {} failed at {}: {}", remote_path, stage, reason)
            }
        }
        self.notify(chat_id, &report.status_message()).await;
        report
    }

    fn create_workspace(&self) -> Result<tempfile::TempDir> {
        std::fs::create_dir_all(&self.workspace_root)?;
        let dir = tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(&self.workspace_root)?;
        Ok(dir)
    }

    async fn execute(
        &self,
        chat_id: ChatId,
        remote_path: &str,
        workspace: &Path,
        report: &mut JobReport,
    ) -> std::result::Result<(), StageFailure> {
        // Fetch
        self.notify(chat_id, "📥 Downloading from remote storage").await;
        let local = self
            .timed(Stage::Fetch, self.storage.copy_in(remote_path, workspace))
            .await?
            .map_err(|e| StageFailure::new(Stage::Fetch, e.to_string()))?;
        info!("Fetched {} to {}", remote_path, local.display());

        // Transcribe
        self.notify(chat_id, "🎙 Transcribing").await;
        let transcript = match self
            .timed(Stage::Transcribe, self.transcriber.transcribe(&local))
            .await?
        {
            Ok(Some(transcript)) => Some(transcript),
            Ok(None) => {
                report.notes.push("No transcript produced; summary skipped".to_string());
                None
            }
            Err(e) => {
                warn!("Transcription failed: {}", e);
                report.notes.push(format!("Transcription failed ({}); summary skipped", e));
                None
            }
        };

        let Some(transcript) = transcript else {
            return Ok(());
        };

        // Summarize
        let summary = match &self.summarizer {
            Some(summarizer) => {
                self.notify(chat_id, "📝 Summarizing").await;
                match self
                    .timed(Stage::Summarize, summarizer.summarize(&transcript.full_text))
                    .await?
                {
                    Ok(Some(summary)) => Some(summary),
                    Ok(None) => {
                        report.notes.push("Summary was empty".to_string());
                        None
                    }
                    Err(e) => {
                        warn!("Summarization failed: {}", e);
                        report.notes.push(format!("Summary skipped ({})", e));
                        None
                    }
                }
            }
            None => {
                report.notes.push("Summary skipped (no API key configured)".to_string());
                None
            }
        };

        // Publish
        self.notify(chat_id, "📤 Uploading results").await;
        let source_name = remote::file_name(remote_path);
        let stem = file_stem(source_name);
        let mut artifacts = vec![(
            ArtifactKind::Transcript,
            format!("{}.txt", stem),
            self.transcript_text(&transcript, source_name),
            self.destinations.transcripts.clone(),
        )];
        if let Some(summary) = &summary {
            artifacts.push((
                ArtifactKind::Summary,
                format!("{}_summary.txt", stem),
                render_summary_file(summary, source_name, Local::now()),
                self.destinations.summaries.clone(),
            ));
        }

        for (kind, file_name, contents, remote_dir) in artifacts {
            let local_file = workspace.join(&file_name);
            let result = match tokio::fs::write(&local_file, contents).await {
                Ok(()) => {
                    self.timed(Stage::Publish, self.storage.copy_out(&local_file, &remote_dir))
                        .await?
                }
                Err(e) => Err(RcbotError::from(e)),
            };
            match result {
                Ok(()) => {
                    info!("Published {} to {}", file_name, remote_dir);
                    report.published.push(PublishedArtifact {
                        kind,
                        file_name,
                        remote_dir,
                    });
                }
                Err(e) => {
                    warn!("Failed to publish {}: {}", file_name, e);
                    report
                        .publish_failures
                        .push(format!("{} upload failed: {}", kind, e));
                }
            }
        }

        if report.published.is_empty() && !report.publish_failures.is_empty() {
            return Err(StageFailure::new(
                Stage::Publish,
                report.publish_failures.join("; "),
            ));
        }
        Ok(())
    }

    fn transcript_text(&self, transcript: &Transcript, source_name: &str) -> String {
        render_transcript_file(
            transcript,
            source_name,
            &self.transcriber.model_label(),
            Local::now(),
        )
    }

    /// Await `fut`, failing the stage if it outlives the stage timeout.
    async fn timed<T>(
        &self,
        stage: Stage,
        fut: impl Future<Output = Result<T>>,
    ) -> std::result::Result<Result<T>, StageFailure> {
        match self.stage_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                StageFailure::new(stage, RcbotError::Timeout(limit.as_secs()).to_string())
            }),
            None => Ok(fut.await),
        }
    }

    async fn notify(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.transport.send_text(chat_id, text).await {
            warn!("Failed to send status to chat {}: {}", chat_id, e);
        }
    }
}

/// File name without its final extension.
fn file_stem(name: &str) -> String {
    match Path::new(name).file_stem() {
        Some(stem) if !stem.is_empty() => stem.to_string_lossy().to_string(),
        _ => "media".to_string(),
    }
}
