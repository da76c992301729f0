//! Process command - run one processing job from the terminal.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, TerminalTransport};
use crate::config::Settings;
use crate::orchestrator::Components;
use crate::pipeline::JobOutcome;
use anyhow::Result;
use std::sync::Arc;

/// Fetch, transcribe, summarize and publish `remote_file`.
pub async fn run_process(remote_file: &str, settings: Settings) -> Result<()> {
    preflight::check(Operation::Process, &settings)?;

    let components = Components::from_settings(&settings)?;
    if components.summarizer.is_none() {
        Output::warning("OPENAI_API_KEY not set; the summary will be skipped.");
    }

    let transport = Arc::new(TerminalTransport::new("Starting..."));
    let pipeline = components.pipeline(&settings, transport.clone());
    let report = pipeline.run(0, remote_file).await;
    transport.finish();

    for artifact in &report.published {
        Output::kv(
            &artifact.kind.to_string(),
            &format!("{}/{}", artifact.remote_dir, artifact.file_name),
        );
    }

    match report.outcome {
        JobOutcome::Succeeded => {
            Output::success("Job finished.");
            Ok(())
        }
        JobOutcome::FailedAtStage { stage, reason } => {
            anyhow::bail!("job failed at {}: {}", stage, reason)
        }
    }
}
