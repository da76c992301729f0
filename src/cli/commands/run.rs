//! Run command - start the chat bot.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Start the long-poll loop and run until Ctrl-C.
pub async fn run_bot(settings: Settings) -> Result<()> {
    preflight::check(Operation::Run, &settings)?;

    let remote = settings.remote.name.clone();
    let orchestrator = Orchestrator::new(settings)?;
    Output::success(&format!("rcbot is running against remote '{}'. Press Ctrl-C to stop.", remote));

    orchestrator
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                Output::error(&format!("Failed to listen for Ctrl-C: {}", e));
                std::future::pending::<()>().await;
            }
        })
        .await;

    Output::info("Stopped.");
    Ok(())
}
