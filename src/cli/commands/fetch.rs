//! Fetch command - download a link and upload it.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Components;
use crate::pipeline::direct_link::format_size;
use anyhow::Result;

/// Run the direct-link pipeline once.
pub async fn run_fetch(url: &str, raw: bool, settings: Settings) -> Result<()> {
    preflight::check(Operation::Remote, &settings)?;

    let pipeline = Components::from_settings(&settings)?.direct_links(&settings)?;

    let spinner = Output::spinner(&format!("Downloading {}...", url));
    let result = pipeline.run(url, !raw).await;
    spinner.finish_and_clear();

    let report = result?;
    if report.fetched_url != url.trim() {
        Output::kv("Fetched", &report.fetched_url);
    }
    Output::success(&format!(
        "Uploaded {} ({}) to {}",
        report.file_name,
        format_size(report.size_bytes),
        report.remote_dir
    ));
    Ok(())
}
