//! Pre-flight checks before starting work.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{RcbotError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// The chat bot needs a bot token and rclone.
    Run,
    /// Browsing and direct links only need rclone.
    Remote,
    /// A processing job needs rclone. Transcription and summaries degrade
    /// gracefully when missing.
    Process,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Run => {
            check_bot_token(settings)?;
            check_tool(&settings.remote.rclone_bin, "version")?;
        }
        Operation::Remote | Operation::Process => {
            check_tool(&settings.remote.rclone_bin, "version")?;
        }
    }
    Ok(())
}

/// Check that a Telegram bot token is configured.
fn check_bot_token(settings: &Settings) -> Result<()> {
    match settings.telegram.bot_token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => Ok(()),
        _ => Err(RcbotError::Config(
            "BOT_TOKEN not set. Set it with: export BOT_TOKEN='123456:ABC...' or telegram.bot_token in the config file"
                .to_string(),
        )),
    }
}

/// Check if an external tool is available.
pub fn check_tool(name: &str, version_arg: &str) -> Result<()> {
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(RcbotError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(RcbotError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(RcbotError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
