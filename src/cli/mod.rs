//! CLI module for rcbot.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{Output, TerminalTransport};

use clap::{Parser, Subcommand};

/// rcbot - remote media transcription bot
///
/// Browse an rclone remote from a chat, transcribe and summarize the picked
/// media, and upload files from direct links.
#[derive(Parser, Debug)]
#[command(name = "rcbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "RCBOT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the chat bot
    Run,

    /// Check external tools and configuration
    Doctor,

    /// List one page of a remote directory
    Browse {
        /// Remote path (defaults to the configured browse root)
        path: Option<String>,

        /// Entry offset of the page
        #[arg(short, long, default_value = "0")]
        offset: usize,
    },

    /// Fetch, transcribe, summarize and publish one remote file
    Process {
        /// Remote file path
        remote_file: String,
    },

    /// Download a URL and upload it to the videos folder
    Fetch {
        /// URL to download
        url: String,

        /// Do not rewrite Google Drive or Dropbox share links
        #[arg(long)]
        raw: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (environment overrides applied)
    Show,

    /// Write a default configuration file if none exists
    Init,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_browse_with_offset() {
        let cli = Cli::try_parse_from(["rcbot", "-v", "browse", "media/2024", "--offset", "40"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Browse { path, offset } => {
                assert_eq!(path.as_deref(), Some("media/2024"));
                assert_eq!(offset, 40);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_fetch_raw() {
        let cli = Cli::try_parse_from(["rcbot", "fetch", "https://example.com/a.mp4", "--raw"]).unwrap();
        assert!(matches!(cli.command, Commands::Fetch { raw: true, .. }));
    }
}
