//! rcbot - a chat bot for transcribing media kept on an rclone remote
//!
//! Users browse a remote storage tree from a chat, pick a media file and get
//! a transcript and summary uploaded next to their other notes. Direct links
//! can be downloaded and uploaded to the remote in one step.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `remote` - Remote storage abstraction (rclone)
//! - `session` - Token store mapping callback ids to intents
//! - `browser` - Paginated directory views
//! - `dispatcher` - Button press routing
//! - `transcription` - Speech-to-text transcription
//! - `summary` - Transcript summarization
//! - `pipeline` - Processing and direct-link jobs
//! - `transport` - Chat transport abstraction (Telegram)
//! - `orchestrator` - Component wiring and the event loop
//!
//! # Example
//!
//! ```rust,no_run
//! use rcbot::config::Settings;
//! use rcbot::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let bot = Orchestrator::new(settings)?;
//!
//!     bot.run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//!
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod pipeline;
pub mod remote;
pub mod session;
pub mod summary;
pub mod transcription;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::{RcbotError, Result};
