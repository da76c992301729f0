//! Configuration module for rcbot.
//!
//! Handles loading application settings (file plus environment) and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, SummaryPrompts};
pub use settings::{
    BrowserSettings, GeneralSettings, PipelineSettings, PromptSettings, RemoteSettings,
    Settings, SummarySettings, TelegramSettings, TranscriptionSettings,
};
