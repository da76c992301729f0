//! Configuration settings for rcbot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub remote: RemoteSettings,
    pub browser: BrowserSettings,
    pub transcription: TranscriptionSettings,
    pub summary: SummarySettings,
    pub telegram: TelegramSettings,
    pub pipeline: PipelineSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory under which job workspaces and link downloads are created.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/rcbot".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Remote storage (rclone) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// rclone executable.
    pub rclone_bin: String,
    /// Name of the configured rclone remote (without the trailing colon).
    pub name: String,
    /// Folder opened by `/browse` without an argument. Empty means the remote root.
    pub browse_root: String,
    /// Destination folder for direct-link downloads.
    pub videos_dest: String,
    /// Destination folder for transcripts.
    pub transcripts_dest: String,
    /// Destination folder for summaries. Falls back to `transcripts_dest`.
    pub summaries_dest: Option<String>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            rclone_bin: "rclone".to_string(),
            name: "gdrive".to_string(),
            browse_root: String::new(),
            videos_dest: "rcbot/videos".to_string(),
            transcripts_dest: "rcbot/transcripts".to_string(),
            summaries_dest: None,
        }
    }
}

impl RemoteSettings {
    /// Destination folder for summary artifacts.
    pub fn summaries_dest(&self) -> &str {
        self.summaries_dest
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.transcripts_dest)
    }
}

/// Directory browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Entries per page.
    pub page_size: usize,
    /// Maximum number of live navigation tokens before the oldest are evicted.
    pub token_capacity: usize,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            token_capacity: 10_000,
        }
    }
}

/// External transcription tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// faster-whisper compatible command line tool.
    pub command: String,
    /// Model name (tiny, base, small, medium, large-v3, ...).
    pub model: String,
    /// Device (auto, cpu, cuda).
    pub device: String,
    /// Compute precision (int8, float16, ...).
    pub compute_type: String,
    pub beam_size: u32,
    pub vad_filter: bool,
    /// Language hint. None lets the model detect it.
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            command: "whisper-ctranslate2".to_string(),
            model: "base".to_string(),
            device: "auto".to_string(),
            compute_type: "int8".to_string(),
            beam_size: 5,
            vad_filter: true,
            language: None,
        }
    }
}

/// Summarization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    /// API credential. Summaries are skipped when absent.
    pub api_key: Option<String>,
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// Chat model used for summaries.
    pub model: String,
    /// Transcript characters sent to the model.
    pub max_chars: usize,
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_chars: 12_000,
            temperature: 0.2,
            timeout_seconds: crate::openai::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SummarySettings {
    /// The configured key, if it is non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    pub api_base: String,
    /// Long-poll timeout in seconds.
    pub poll_timeout_seconds: u64,
    /// Chats allowed to talk to the bot. Empty allows everyone.
    pub allowed_chat_ids: Vec<i64>,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout_seconds: 30,
            allowed_chat_ids: Vec::new(),
        }
    }
}

/// Processing pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Upper bound for a single stage. 0 disables the timeout.
    pub stage_timeout_seconds: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            stage_timeout_seconds: 4 * 3600,
        }
    }
}

impl PipelineSettings {
    pub fn stage_timeout(&self) -> Option<Duration> {
        (self.stage_timeout_seconds > 0).then(|| Duration::from_secs(self.stage_timeout_seconds))
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides are applied after the file is read.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Overlay values supplied by the deployment environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("BOT_TOKEN") {
            self.telegram.bot_token = Some(v);
        }
        if let Some(v) = get("ALLOWED_CHAT_IDS") {
            self.telegram.allowed_chat_ids = v
                .split(',')
                .filter_map(|id| id.trim().parse().ok())
                .collect();
        }
        if let Some(v) = get("RCLONE_BIN") {
            self.remote.rclone_bin = v;
        }
        if let Some(v) = get("RCLONE_REMOTE") {
            self.remote.name = v.trim_end_matches(':').to_string();
        }
        if let Some(v) = get("BROWSE_ROOT") {
            self.remote.browse_root = v;
        }
        if let Some(v) = get("VIDEOS_DEST") {
            self.remote.videos_dest = v;
        }
        if let Some(v) = get("TRANSCRIPTS_DEST") {
            self.remote.transcripts_dest = v;
        }
        if let Some(v) = get("SUMMARIES_DEST") {
            self.remote.summaries_dest = Some(v);
        }
        if let Some(v) = get("WHISPER_COMMAND") {
            self.transcription.command = v;
        }
        if let Some(v) = get("WHISPER_MODEL") {
            self.transcription.model = v;
        }
        if let Some(v) = get("WHISPER_DEVICE") {
            self.transcription.device = v;
        }
        if let Some(v) = get("WHISPER_COMPUTE_TYPE") {
            self.transcription.compute_type = v;
        }
        if let Some(v) = get("WHISPER_BEAM_SIZE").and_then(|v| v.parse().ok()) {
            self.transcription.beam_size = v;
        }
        if let Some(v) = get("WHISPER_VAD_FILTER") {
            self.transcription.vad_filter = parse_bool(&v);
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.summary.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_API_BASE") {
            self.summary.api_base = v;
        }
        if let Some(v) = get("SUMMARY_MODEL") {
            self.summary.model = v;
        }
        if let Some(v) = get("SUMMARY_MAX_CHARS").and_then(|v| v.parse().ok()) {
            self.summary.max_chars = v;
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::RcbotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rcbot")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Directory that holds per-job workspaces.
    pub fn workspace_root(&self) -> PathBuf {
        self.temp_dir().join("jobs")
    }

    /// Directory used by the direct-link pipeline for local downloads.
    pub fn downloads_dir(&self) -> PathBuf {
        self.temp_dir().join("downloads")
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.browser.page_size, 20);
        assert_eq!(settings.summary.max_chars, 12_000);
        assert_eq!(settings.remote.summaries_dest(), "rcbot/transcripts");
        assert!(settings.summary.api_key().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("BOT_TOKEN", "1:abc"),
            ("RCLONE_REMOTE", "drive:"),
            ("WHISPER_VAD_FILTER", "off"),
            ("WHISPER_BEAM_SIZE", "3"),
            ("OPENAI_API_KEY", "  "),
            ("ALLOWED_CHAT_IDS", "10, 20,bad"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(settings.telegram.bot_token.as_deref(), Some("1:abc"));
        assert_eq!(settings.remote.name, "drive");
        assert!(!settings.transcription.vad_filter);
        assert_eq!(settings.transcription.beam_size, 3);
        assert!(settings.summary.api_key().is_none());
        assert_eq!(settings.telegram.allowed_chat_ids, vec![10, 20]);
    }

    #[test]
    fn test_parse_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
            [remote]
            name = "box"
            summaries_dest = "notes"

            [pipeline]
            stage_timeout_seconds = 0
            "#,
        )
        .unwrap();

        assert_eq!(settings.remote.name, "box");
        assert_eq!(settings.remote.rclone_bin, "rclone");
        assert_eq!(settings.remote.summaries_dest(), "notes");
        assert!(settings.pipeline.stage_timeout().is_none());
    }
}
