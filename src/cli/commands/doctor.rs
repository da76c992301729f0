//! Doctor command - verify external tools and configuration.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("rcbot Doctor");
    println!();
    println!("Checking external tools and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("External Tools").bold());
    let rclone = check_tool(&settings.remote.rclone_bin, "version", CheckStatus::Error, install_hint_rclone());
    rclone.print();
    checks.push(rclone);
    // Missing transcription only disables transcripts.
    let whisper = check_tool(
        &settings.transcription.command,
        "--help",
        CheckStatus::Warning,
        "Install with: pip install whisper-ctranslate2",
    );
    whisper.print();
    checks.push(whisper);

    println!();

    println!("{}", style("Credentials").bold());
    let token = check_bot_token(settings);
    token.print();
    checks.push(token);
    let key = check_api_key(settings);
    key.print();
    checks.push(key);

    println!();

    println!("{}", style("Remote").bold());
    Output::kv("Remote", &settings.remote.name);
    Output::kv("Browse root", &format!("/{}", settings.remote.browse_root.trim_matches('/')));
    Output::kv("Videos", &settings.remote.videos_dest);
    Output::kv("Transcripts", &settings.remote.transcripts_dest);
    Output::kv("Summaries", settings.remote.summaries_dest());

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before running the bot.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! rcbot is ready to run.");
    }

    Ok(())
}

/// Check if an external tool is available. `missing` is the status reported when it is not.
fn check_tool(name: &str, version_arg: &str, missing: CheckStatus, hint: &str) -> CheckResult {
    let fail = |message: &str| match missing {
        CheckStatus::Warning => CheckResult::warning(name, message, hint),
        _ => CheckResult::error(name, message, hint),
    };

    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            let version = if version.is_empty() { "installed".to_string() } else { version };
            CheckResult::ok(name, &crate::error::truncate_chars(&version, 50))
        }
        Ok(_) => fail("installed but not working"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => fail("not found"),
        Err(e) => fail(&format!("error: {}", e)),
    }
}

fn check_bot_token(settings: &Settings) -> CheckResult {
    match settings.telegram.bot_token.as_deref().map(str::trim) {
        Some(token) if token.contains(':') => CheckResult::ok("BOT_TOKEN", "configured"),
        Some(token) if !token.is_empty() => CheckResult::warning(
            "BOT_TOKEN",
            "set but format looks unusual",
            "Expected format: 123456789:AA... (from @BotFather)",
        ),
        _ => CheckResult::error(
            "BOT_TOKEN",
            "not set",
            "Set with: export BOT_TOKEN='123456789:AA...'",
        ),
    }
}

fn check_api_key(settings: &Settings) -> CheckResult {
    match settings.summary.api_key() {
        Some(key) if key.chars().count() > 12 => {
            let head: String = key.chars().take(3).collect();
            let tail: String = key.chars().skip(key.chars().count() - 4).collect();
            let masked = format!("{}...{}", head, tail);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Some(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but looks too short",
            "Expected format: sk-... (OpenAI API key)",
        ),
        None => CheckResult::warning(
            "OPENAI_API_KEY",
            "not set, summaries disabled",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults and environment",
            "Create with: rcbot config init",
        )
    }
}

/// Platform-specific install hint for rclone.
fn install_hint_rclone() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install rclone"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install rclone (or curl https://rclone.org/install.sh | sudo bash)"
    } else {
        "Install from: https://rclone.org/downloads/"
    }
}
