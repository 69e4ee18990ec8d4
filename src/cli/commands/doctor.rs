//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight::API_KEY_VAR;
use crate::cli::Output;
use crate::config::Settings;
use crate::toolchain::REQUIRED_TOOLS;
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
    Output::header("klar Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    // Check external tools
    println!("{}", style("External Tools").bold());
    for tool in REQUIRED_TOOLS {
        let check = check_tool(tool, install_hint(tool));
        check.print();
        checks.push(check);
    }

    println!();

    // Check API keys
    println!("{}", style("API Configuration").bold());
    let api_check = check_gemini_api_key();
    api_check.print();
    checks.push(api_check);

    println!();

    // Check directories
    println!("{}", style("Directories").bold());
    let dir_check = check_temp_dir(settings);
    dir_check.print();
    checks.push(dir_check);

    println!();

    // Check configuration
    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using klar.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! klar is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };

    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            // Try to extract version from first line
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            // Truncate long version strings
            let version_display = if version.len() > 50 {
                format!("{}...", &version[..50])
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check if the Gemini API key is configured.
fn check_gemini_api_key() -> CheckResult {
    match std::env::var(API_KEY_VAR) {
        Ok(key) if key.starts_with("AIza") && key.len() > 20 => {
            CheckResult::ok(API_KEY_VAR, &format!("configured ({})", mask_key(&key)))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            API_KEY_VAR,
            "empty",
            "Set with: export GEMINI_API_KEY='AIza...'",
        ),
        Ok(_) => CheckResult::warning(
            API_KEY_VAR,
            "set but format looks unusual",
            "Expected format: AIza... (Google AI Studio key)",
        ),
        Err(_) => CheckResult::error(
            API_KEY_VAR,
            "not set",
            "Set with: export GEMINI_API_KEY='AIza...'",
        ),
    }
}

/// Mask a credential for display, keeping a short prefix and suffix.
fn mask_key(key: &str) -> String {
    if key.len() > 12 {
        format!("{}...{}", &key[..7], &key[key.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Check the scratch directory.
fn check_temp_dir(settings: &Settings) -> CheckResult {
    let temp_dir = settings.temp_dir();
    if temp_dir.exists() {
        CheckResult::ok("Temp directory", &format!("{}", temp_dir.display()))
    } else {
        CheckResult::warning(
            "Temp directory",
            &format!("{} (will be created)", temp_dir.display()),
            "Directory will be created on first use",
        )
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
            "using defaults",
            "Create with: klar init (or klar config edit)",
        )
    }
}

/// Platform-specific install hint.
fn install_hint(tool: &str) -> &'static str {
    match tool {
        "yt-dlp" => {
            if cfg!(target_os = "macos") {
                "Install with: brew install yt-dlp"
            } else if cfg!(target_os = "linux") {
                "Install with: pip install yt-dlp (or your package manager)"
            } else {
                "Install from: https://github.com/yt-dlp/yt-dlp"
            }
        }
        "ffmpeg" | "ffprobe" => {
            if cfg!(target_os = "macos") {
                "Install with: brew install ffmpeg"
            } else if cfg!(target_os = "linux") {
                "Install with: sudo apt install ffmpeg (or your package manager)"
            } else {
                "Install from: https://ffmpeg.org/download.html"
            }
        }
        _ => "Check the documentation for installation instructions",
    }
}
