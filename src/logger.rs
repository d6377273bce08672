use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::config::ConfigManager;

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// Initialize the logging system
///
/// Console output goes to stderr so `publish --json` keeps stdout clean.
///
/// The console level is picked in this order:
/// - `verbosity` from the command line (`-v` debug, `-q` warnings only)
/// - the `RUST_LOG` environment variable
/// - `info`
///
/// Every run also appends a line to the log file in the config directory:
/// - Linux: ~/.config/report-publisher/report-publisher.log or $XDG_CONFIG_HOME/report-publisher/report-publisher.log
/// - macOS: ~/Library/Application Support/report-publisher/report-publisher.log
/// - Windows: %APPDATA%\report-publisher\report-publisher.log
///
/// ## Examples
///
/// ```bash
/// # Show every git command that runs (tokens are masked)
/// report-publisher -v publish output/report.md
///
/// # Only warnings and errors
/// RUST_LOG=warn report-publisher publish output/report.md
/// ```
pub fn init_logger(verbosity: Option<LevelFilter>) -> Result<()> {
    ConfigManager::ensure_config_dir()?;
    rotate_log_if_needed()?;

    let level = verbosity.unwrap_or_else(|| {
        std::env::var("RUST_LOG")
            .ok()
            .and_then(|s| s.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info)
    });

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok(); // Already initialized in tests

    log_to_file(&format!("Logger initialized with level: {level:?}"))?;

    Ok(())
}

/// Append one timestamped line to the log file.
///
/// Callers must not pass credentials; run summaries are built from
/// already-masked command lines.
pub fn log_to_file(message: &str) -> Result<()> {
    let log_path = ConfigManager::log_file_path()?;
    append_line(&log_path, message)
}

fn append_line(log_path: &Path, message: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        message
    )?;

    Ok(())
}

/// Rotate the log file to `.log.old` once it exceeds 10MB
pub fn rotate_log_if_needed() -> Result<()> {
    let log_path = ConfigManager::log_file_path()?;
    rotate(&log_path, MAX_LOG_SIZE)
}

fn rotate(log_path: &Path, max_size: u64) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(log_path)?;
    if metadata.len() > max_size {
        let old_log_path = log_path.with_extension("log.old");
        if old_log_path.exists() {
            std::fs::remove_file(&old_log_path)?;
        }
        std::fs::rename(log_path, &old_log_path)?;
        log::info!("Log file rotated to {}", old_log_path.display());
    }

    Ok(())
}
