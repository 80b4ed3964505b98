// src/logging.rs

//! Run logging with audit-friendly file sinks.
//!
//! The archiver runs unattended, so every status line is appended to a
//! status log and every error line additionally to an error log. Both
//! share one timestamp prefix so the error log stays machine-parseable
//! (see `pipeline::replay`). Console output goes through the `log` facade.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::models::PathsConfig;

/// Timestamp prefix written in front of every log file line.
pub const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H:%M:%S..";

/// Severity of a run log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Whether lines at this level also go to the error log.
    fn is_error(self) -> bool {
        self >= LogLevel::Warn
    }
}

/// Append-only status and error sinks for one run.
#[derive(Debug, Clone)]
pub struct RunLog {
    status_path: PathBuf,
    error_path: PathBuf,
}

impl RunLog {
    /// Create a run log writing to the given status and error files.
    pub fn new(status_path: impl Into<PathBuf>, error_path: impl Into<PathBuf>) -> Self {
        Self {
            status_path: status_path.into(),
            error_path: error_path.into(),
        }
    }

    /// Create a run log from the configured paths.
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::new(&paths.log_file, &paths.err_file)
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    /// Record a status line.
    pub fn status(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    /// Record a warning. Warnings are audited in the error log as well.
    pub fn warn(&self, message: &str) {
        self.record(LogLevel::Warn, message);
    }

    /// Record an error line.
    pub fn error(&self, message: &str) {
        self.record(LogLevel::Error, message);
    }

    fn record(&self, level: LogLevel, message: &str) {
        let line = format_line(message);

        if level.is_error() {
            append_line(&self.error_path, &line);
        }
        append_line(&self.status_path, &line);

        match level {
            LogLevel::Info => log::info!("{}", message),
            LogLevel::Warn => log::warn!("{}", message),
            LogLevel::Error => log::error!("{}", message),
        }
    }

    /// Delete the status log.
    pub fn clear_status(&self) {
        remove_if_exists(&self.status_path);
    }

    /// Delete the error log. A missing error log means a clean run.
    pub fn clear_errors(&self) {
        remove_if_exists(&self.error_path);
    }

    /// Delete both log files.
    pub fn clear(&self) {
        self.clear_status();
        self.clear_errors();
    }
}

/// Prefix a message with the log timestamp.
pub fn format_line(message: &str) -> String {
    format!("{}{}", Local::now().format(TIMESTAMP_FORMAT), message)
}

fn append_line(path: &Path, line: &str) {
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| writeln!(file, "{line}"));

    if let Err(e) = result {
        log::error!("Failed to append to {}: {}", path.display(), e);
    }
}

fn remove_if_exists(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::error!("Failed to remove {}: {}", path.display(), e),
    }
}

/// Log a header
pub fn header(title: &str) {
    log::info!("{}", "═".repeat(60));
    log::info!("  {}", title);
    log::info!("{}", "═".repeat(60));
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
