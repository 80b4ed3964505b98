// src/pipeline/replay.rs

//! Retry of failed downloads recorded in the error log.
//!
//! Each failure line is retried exactly once. The old error log is backed up
//! and cleared first, so anything that fails again is the only thing left in
//! the live error log afterwards.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::logging::{self, RunLog};
use crate::models::Config;
use crate::services::Downloader;
use crate::services::downloader::unescape_field;

static FAILURE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d\d-\d\d-\d{4} \d\d:\d\d:\d\d\.\.Error_http_downloader '(.*)', '(.*)'$")
        .expect("Invalid failure line regex")
});

/// A download to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
    pub path: PathBuf,
    pub url: String,
}

/// What a replay did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub retried: usize,
    pub failed: usize,
    /// Copy of the error log taken before retrying
    pub backup: Option<PathBuf>,
}

/// Replay failed downloads using the configured paths.
pub async fn run_replay(config: &Config, log: &RunLog) -> Result<ReplaySummary> {
    logging::header("Retrying failed downloads");

    let downloader = Downloader::new(&config.api, &config.download, log.clone())?;
    let summary = replay_failed_downloads(&downloader, log).await?;

    logging::summary(
        "Retry finished",
        &[
            ("Retried", summary.retried.to_string()),
            ("Failed again", summary.failed.to_string()),
        ],
    );
    Ok(summary)
}

/// Retry every download failure found in the run's error log.
///
/// Lines that do not match the failure format are ignored. With nothing to
/// retry, the error log is left untouched.
pub async fn replay_failed_downloads(
    downloader: &Downloader,
    log: &RunLog,
) -> Result<ReplaySummary> {
    let failures = match tokio::fs::read_to_string(log.error_path()).await {
        Ok(text) => parse_failures(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    if failures.is_empty() {
        log.status("No download errors to retry.");
        return Ok(ReplaySummary::default());
    }

    let backup = backup_path(log.error_path());
    log.status(&format!(
        "Copying error log {} to {}",
        log.error_path().display(),
        backup.display()
    ));
    tokio::fs::copy(log.error_path(), &backup).await?;
    log.clear_errors();

    let mut summary = ReplaySummary {
        backup: Some(backup),
        ..ReplaySummary::default()
    };
    for failure in &failures {
        let outcome = downloader.download(&failure.url, &failure.path).await;
        summary.retried += 1;
        if !outcome.is_saved() {
            summary.failed += 1;
        }
    }

    Ok(summary)
}

/// Extract failed downloads from error log text.
pub fn parse_failures(text: &str) -> Vec<FailedDownload> {
    text.lines()
        .filter_map(|line| FAILURE_LINE.captures(line.trim_end_matches('\r')))
        .map(|caps| FailedDownload {
            path: PathBuf::from(unescape_field(&caps[1])),
            url: unescape_field(&caps[2]),
        })
        .collect()
}

/// First unused `retryNNN.txt` next to the error log.
pub fn backup_path(error_log: &Path) -> PathBuf {
    let dir = match error_log.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut n = 0u32;
    loop {
        let candidate = dir.join(format!("retry{n:03}.txt"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
