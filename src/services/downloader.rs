// src/services/downloader.rs

//! Resilient binary downloader.
//!
//! A download never fails past this boundary. Failures are recorded in the
//! error log as a single replayable line
//!
//! ```text
//! 09-04-2017 12:45:17..Error_http_downloader 'exports/Bio101/jdoe/Lab.docx', 'https://lms/files/8080/download'
//! ```
//!
//! and also handed back to the caller as [`DownloadOutcome::Failed`], which
//! callers are free to ignore.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::logging::RunLog;
use crate::models::{ApiConfig, DownloadConfig};
use crate::utils::http::create_download_client;

/// Marker that identifies a failed download in the error log.
pub const FAILURE_MARKER: &str = "Error_http_downloader";

/// Result of a single download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved { path: PathBuf, bytes: u64 },
    Failed { path: PathBuf, url: String, reason: String },
}

impl DownloadOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, DownloadOutcome::Saved { .. })
    }
}

/// Downloads files, logging every failure in replayable form.
pub struct Downloader {
    client: Client,
    log: RunLog,
}

impl Downloader {
    pub fn new(api: &ApiConfig, config: &DownloadConfig, log: RunLog) -> Result<Self> {
        let client = create_download_client(api, config)?;
        Ok(Self::with_client(client, log))
    }

    pub fn with_client(client: Client, log: RunLog) -> Self {
        Self { client, log }
    }

    /// Download `url` to `target`, creating or overwriting the file.
    pub async fn download(&self, url: &str, target: &Path) -> DownloadOutcome {
        self.log
            .status(&format!("Download file {}", target.display()));
        self.log.status(&format!("Download URL {url}"));

        match self.fetch_to_file(url, target).await {
            Ok(bytes) => {
                self.log
                    .status(&format!("Done downloading {}", target.display()));
                DownloadOutcome::Saved {
                    path: target.to_path_buf(),
                    bytes,
                }
            }
            Err(e) => {
                self.log.error(&failure_message(target, url));
                self.log.error(&format!("Error object: {e}"));
                DownloadOutcome::Failed {
                    path: target.to_path_buf(),
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn fetch_to_file(&self, url: &str, target: &Path) -> Result<u64> {
        let response = self.client.get(url).send().await?;
        self.log
            .status(&format!("Status code: {}", response.status().as_u16()));
        let response = response.error_for_status()?;

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::File::create(target).await?;
        let written = write_body(&mut file, response).await;
        drop(file);

        // Never leave a truncated file behind.
        if written.is_err() {
            if let Err(e) = tokio::fs::remove_file(target).await {
                log::warn!("Could not remove partial download {}: {}", target.display(), e);
            }
        }
        written
    }
}

async fn write_body(file: &mut tokio::fs::File, response: reqwest::Response) -> Result<u64> {
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Error log message recording a failed download.
pub fn failure_message(target: &Path, url: &str) -> String {
    format!(
        "{FAILURE_MARKER} '{}', '{}'",
        escape_field(&target.to_string_lossy()),
        escape_field(url)
    )
}

/// Escape backslashes and single quotes so a field survives the log round trip.
pub fn escape_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Reverse of [`escape_field`].
pub fn unescape_field(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CannedResponse, TestServer, unreachable_url};
    use tempfile::TempDir;

    fn downloader(tmp: &TempDir) -> Downloader {
        let log = RunLog::new(tmp.path().join("log.txt"), tmp.path().join("err.txt"));
        Downloader::with_client(Client::new(), log)
    }

    #[test]
    fn test_escape_round_trip() {
        let raw = r"exports/Bio101/jdoe/Tom's \draft\.docx";
        let escaped = escape_field(raw);
        assert_eq!(escaped, r"exports/Bio101/jdoe/Tom\'s \\draft\\.docx");
        assert_eq!(unescape_field(&escaped), raw);
    }

    #[test]
    fn test_failure_message_shape() {
        let message = failure_message(Path::new("out/it's.pdf"), "http://x/f?a='b'");
        assert_eq!(
            message,
            r"Error_http_downloader 'out/it\'s.pdf', 'http://x/f?a=\'b\''"
        );
    }

    #[tokio::test]
    async fn test_download_saves_body() {
        let tmp = TempDir::new().unwrap();
        let server = TestServer::bind().await;
        let url = format!("{}/files/1/download", server.url());
        let handle = server.serve(vec![CannedResponse::ok(b"%PDF-1.4 body".to_vec())]);

        let target = tmp.path().join("Bio101/jdoe/Lab Report.pdf");
        let outcome = downloader(&tmp).download(&url, &target).await;
        handle.await.unwrap();

        assert_eq!(
            outcome,
            DownloadOutcome::Saved {
                path: target.clone(),
                bytes: 13
            }
        );
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.4 body");
        assert!(!tmp.path().join("err.txt").exists());
    }

    #[tokio::test]
    async fn test_download_overwrites_existing_file() {
        let tmp = TempDir::new().unwrap();
        let server = TestServer::bind().await;
        let url = format!("{}/files/2/download", server.url());
        let handle = server.serve(vec![CannedResponse::ok(b"new".to_vec())]);

        let target = tmp.path().join("thumb.png");
        std::fs::write(&target, b"old contents").unwrap();

        assert!(downloader(&tmp).download(&url, &target).await.is_saved());
        handle.await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_unreachable_url_is_logged_not_raised() {
        let tmp = TempDir::new().unwrap();
        let url = unreachable_url().await;
        let target = tmp.path().join("it's here.docx");

        let outcome = downloader(&tmp).download(&url, &target).await;
        assert!(!outcome.is_saved());
        assert!(!target.exists());

        let errors = std::fs::read_to_string(tmp.path().join("err.txt")).unwrap();
        let failures: Vec<&str> = errors
            .lines()
            .filter(|line| line.contains(FAILURE_MARKER))
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains(&escape_field(&target.to_string_lossy())));
        assert!(failures[0].contains(&url));
        assert!(failures[0].contains(r"it\'s here.docx"));
    }

    #[tokio::test]
    async fn test_truncated_body_leaves_no_file() {
        let tmp = TempDir::new().unwrap();
        let server = TestServer::bind().await;
        let url = format!("{}/files/4/download", server.url());
        let handle = server.serve(vec![
            CannedResponse::ok(b"only part".to_vec()).declared_length(4096),
        ]);

        let target = tmp.path().join("Bio101/jdoe/big.mov");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"stale").unwrap();

        let outcome = downloader(&tmp).download(&url, &target).await;
        handle.await.unwrap();

        assert!(!outcome.is_saved());
        assert!(!target.exists());
        let errors = std::fs::read_to_string(tmp.path().join("err.txt")).unwrap();
        assert!(errors.contains(FAILURE_MARKER));
    }

    #[tokio::test]
    async fn test_http_error_status_is_failure() {
        let tmp = TempDir::new().unwrap();
        let server = TestServer::bind().await;
        let url = format!("{}/files/3/download", server.url());
        let handle = server.serve(vec![CannedResponse::status(404)]);

        let target = tmp.path().join("missing.png");
        let outcome = downloader(&tmp).download(&url, &target).await;
        handle.await.unwrap();

        match outcome {
            DownloadOutcome::Failed { url: failed, .. } => assert_eq!(failed, url),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!target.exists());
    }
}
