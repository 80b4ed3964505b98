// src/pipeline/download.rs

//! Binary downloads for an export tree.
//!
//! Work is discovered by walking the export tree for student tables, so this
//! stage runs against whatever the last export wrote.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;
use crate::logging::{self, RunLog};
use crate::models::{AttachmentRecord, Config, SubmissionRecord, SubmissionType, TableRecord};
use crate::services::{DownloadOutcome, Downloader};
use crate::storage::read_records;
use crate::utils::path_component;

/// Tally of download attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub saved: usize,
    pub failed: usize,
}

impl DownloadSummary {
    fn record(&mut self, outcome: &DownloadOutcome) {
        if outcome.is_saved() {
            self.saved += 1;
        } else {
            self.failed += 1;
        }
    }

    fn merge(self, other: DownloadSummary) -> DownloadSummary {
        DownloadSummary {
            saved: self.saved + other.saved,
            failed: self.failed + other.failed,
        }
    }
}

/// Download attachments and media recordings for the configured export tree.
pub async fn run_download(config: &Config, log: &RunLog) -> Result<DownloadSummary> {
    logging::header("Downloading submission files");

    let downloader = Downloader::new(&config.api, &config.download, log.clone())?;
    let root = &config.paths.exports_dir;

    log.status("Download attachments");
    let attachments = download_attachments(&downloader, root).await?;

    log.status("Download media recordings");
    let media = download_media_recordings(&downloader, root).await?;

    let summary = attachments.merge(media);
    logging::summary(
        "Downloads finished",
        &[
            ("Saved", summary.saved.to_string()),
            ("Failed", summary.failed.to_string()),
        ],
    );
    Ok(summary)
}

/// Download every attachment, and its thumbnail when it has one, into the
/// student folder listing it.
pub async fn download_attachments(
    downloader: &Downloader,
    exports_root: &Path,
) -> Result<DownloadSummary> {
    let mut summary = DownloadSummary::default();

    for folder in folders_with(exports_root, AttachmentRecord::FILE_NAME)? {
        let attachments: Vec<AttachmentRecord> =
            read_records(&folder.join(AttachmentRecord::FILE_NAME))?;

        for attachment in &attachments {
            let outcome = downloader
                .download(&attachment.url, &target(&folder, &attachment.file_name))
                .await;
            summary.record(&outcome);

            if let (Some(url), Some(file)) =
                (&attachment.thumbnail_url, &attachment.thumbnail_file)
            {
                let outcome = downloader.download(url, &target(&folder, file)).await;
                summary.record(&outcome);
            }
        }
    }

    Ok(summary)
}

/// Download the recording of every `media_recording` submission.
pub async fn download_media_recordings(
    downloader: &Downloader,
    exports_root: &Path,
) -> Result<DownloadSummary> {
    let mut summary = DownloadSummary::default();
    let media_recording = SubmissionType::MediaRecording;

    for folder in folders_with(exports_root, SubmissionRecord::FILE_NAME)? {
        let submissions: Vec<SubmissionRecord> =
            read_records(&folder.join(SubmissionRecord::FILE_NAME))?;

        for submission in &submissions {
            if submission.submission_type.as_deref() != Some(media_recording.as_str()) {
                continue;
            }

            match (&submission.media_file, &submission.media_url) {
                (Some(file), Some(url)) => {
                    let outcome = downloader.download(url, &target(&folder, file)).await;
                    summary.record(&outcome);
                }
                _ => log::warn!(
                    "Media recording for submission {} has no media to download",
                    submission.submission_id
                ),
            }
        }
    }

    Ok(summary)
}

/// Local path for a remote file name, always directly inside `folder`.
fn target(folder: &Path, file_name: &str) -> PathBuf {
    folder.join(path_component(file_name))
}

/// Directories under `root` that contain a file named `file_name`, in
/// sorted walk order. A missing root has no folders.
fn folders_with(root: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut folders = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == file_name {
            if let Some(parent) = entry.path().parent() {
                folders.push(parent.to_path_buf());
            }
        }
    }
    Ok(folders)
}
