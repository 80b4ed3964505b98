//! Local filesystem snapshot store.
//!
//! One pretty-printed JSON file per (kind, id) under a single directory,
//! plus a plain-text run timestamp.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{SnapshotKind, SnapshotStore};

/// File holding the run timestamp.
pub const TIMESTAMP_FILE_NAME: &str = "time_stamp.txt";

/// Local filesystem snapshot backend.
#[derive(Debug, Clone)]
pub struct LocalSnapshotStore {
    root_dir: PathBuf,
}

impl LocalSnapshotStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Full path of the snapshot file for a key.
    pub fn snapshot_path(&self, kind: SnapshotKind, id: Option<u64>) -> PathBuf {
        self.root_dir.join(kind.file_name(id))
    }

    pub fn timestamp_path(&self) -> PathBuf {
        self.root_dir.join(TIMESTAMP_FILE_NAME)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read a file that a later stage depends on. Absence is fatal.
    async fn read_required(&self, path: &Path) -> Result<Vec<u8>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::snapshot_missing(path))
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl SnapshotStore for LocalSnapshotStore {
    async fn save(&self, kind: SnapshotKind, id: Option<u64>, data: &Value) -> Result<()> {
        let path = self.snapshot_path(kind, id);
        let bytes = serde_json::to_vec_pretty(data)?;
        self.write_bytes(&path, &bytes).await
    }

    async fn load(&self, kind: SnapshotKind, id: Option<u64>) -> Result<Value> {
        let path = self.snapshot_path(kind, id);
        let bytes = self.read_required(&path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_timestamp(&self, timestamp: &str) -> Result<()> {
        let path = self.timestamp_path();
        self.write_bytes(&path, timestamp.as_bytes()).await
    }

    async fn read_timestamp(&self) -> Result<String> {
        let bytes = self.read_required(&self.timestamp_path()).await?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.lines().next().unwrap_or_default().to_string())
    }
}
