//! Storage for snapshots and flattened tables.
//!
//! ## Directory Structure
//!
//! ```text
//! json/
//! ├── courses.json              # Singleton course list
//! ├── students_<course>.json    # Student roster per course
//! ├── users_<course>.json       # Full user roster per course
//! ├── assignments_<course>.json # Assignments (with rubrics) per course
//! ├── submissions_<assign>.json # Submissions per assignment
//! └── time_stamp.txt            # When the snapshot was taken
//! exports/
//! └── <course>/<student>/{submissions,comments,attachments,rubric_assessments}.csv
//! ```

pub mod local;
pub mod table;

use std::fmt;

use async_trait::async_trait;
use chrono::Local;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalSnapshotStore;
pub use table::{read_records, write_records};

/// Display format of the run timestamp.
pub const RUN_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M%p";

/// Collection captured in a snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    Courses,
    Students,
    Users,
    Assignments,
    Submissions,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::Courses => "courses",
            SnapshotKind::Students => "students",
            SnapshotKind::Users => "users",
            SnapshotKind::Assignments => "assignments",
            SnapshotKind::Submissions => "submissions",
        }
    }

    /// File name for this kind, with the entity id substituted in.
    ///
    /// Keyed kinds become `<kind>_<id>.json`; the singleton course list is
    /// `courses.json`.
    pub fn file_name(&self, id: Option<u64>) -> String {
        match id {
            Some(id) => format!("{}_{}.json", self.as_str(), id),
            None => format!("{}.json", self.as_str()),
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current local time rendered as a run timestamp.
pub fn run_timestamp_now() -> String {
    Local::now().format(RUN_TIMESTAMP_FORMAT).to_string()
}

/// Trait for snapshot storage backends.
///
/// Snapshots are whole JSON documents keyed by (kind, id). A save replaces
/// any previous document for the key; nothing is merged.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot document.
    async fn save(&self, kind: SnapshotKind, id: Option<u64>, data: &Value) -> Result<()>;

    /// Load a snapshot document. A missing snapshot is an error.
    async fn load(&self, kind: SnapshotKind, id: Option<u64>) -> Result<Value>;

    /// Record when this snapshot run happened.
    async fn write_timestamp(&self, timestamp: &str) -> Result<()>;

    /// Read the recorded run timestamp.
    async fn read_timestamp(&self) -> Result<String>;
}

/// Load a snapshot and deserialize it into `T`.
pub async fn load_as<T: DeserializeOwned>(
    store: &dyn SnapshotStore,
    kind: SnapshotKind,
    id: Option<u64>,
) -> Result<T> {
    let value = store.load(kind, id).await?;
    Ok(serde_json::from_value(value)?)
}
