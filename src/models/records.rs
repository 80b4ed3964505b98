//! Flattened per-student table rows.
//!
//! Each struct is one row of one CSV table. Field order is column order, and
//! [`TableRecord::HEADERS`] names the columns the header row carries.

use serde::{Deserialize, Serialize};

/// A row type stored in its own per-student table.
pub trait TableRecord {
    /// File name of the table inside a student folder.
    const FILE_NAME: &'static str;

    /// Header row, in field order.
    const HEADERS: &'static [&'static str];

    /// Submission this row belongs to.
    fn submission_id(&self) -> u64;
}

/// One submission artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub submission_id: u64,
    pub user_name: String,
    pub course_name: String,
    pub course_start_at: Option<String>,
    pub assignment_name: String,
    pub assignment_description: String,
    pub submitted_at: Option<String>,
    pub submission_type: Option<String>,
    pub submission_body: Option<String>,
    pub submission_url: Option<String>,
    pub media_file: Option<String>,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub submission_grade: Option<String>,
}

impl TableRecord for SubmissionRecord {
    const FILE_NAME: &'static str = "submissions.csv";
    const HEADERS: &'static [&'static str] = &[
        "submission_id",
        "user_name",
        "course_name",
        "course_start_at",
        "assignment_name",
        "assignment_description",
        "submitted_at",
        "submission_type",
        "submission_body",
        "submission_url",
        "media_file",
        "media_type",
        "media_url",
        "submission_grade",
    ];

    fn submission_id(&self) -> u64 {
        self.submission_id
    }
}

/// One comment on a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub submission_id: u64,
    pub created_at: Option<String>,
    pub comment: String,
    /// Author's user name, or their display name when they left the course
    pub user_name: String,
}

impl TableRecord for CommentRecord {
    const FILE_NAME: &'static str = "comments.csv";
    const HEADERS: &'static [&'static str] =
        &["submission_id", "created_at", "comment", "user_name"];

    fn submission_id(&self) -> u64 {
        self.submission_id
    }
}

/// One file attached to a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub submission_id: u64,
    pub url: String,
    pub file_name: String,
    pub display_name: String,
    pub thumbnail_url: Option<String>,
    pub thumbnail_file: Option<String>,
}

impl TableRecord for AttachmentRecord {
    const FILE_NAME: &'static str = "attachments.csv";
    const HEADERS: &'static [&'static str] = &[
        "submission_id",
        "url",
        "file_name",
        "display_name",
        "thumbnail_url",
        "thumbnail_file",
    ];

    fn submission_id(&self) -> u64 {
        self.submission_id
    }
}

/// One graded rubric criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricAssessmentRecord {
    pub submission_id: u64,
    pub description: String,
    pub points: String,
    pub rating: String,
    pub comments: String,
}

impl TableRecord for RubricAssessmentRecord {
    const FILE_NAME: &'static str = "rubric_assessments.csv";
    const HEADERS: &'static [&'static str] =
        &["submission_id", "description", "points", "rating", "comments"];

    fn submission_id(&self) -> u64 {
        self.submission_id
    }
}

/// Everything exported for one student in one course.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentExport {
    /// Folder name under the course directory
    pub user_name: String,
    pub submissions: Vec<SubmissionRecord>,
    pub comments: Vec<CommentRecord>,
    pub attachments: Vec<AttachmentRecord>,
    pub rubric_assessments: Vec<RubricAssessmentRecord>,
}

impl StudentExport {
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            ..Self::default()
        }
    }

    /// Rows of a related table that belong to `submission_id`, in stored order.
    pub fn related<'a, T: TableRecord>(rows: &'a [T], submission_id: u64) -> Vec<&'a T> {
        rows.iter()
            .filter(|row| row.submission_id() == submission_id)
            .collect()
    }
}
