// src/models/mod.rs

//! Domain models for the archiver.
//!
//! - `canvas`: LMS entities as stored in the JSON snapshots
//! - `records`: flattened per-student table rows
//! - `config`: application configuration

mod canvas;
mod config;
mod records;

// Re-export all public types
pub use canvas::{
    Assignment, Attachment, Comment, CommentAuthor, Course, MediaComment, RubricAssessmentEntry,
    RubricCriterion, RubricRating, Submission, SubmissionType, User, UserId, null_as_default,
};
pub use config::{
    ACCESS_TOKEN_ENV, ApiConfig, Config, DownloadConfig, LoggingConfig, PathsConfig,
};
pub use records::{
    AttachmentRecord, CommentRecord, RubricAssessmentRecord, StudentExport, SubmissionRecord,
    TableRecord,
};
