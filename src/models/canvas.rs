//! LMS entities as they appear in the JSON snapshots.
//!
//! Only the fields the archiver reads are modelled; everything else in the
//! API payload is ignored on deserialization. Fields the API is known to send
//! as `null` are `Option` or use [`null_as_default`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque numeric user id assigned by the LMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A course, the root of the archived hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub course_code: Option<String>,

    #[serde(default)]
    pub start_at: Option<String>,
}

/// A user enrolled in a course, student or otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Login identifier, usually an email address. Pending enrollments lack one.
    #[serde(default)]
    pub login_id: Option<String>,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

impl User {
    /// Export user name: the part of the login id before `@`.
    ///
    /// `someuser@ourdomain.net` becomes `someuser`. Users without a login id
    /// have no user name.
    pub fn user_name(&self) -> Option<String> {
        let login = self.login_id.as_deref()?;
        let local = login.split('@').next().unwrap_or(login);
        if local.is_empty() {
            None
        } else {
            Some(local.to_string())
        }
    }
}

/// An assignment with its embedded rubric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: u64,

    pub name: String,

    /// Rich-text (HTML) description
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub rubric: Vec<RubricCriterion>,
}

impl Assignment {
    /// Find a rubric criterion by id.
    pub fn criterion(&self, id: &str) -> Option<&RubricCriterion> {
        self.rubric.iter().find(|c| c.id == id)
    }
}

/// One graded dimension of a rubric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub ratings: Vec<RubricRating>,
}

impl RubricCriterion {
    /// Rating whose points equal `points` exactly.
    pub fn rating_for(&self, points: f64) -> Option<&RubricRating> {
        self.ratings.iter().find(|r| r.points == points)
    }
}

/// A point tier within a rubric criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricRating {
    pub points: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// Kind of work a submission carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionType {
    OnlineTextEntry,
    OnlineUrl,
    OnlineUpload,
    MediaRecording,
    Other(String),
}

impl SubmissionType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "online_text_entry" => Self::OnlineTextEntry,
            "online_url" => Self::OnlineUrl,
            "online_upload" => Self::OnlineUpload,
            "media_recording" => Self::MediaRecording,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::OnlineTextEntry => "online_text_entry",
            Self::OnlineUrl => "online_url",
            Self::OnlineUpload => "online_upload",
            Self::MediaRecording => "media_recording",
            Self::Other(raw) => raw,
        }
    }
}

/// A student's submission for one assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: u64,

    pub user_id: UserId,

    #[serde(default)]
    pub submission_type: Option<String>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    /// Grades arrive as strings ("A-", "pass") or numbers.
    #[serde(default, deserialize_with = "string_or_number")]
    pub grade: Option<String>,

    #[serde(default)]
    pub submitted_at: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub submission_comments: Vec<Comment>,

    /// Criterion id to assessment
    #[serde(default)]
    pub rubric_assessment: Option<BTreeMap<String, RubricAssessmentEntry>>,

    #[serde(default)]
    pub media_comment: Option<MediaComment>,
}

impl Submission {
    pub fn kind(&self) -> Option<SubmissionType> {
        self.submission_type.as_deref().map(SubmissionType::parse)
    }
}

/// A file attached to a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,

    /// Server-assigned file name
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,

    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// A comment left on a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,

    #[serde(default)]
    pub author_id: Option<UserId>,

    /// Denormalized author, present even when the author left the course
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: CommentAuthor,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentAuthor {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Points and comments given for one rubric criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricAssessmentEntry {
    /// Kept as given so tables carry the LMS's own number text
    #[serde(default)]
    pub points: Option<serde_json::Number>,

    #[serde(default)]
    pub comments: Option<String>,
}

/// Recording attached to a `media_recording` submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaComment {
    pub media_id: String,

    #[serde(default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

/// Deserialize `null` as the type's default value.
pub fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(serde_json::Number),
        Flag(bool),
    }

    Ok(
        Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }),
    )
}
