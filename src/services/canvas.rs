// src/services/canvas.rs

//! LMS collection endpoints used to build a snapshot.

use serde_json::Value;

use crate::error::Result;
use crate::services::PageFetcher;

/// Enrollment states included when listing course users. Inactive students
/// are archived too.
const ENROLLMENT_STATES: [&str; 3] = ["active", "invited", "inactive"];

/// Error object the submissions endpoint returns for an assignment nobody submitted to.
const NO_SUBMISSIONS_ERROR: &str = "invalid assignment ids requested";

/// Typed access to the endpoints the archiver snapshots.
pub struct LmsClient {
    fetcher: PageFetcher,
    account_id: u64,
}

impl LmsClient {
    pub fn new(fetcher: PageFetcher, account_id: u64) -> Self {
        Self {
            fetcher,
            account_id,
        }
    }

    /// All courses in the account.
    pub async fn courses(&self) -> Result<Vec<Value>> {
        self.fetcher
            .fetch_all(&format!("accounts/{}/courses", self.account_id), &[])
            .await
    }

    /// Students enrolled in a course.
    pub async fn course_students(&self, course_id: u64) -> Result<Vec<Value>> {
        let mut params = vec![("enrollment_type[]", "student".to_string())];
        params.extend(enrollment_state_params());
        self.fetcher
            .fetch_all(&format!("courses/{course_id}/users"), &params)
            .await
    }

    /// Every user in a course, needed to resolve comment authors.
    pub async fn course_users(&self, course_id: u64) -> Result<Vec<Value>> {
        self.fetcher
            .fetch_all(
                &format!("courses/{course_id}/users"),
                &enrollment_state_params(),
            )
            .await
    }

    /// Assignments of a course, rubrics included.
    pub async fn assignments(&self, course_id: u64) -> Result<Vec<Value>> {
        self.fetcher
            .fetch_all(&format!("courses/{course_id}/assignments"), &[])
            .await
    }

    /// Submissions for one assignment, with comments and rubric assessments.
    pub async fn submissions(&self, course_id: u64, assignment_id: u64) -> Result<Vec<Value>> {
        let params = [
            ("include[]", "submission_comments".to_string()),
            ("include[]", "rubric_assessment".to_string()),
            ("student_ids[]", "all".to_string()),
            ("assignment_ids[]", assignment_id.to_string()),
        ];
        let records = self
            .fetcher
            .fetch_all(&format!("courses/{course_id}/students/submissions"), &params)
            .await?;

        Ok(without_empty_marker(records))
    }
}

fn enrollment_state_params() -> Vec<(&'static str, String)> {
    ENROLLMENT_STATES
        .iter()
        .map(|state| ("enrollment_state[]", state.to_string()))
        .collect()
}

/// An assignment without submissions comes back as a single error object.
fn without_empty_marker(records: Vec<Value>) -> Vec<Value> {
    let is_marker = records
        .first()
        .and_then(|first| first.get("error"))
        .and_then(Value::as_str)
        == Some(NO_SUBMISSIONS_ERROR);

    if is_marker { Vec::new() } else { records }
}
