// src/pipeline/retrieve.rs

//! Snapshot retrieval.
//!
//! Pulls every collection the export needs from the LMS and stores each one
//! as a JSON snapshot, so later stages never touch the API.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::logging::{self, RunLog};
use crate::models::Config;
use crate::services::{LmsClient, PageFetcher};
use crate::storage::{LocalSnapshotStore, SnapshotKind, SnapshotStore, run_timestamp_now};

/// Counts of what a retrieval stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrieveSummary {
    pub timestamp: String,
    pub courses: usize,
    pub assignments: usize,
    pub submissions: usize,
}

/// Retrieve a fresh snapshot into the configured JSON directory.
///
/// With `course_ids` non-empty, only those courses are kept.
pub async fn run_retrieve(
    config: &Config,
    log: &RunLog,
    course_ids: &[u64],
) -> Result<RetrieveSummary> {
    logging::header("Retrieving LMS snapshot");

    let fetcher = PageFetcher::new(&config.api, log.clone())?;
    let client = LmsClient::new(fetcher, config.api.account_id);
    let store = LocalSnapshotStore::new(&config.paths.json_dir);

    let summary = retrieve_snapshot(&client, &store, log, course_ids).await?;

    logging::summary(
        "Snapshot stored",
        &[
            ("Location", config.paths.json_dir.display().to_string()),
            ("Courses", summary.courses.to_string()),
            ("Assignments", summary.assignments.to_string()),
            ("Submissions", summary.submissions.to_string()),
            ("Time stamp", summary.timestamp.clone()),
        ],
    );

    Ok(summary)
}

/// Fetch and store courses, rosters, assignments and submissions.
///
/// The run timestamp is written first. Any API failure aborts the whole
/// retrieval; snapshots already written stay on disk.
pub async fn retrieve_snapshot(
    client: &LmsClient,
    store: &dyn SnapshotStore,
    log: &RunLog,
    course_ids: &[u64],
) -> Result<RetrieveSummary> {
    let timestamp = run_timestamp_now();
    store.write_timestamp(&timestamp).await?;

    let mut courses = client.courses().await?;
    if !course_ids.is_empty() {
        courses.retain(|course| {
            record_id(course)
                .map(|id| course_ids.contains(&id))
                .unwrap_or(false)
        });
    }
    save(store, log, SnapshotKind::Courses, None, courses.clone(), "courses").await?;
    log.status(&format!("Course count: {}", courses.len()));

    let mut summary = RetrieveSummary {
        timestamp,
        courses: courses.len(),
        ..RetrieveSummary::default()
    };

    for course in &courses {
        let course_id = record_id(course)?;

        let students = client.course_students(course_id).await?;
        log.status(&format!(
            "Student count for course {}: {}",
            course_id,
            students.len()
        ));
        save(
            store,
            log,
            SnapshotKind::Students,
            Some(course_id),
            students,
            "course students",
        )
        .await?;

        let users = client.course_users(course_id).await?;
        log.status(&format!(
            "User count for course {}: {}",
            course_id,
            users.len()
        ));
        save(store, log, SnapshotKind::Users, Some(course_id), users, "course users").await?;

        let assignments = client.assignments(course_id).await?;
        log.status(&format!(
            "Assignment count for course {}: {}",
            course_id,
            assignments.len()
        ));
        save(
            store,
            log,
            SnapshotKind::Assignments,
            Some(course_id),
            assignments.clone(),
            "course assignments",
        )
        .await?;

        for assignment in &assignments {
            let assignment_id = record_id(assignment)?;
            let submissions = client.submissions(course_id, assignment_id).await?;
            log.status(&format!(
                "Submission count for assignment {}: {}",
                assignment_id,
                submissions.len()
            ));
            summary.submissions += submissions.len();
            save(
                store,
                log,
                SnapshotKind::Submissions,
                Some(assignment_id),
                submissions,
                "assignment submissions",
            )
            .await?;
        }
        summary.assignments += assignments.len();
    }

    log.status(&format!("Time stamp: {}", summary.timestamp));
    Ok(summary)
}

async fn save(
    store: &dyn SnapshotStore,
    log: &RunLog,
    kind: SnapshotKind,
    id: Option<u64>,
    records: Vec<Value>,
    description: &str,
) -> Result<()> {
    log.status(&format!(
        "Storing {} JSON to {}",
        description,
        kind.file_name(id)
    ));
    store.save(kind, id, &Value::Array(records)).await
}

/// Numeric `id` of an API record.
fn record_id(record: &Value) -> Result<u64> {
    record
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| AppError::validation(format!("record without a numeric id: {record}")))
}
