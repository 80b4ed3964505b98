// src/pipeline/flatten.rs

//! Relational flattening of a snapshot into per-student tables.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::logging::{self, RunLog};
use crate::models::{
    Assignment, AttachmentRecord, Comment, CommentRecord, Config, Course, RubricAssessmentRecord,
    StudentExport, Submission, SubmissionRecord, SubmissionType, TableRecord, User, UserId,
};
use crate::storage::{LocalSnapshotStore, SnapshotKind, SnapshotStore, load_as, write_records};
use crate::utils::{path_component, thumbnail_file_name};

/// Copy of the snapshot timestamp inside the export tree.
pub const EXPORT_TIMESTAMP_FILE: &str = "timestamp.txt";

/// Flattened rows for one course, grouped by student.
#[derive(Debug, Clone, Default)]
pub struct CourseExport {
    pub course_name: String,
    pub students: BTreeMap<UserId, StudentExport>,
}

/// Counts of what an export wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub courses: usize,
    pub students: usize,
    pub submissions: usize,
}

/// Flatten one course's snapshot into per-student rows.
///
/// Students without a user name get no folder. A submission is kept only when
/// its submitter is both in the user roster and among those students;
/// anything else is skipped with a status line.
pub fn flatten(
    course: &Course,
    users: &[User],
    students: &[User],
    assignments: &[(Assignment, Vec<Submission>)],
    log: &RunLog,
) -> CourseExport {
    let user_lookup: HashMap<UserId, &User> = users.iter().map(|u| (u.id, u)).collect();

    let mut accumulator: BTreeMap<UserId, StudentExport> = students
        .iter()
        .filter_map(|student| {
            student
                .user_name()
                .map(|name| (student.id, StudentExport::new(name)))
        })
        .collect();

    for (assignment, submissions) in assignments {
        let description = assignment.description.clone().unwrap_or_default();

        for submission in submissions {
            let submitter = submission.user_id;
            let (Some(user), Some(student)) =
                (user_lookup.get(&submitter), accumulator.get_mut(&submitter))
            else {
                log.status(&format!(
                    "Skipped submission for course {}, assignment {}, submission {}, user {}",
                    course.id, assignment.id, submission.id, submitter
                ));
                continue;
            };

            let user_name = user.user_name().unwrap_or_else(|| student.user_name.clone());
            student
                .submissions
                .push(submission_record(course, assignment, &description, submission, user_name));

            for comment in &submission.submission_comments {
                let author = comment_author(course, assignment, comment, &user_lookup, log);
                student.comments.push(CommentRecord {
                    submission_id: submission.id,
                    created_at: comment.created_at.clone(),
                    comment: comment.comment.clone(),
                    user_name: author,
                });
            }

            for attachment in &submission.attachments {
                let thumbnail_url = attachment
                    .thumbnail_url
                    .clone()
                    .filter(|url| !url.is_empty());
                student.attachments.push(AttachmentRecord {
                    submission_id: submission.id,
                    url: attachment.url.clone(),
                    file_name: attachment.filename.clone(),
                    display_name: attachment.display_name.clone(),
                    thumbnail_file: thumbnail_url.as_deref().map(thumbnail_file_name),
                    thumbnail_url,
                });
            }

            student
                .rubric_assessments
                .extend(rubric_rows(course, assignment, submission, log));
        }
    }

    CourseExport {
        course_name: course.name.clone(),
        students: accumulator,
    }
}

fn submission_record(
    course: &Course,
    assignment: &Assignment,
    description: &str,
    submission: &Submission,
    user_name: String,
) -> SubmissionRecord {
    let media = match submission.kind() {
        Some(SubmissionType::MediaRecording) => submission.media_comment.as_ref(),
        _ => None,
    };

    SubmissionRecord {
        submission_id: submission.id,
        user_name,
        course_name: course.name.clone(),
        course_start_at: course.start_at.clone(),
        assignment_name: assignment.name.clone(),
        assignment_description: description.to_string(),
        submitted_at: submission.submitted_at.clone(),
        submission_type: submission.submission_type.clone(),
        submission_body: submission.body.clone(),
        submission_url: submission.url.clone(),
        media_file: media.map(|m| format!("{}.mp4", m.media_id)),
        media_type: media.and_then(|m| m.media_type.clone()),
        media_url: media.and_then(|m| m.url.clone()),
        submission_grade: submission.grade.clone(),
    }
}

/// User name of a comment's author.
///
/// Authors who left the course are missing from the roster; their embedded
/// display name is used instead and the fallback is reported.
fn comment_author(
    course: &Course,
    assignment: &Assignment,
    comment: &Comment,
    user_lookup: &HashMap<UserId, &User>,
    log: &RunLog,
) -> String {
    let display_name = comment.author.display_name.clone().unwrap_or_default();

    match comment.author_id.and_then(|id| user_lookup.get(&id)) {
        Some(user) => user.user_name().unwrap_or(display_name),
        None => {
            let author_id = comment
                .author_id
                .map(|id| id.to_string())
                .unwrap_or_default();
            log.warn(&format!(
                "Encountered submission comment in course {} ({}), assignment {} ({}), submitted by user {} ({}) who is not enrolled in the course",
                course.name, course.id, assignment.name, assignment.id, display_name, author_id
            ));
            display_name
        }
    }
}

/// One row per assessed criterion that has points, in criterion id order.
fn rubric_rows(
    course: &Course,
    assignment: &Assignment,
    submission: &Submission,
    log: &RunLog,
) -> Vec<RubricAssessmentRecord> {
    let Some(assessment) = &submission.rubric_assessment else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for (criterion_id, entry) in assessment {
        let Some(points) = &entry.points else {
            continue;
        };

        let criterion = assignment.criterion(criterion_id);
        if criterion.is_none() {
            log.warn(&format!(
                "Rubric criterion {} not found in course {}, assignment {}, submission {}",
                criterion_id, course.id, assignment.id, submission.id
            ));
        }

        rows.push(RubricAssessmentRecord {
            submission_id: submission.id,
            description: criterion.map(|c| c.description.clone()).unwrap_or_default(),
            points: points.to_string(),
            rating: criterion
                .zip(points.as_f64())
                .and_then(|(c, p)| c.rating_for(p))
                .map(|r| r.description.clone())
                .unwrap_or_default(),
            comments: entry.comments.clone().unwrap_or_default(),
        });
    }
    rows
}

/// Write a course's tables under `<exports>/<course>/<student>/`.
///
/// Every student folder gets all four tables, header-only when empty.
pub fn write_course_export(
    exports_root: &Path,
    export: &CourseExport,
    log: &RunLog,
) -> Result<Vec<PathBuf>> {
    let course_dir = exports_root.join(path_component(&export.course_name));
    let mut folders = Vec::with_capacity(export.students.len());

    for student in export.students.values() {
        let student_dir = course_dir.join(path_component(&student.user_name));
        std::fs::create_dir_all(&student_dir)?;

        write_table_file(&student_dir, &student.submissions, log)?;
        write_table_file(&student_dir, &student.comments, log)?;
        write_table_file(&student_dir, &student.attachments, log)?;
        write_table_file(&student_dir, &student.rubric_assessments, log)?;

        folders.push(student_dir);
    }

    Ok(folders)
}

fn write_table_file<T: TableRecord + serde::Serialize>(
    dir: &Path,
    rows: &[T],
    log: &RunLog,
) -> Result<()> {
    let path = dir.join(T::FILE_NAME);
    log.status(&format!("Writing {}", path.display()));
    write_records(&path, rows)
}

/// Export the configured snapshot into the configured export tree.
pub async fn run_export(config: &Config, log: &RunLog) -> Result<ExportSummary> {
    logging::header("Exporting student folders");

    let store = LocalSnapshotStore::new(&config.paths.json_dir);
    let summary = export_snapshot(&store, &config.paths.exports_dir, log).await?;

    logging::summary(
        "Export complete",
        &[
            ("Location", config.paths.exports_dir.display().to_string()),
            ("Courses", summary.courses.to_string()),
            ("Student folders", summary.students.to_string()),
            ("Submissions", summary.submissions.to_string()),
        ],
    );
    Ok(summary)
}

/// Flatten every course in the snapshot and write its student folders.
///
/// A missing snapshot file is fatal.
pub async fn export_snapshot(
    store: &dyn SnapshotStore,
    exports_root: &Path,
    log: &RunLog,
) -> Result<ExportSummary> {
    tokio::fs::create_dir_all(exports_root).await?;
    let timestamp = store.read_timestamp().await?;
    tokio::fs::write(exports_root.join(EXPORT_TIMESTAMP_FILE), &timestamp).await?;

    let courses: Vec<Course> = load_as(store, SnapshotKind::Courses, None).await?;
    let mut summary = ExportSummary::default();

    for course in &courses {
        let users: Vec<User> = load_as(store, SnapshotKind::Users, Some(course.id)).await?;
        let students: Vec<User> = load_as(store, SnapshotKind::Students, Some(course.id)).await?;
        let assignments: Vec<Assignment> =
            load_as(store, SnapshotKind::Assignments, Some(course.id)).await?;

        let mut with_submissions = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let submissions: Vec<Submission> =
                load_as(store, SnapshotKind::Submissions, Some(assignment.id)).await?;
            with_submissions.push((assignment, submissions));
        }

        let export = flatten(course, &users, &students, &with_submissions, log);
        summary.submissions += export
            .students
            .values()
            .map(|s| s.submissions.len())
            .sum::<usize>();

        let folders = write_course_export(exports_root, &export, log)?;
        summary.students += folders.len();
        summary.courses += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::read_records;
    use serde_json::json;
    use tempfile::TempDir;

    fn run_log(tmp: &TempDir) -> RunLog {
        RunLog::new(tmp.path().join("log.txt"), tmp.path().join("err.txt"))
    }

    fn course() -> Course {
        serde_json::from_value(json!({
            "id": 5,
            "name": "Bio101",
            "course_code": "BIO-101",
            "start_at": "2016-08-29T07:00:00Z"
        }))
        .unwrap()
    }

    fn roster() -> Vec<User> {
        serde_json::from_value(json!([
            {"id": 7, "login_id": "jdoe@example.edu", "name": "Jane Doe"},
            {"id": 8, "login_id": "msmith@example.edu", "name": "Mo Smith"},
            {"id": 9, "login_id": "prof@example.edu", "name": "Prof"},
            {"id": 12, "name": "Pending Student"}
        ]))
        .unwrap()
    }

    fn students() -> Vec<User> {
        roster()
            .into_iter()
            .filter(|u| u.id != UserId(9))
            .collect()
    }

    fn assignment() -> Assignment {
        serde_json::from_value(json!({
            "id": 10,
            "name": "Lab",
            "description": null,
            "rubric": [
                {"id": "c1", "description": "Clarity", "ratings": [
                    {"points": 5, "description": "Excellent"},
                    {"points": 3, "description": "Fair"}
                ]},
                {"id": "c2", "description": "Depth", "ratings": [
                    {"points": 4, "description": "Good"}
                ]}
            ]
        }))
        .unwrap()
    }

    fn submissions() -> Vec<Submission> {
        serde_json::from_value(json!([
            {
                "id": 100,
                "user_id": 7,
                "submission_type": "online_upload",
                "submitted_at": "2016-09-01T10:00:00Z",
                "grade": "A",
                "attachments": [
                    {"url": "http://lms/files/1", "filename": "lab.pdf", "display_name": "Lab.pdf",
                     "thumbnail_url": "http://lms/thumbs/shared"}
                ],
                "submission_comments": [
                    {"created_at": "2016-09-02T10:00:00Z", "comment": "Nice", "author_id": 9,
                     "author": {"display_name": "Prof"}},
                    {"created_at": "2016-09-03T10:00:00Z", "comment": "Agreed", "author_id": 44,
                     "author": {"display_name": "Dropped TA"}}
                ],
                "rubric_assessment": {
                    "c1": {"points": 5, "comments": null},
                    "c2": {"comments": "no points given"}
                }
            },
            {
                "id": 101,
                "user_id": 8,
                "submission_type": "media_recording",
                "grade": 92,
                "media_comment": {"media_id": "m-42", "media_type": "video", "url": "http://lms/media/42"},
                "attachments": [
                    {"url": "http://lms/files/2", "filename": "clip.mov", "display_name": "clip.mov",
                     "thumbnail_url": "http://lms/thumbs/shared"}
                ]
            },
            {"id": 102, "user_id": 31337, "submission_type": "online_text_entry", "body": "test student"},
            {"id": 103, "user_id": 12, "submission_type": "online_text_entry", "body": "pending"}
        ]))
        .unwrap()
    }

    fn flattened(tmp: &TempDir) -> CourseExport {
        flatten(
            &course(),
            &roster(),
            &students(),
            &[(assignment(), submissions())],
            &run_log(tmp),
        )
    }

    #[test]
    fn test_students_without_user_name_get_no_folder() {
        let tmp = TempDir::new().unwrap();
        let export = flattened(&tmp);

        let names: Vec<&str> = export
            .students
            .values()
            .map(|s| s.user_name.as_str())
            .collect();
        assert_eq!(names, vec!["jdoe", "msmith"]);
    }

    #[test]
    fn test_unresolved_submitters_are_skipped_once() {
        let tmp = TempDir::new().unwrap();
        let export = flattened(&tmp);

        let total: usize = export.students.values().map(|s| s.submissions.len()).sum();
        assert_eq!(total, 2);

        let status = std::fs::read_to_string(tmp.path().join("log.txt")).unwrap();
        let skip_102 = "Skipped submission for course 5, assignment 10, submission 102, user 31337";
        let skip_103 = "Skipped submission for course 5, assignment 10, submission 103, user 12";
        assert_eq!(status.matches(skip_102).count(), 1);
        assert_eq!(status.matches(skip_103).count(), 1);
    }

    #[test]
    fn test_rubric_row_resolves_description_and_rating() {
        let tmp = TempDir::new().unwrap();
        let export = flattened(&tmp);
        let jdoe = &export.students[&UserId(7)];

        assert_eq!(
            jdoe.rubric_assessments,
            vec![RubricAssessmentRecord {
                submission_id: 100,
                description: "Clarity".to_string(),
                points: "5".to_string(),
                rating: "Excellent".to_string(),
                comments: String::new(),
            }]
        );
    }

    #[test]
    fn test_comment_author_fallback_is_reported() {
        let tmp = TempDir::new().unwrap();
        let export = flattened(&tmp);
        let jdoe = &export.students[&UserId(7)];

        let authors: Vec<&str> = jdoe.comments.iter().map(|c| c.user_name.as_str()).collect();
        assert_eq!(authors, vec!["prof", "Dropped TA"]);

        let errors = std::fs::read_to_string(tmp.path().join("err.txt")).unwrap();
        assert!(errors.contains("submitted by user Dropped TA (44) who is not enrolled"));
    }

    #[test]
    fn test_shared_thumbnail_url_gives_same_file_name() {
        let tmp = TempDir::new().unwrap();
        let export = flattened(&tmp);

        let first = &export.students[&UserId(7)].attachments[0];
        let second = &export.students[&UserId(8)].attachments[0];
        assert_ne!(first.submission_id, second.submission_id);
        assert!(first.thumbnail_file.is_some());
        assert_eq!(first.thumbnail_file, second.thumbnail_file);
    }

    #[test]
    fn test_media_fields_only_for_media_recordings() {
        let tmp = TempDir::new().unwrap();
        let export = flattened(&tmp);

        let upload = &export.students[&UserId(7)].submissions[0];
        assert_eq!(upload.media_file, None);
        assert_eq!(upload.media_url, None);
        assert_eq!(upload.assignment_description, "");
        assert_eq!(upload.submission_grade.as_deref(), Some("A"));

        let media = &export.students[&UserId(8)].submissions[0];
        assert_eq!(media.media_file.as_deref(), Some("m-42.mp4"));
        assert_eq!(media.media_type.as_deref(), Some("video"));
        assert_eq!(media.media_url.as_deref(), Some("http://lms/media/42"));
        assert_eq!(media.submission_grade.as_deref(), Some("92"));
    }

    #[test]
    fn test_media_recording_without_media_comment() {
        let tmp = TempDir::new().unwrap();
        let subs: Vec<Submission> = serde_json::from_value(json!([
            {"id": 200, "user_id": 7, "submission_type": "media_recording"}
        ]))
        .unwrap();

        let export = flatten(
            &course(),
            &roster(),
            &students(),
            &[(assignment(), subs)],
            &run_log(&tmp),
        );
        let row = &export.students[&UserId(7)].submissions[0];
        assert_eq!(row.submission_type.as_deref(), Some("media_recording"));
        assert_eq!(row.media_file, None);
    }

    #[test]
    fn test_write_course_export_layout() {
        let tmp = TempDir::new().unwrap();
        let export = flattened(&tmp);
        let root = tmp.path().join("exports");

        let folders = write_course_export(&root, &export, &run_log(&tmp)).unwrap();
        assert_eq!(folders.len(), 2);

        let jdoe = root.join("Bio101/jdoe");
        for file in [
            "submissions.csv",
            "comments.csv",
            "attachments.csv",
            "rubric_assessments.csv",
        ] {
            assert!(jdoe.join(file).is_file(), "missing {file}");
        }

        let comments = std::fs::read_to_string(root.join("Bio101/msmith/comments.csv")).unwrap();
        assert_eq!(comments, "submission_id,created_at,comment,user_name\n");

        let submissions: Vec<SubmissionRecord> =
            read_records(&jdoe.join("submissions.csv")).unwrap();
        assert_eq!(submissions[0].submission_id, 100);
        assert_eq!(submissions[0].course_start_at.as_deref(), Some("2016-08-29T07:00:00Z"));
        assert_eq!(submissions[0].media_file, None);
    }

    #[test]
    fn test_rubric_points_keep_source_number_text() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("exports");
        write_course_export(&root, &flattened(&tmp), &run_log(&tmp)).unwrap();

        let rubric =
            std::fs::read_to_string(root.join("Bio101/jdoe/rubric_assessments.csv")).unwrap();
        assert_eq!(
            rubric,
            "submission_id,description,points,rating,comments\n100,Clarity,5,Excellent,\n"
        );

        // Fractional points still resolve their rating.
        let subs: Vec<Submission> = serde_json::from_value(json!([
            {"id": 300, "user_id": 7, "submission_type": "online_upload",
             "rubric_assessment": {"c1": {"points": 2.5, "comments": "half"}}}
        ]))
        .unwrap();
        let mut graded = assignment();
        graded.rubric[0].ratings[1].points = 2.5;
        let export = flatten(
            &course(),
            &roster(),
            &students(),
            &[(graded, subs)],
            &run_log(&tmp),
        );
        let row = &export.students[&UserId(7)].rubric_assessments[0];
        assert_eq!(row.points, "2.5");
        assert_eq!(row.rating, "Fair");
        assert_eq!(row.comments, "half");
    }

    #[tokio::test]
    async fn test_export_snapshot_from_store() {
        let tmp = TempDir::new().unwrap();
        let store = LocalSnapshotStore::new(tmp.path().join("json"));
        let root = tmp.path().join("exports");

        store.write_timestamp("09/04/2017 12:45PM").await.unwrap();
        store
            .save(SnapshotKind::Courses, None, &json!([{"id": 5, "name": "Term 1/2 Bio"}]))
            .await
            .unwrap();
        let roster = json!([{"id": 7, "login_id": "jdoe@example.edu"}]);
        store.save(SnapshotKind::Users, Some(5), &roster).await.unwrap();
        store.save(SnapshotKind::Students, Some(5), &roster).await.unwrap();
        store
            .save(SnapshotKind::Assignments, Some(5), &json!([{"id": 10, "name": "Lab"}]))
            .await
            .unwrap();
        store
            .save(
                SnapshotKind::Submissions,
                Some(10),
                &json!([{"id": 100, "user_id": 7, "submission_type": "online_url", "url": "http://x"}]),
            )
            .await
            .unwrap();

        let summary = export_snapshot(&store, &root, &run_log(&tmp)).await.unwrap();
        assert_eq!(
            summary,
            ExportSummary {
                courses: 1,
                students: 1,
                submissions: 1
            }
        );
        assert_eq!(
            std::fs::read_to_string(root.join(EXPORT_TIMESTAMP_FILE)).unwrap(),
            "09/04/2017 12:45PM"
        );
        assert!(root.join("Term 1_2 Bio/jdoe/submissions.csv").is_file());
    }

    #[tokio::test]
    async fn test_export_fails_on_missing_snapshot() {
        let tmp = TempDir::new().unwrap();
        let store = LocalSnapshotStore::new(tmp.path().join("json"));
        store.write_timestamp("09/04/2017 12:45PM").await.unwrap();
        store
            .save(SnapshotKind::Courses, None, &json!([{"id": 5, "name": "Bio101"}]))
            .await
            .unwrap();

        let result = export_snapshot(&store, &tmp.path().join("exports"), &run_log(&tmp)).await;
        assert!(matches!(result, Err(crate::error::AppError::SnapshotMissing { .. })));
    }
}
