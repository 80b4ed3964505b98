//! Delimited tables with a header row.
//!
//! Every table starts with a header row naming its columns; readers treat it
//! as metadata. Text is UTF-8 throughout and nulls are written as empty
//! fields.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::models::TableRecord;

/// Write typed records under their table's header row.
///
/// The header is written even when there are no rows.
pub fn write_records<T: TableRecord + Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    writer.write_record(T::HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a table into typed records, matching fields by header name.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommentRecord, RubricAssessmentRecord, SubmissionRecord};
    use tempfile::TempDir;

    fn submission(id: u64, body: &str) -> SubmissionRecord {
        SubmissionRecord {
            submission_id: id,
            user_name: "jdoe".to_string(),
            course_name: "Bio101".to_string(),
            course_start_at: Some("2026-01-12T08:00:00Z".to_string()),
            assignment_name: "Lab1".to_string(),
            assignment_description: "<p>Observe, \"record\", report</p>".to_string(),
            submitted_at: Some("2026-01-20T10:00:00Z".to_string()),
            submission_type: Some("online_text_entry".to_string()),
            submission_body: Some(body.to_string()),
            submission_url: None,
            media_file: None,
            media_type: None,
            media_url: None,
            submission_grade: Some("A-".to_string()),
        }
    }

    #[test]
    fn test_round_trip_multibyte_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Bio101/jdoe/submissions.csv");

        let body = "Résumé naïve façade 생물학 生物学 🧬";
        let rows = vec![
            submission(100, body),
            submission(101, "line one\nline two, with comma"),
        ];
        write_records(&path, &rows).unwrap();

        let loaded: Vec<SubmissionRecord> = read_records(&path).unwrap();
        assert_eq!(loaded, rows);
        assert_eq!(loaded[0].submission_body.as_deref(), Some(body));
        assert_eq!(loaded[0].submission_url, None);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(body));
    }

    #[test]
    fn test_header_written_without_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("comments.csv");

        write_records::<CommentRecord>(&path, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "submission_id,created_at,comment,user_name\n");
        assert!(read_records::<CommentRecord>(&path).unwrap().is_empty());
    }

    #[test]
    fn test_fields_follow_header_names() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rubric_assessments.csv");

        // Columns in a different order still land in the named fields.
        fs::write(
            &path,
            "rating,comments,points,description,submission_id\nExcellent,,5,Clarity,100\n",
        )
        .unwrap();

        let rows: Vec<RubricAssessmentRecord> = read_records(&path).unwrap();
        assert_eq!(
            rows,
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
    fn test_missing_table_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.csv");

        assert!(read_records::<CommentRecord>(&path).unwrap().is_empty());
    }
}
