// src/pipeline/render.rs

//! Static HTML pages over an export tree.
//!
//! One top-level index linking every student folder, and one page per
//! student rendering their submissions with related comments, attachments
//! and rubric assessments inline.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::logging::{self, RunLog};
use crate::models::{
    AttachmentRecord, CommentRecord, Config, RubricAssessmentRecord, StudentExport,
    SubmissionRecord, TableRecord,
};
use crate::pipeline::flatten::EXPORT_TIMESTAMP_FILE;
use crate::storage::read_records;
use crate::utils::html::{encode_path, escape};
use crate::utils::path_component;

/// Page file written at the export root and in every student folder.
pub const INDEX_FILE: &str = "index.html";

/// Submission table columns, in display order.
const SUBMISSION_COLUMNS: [&str; 15] = [
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
    "media_recording",
    "attachments",
    "comments",
    "grade",
    "rubric_assessments",
];

/// CSV links in the student page footer.
const FOOTER_TABLES: [&str; 4] = [
    SubmissionRecord::FILE_NAME,
    CommentRecord::FILE_NAME,
    RubricAssessmentRecord::FILE_NAME,
    AttachmentRecord::FILE_NAME,
];

const STUDENT_STYLE: &str = "td { vertical-align: top; }
table, td, th { border: 1px solid gray; border-collapse: collapse; padding: 6px; }";

/// Render the index and every student page for the configured export tree.
pub async fn run_render(config: &Config, log: &RunLog) -> Result<usize> {
    logging::header("Generating HTML");

    let root = &config.paths.exports_dir;
    let timestamp = read_export_timestamp(root)?;

    render_index(root, &timestamp, log)?;
    let pages = render_student_pages(root, &timestamp, log)?;

    logging::summary(
        "HTML generated",
        &[
            ("Location", root.display().to_string()),
            ("Student pages", pages.to_string()),
        ],
    );
    Ok(pages)
}

/// Timestamp the export tree was built from.
pub fn read_export_timestamp(exports_root: &Path) -> Result<String> {
    let path = exports_root.join(EXPORT_TIMESTAMP_FILE);
    match fs::read_to_string(&path) {
        Ok(text) => Ok(text.lines().next().unwrap_or_default().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AppError::snapshot_missing(&path))
        }
        Err(e) => Err(e.into()),
    }
}

/// Write `index.html` at the export root listing every student folder.
pub fn render_index(exports_root: &Path, timestamp: &str, log: &RunLog) -> Result<PathBuf> {
    let mut html = page_start("Artifact Exports", ".studentlist { column-count: 5; }");
    html.push_str("<h1>Artifact Exports</h1>\n");
    html.push_str(&timestamp_paragraph(timestamp));

    for course in subdirs(exports_root)? {
        html.push_str(&format!("<h2>{}</h2>\n", escape(&course)));
        html.push_str("<div class=\"studentlist\"><ul>\n");
        for student in subdirs(&exports_root.join(&course))? {
            let link = format!("{course}/{student}/{INDEX_FILE}");
            html.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                escape(&encode_path(&link)),
                escape(&student)
            ));
        }
        html.push_str("</ul></div>\n");
    }
    html.push_str(PAGE_END);

    let path = exports_root.join(INDEX_FILE);
    log.status(&format!("Making {}", path.display()));
    fs::write(&path, html)?;
    Ok(path)
}

/// Write `index.html` into every student folder. Returns the page count.
pub fn render_student_pages(exports_root: &Path, timestamp: &str, log: &RunLog) -> Result<usize> {
    let mut pages = 0;

    for course in subdirs(exports_root)? {
        let course_dir = exports_root.join(&course);
        let students = subdirs(&course_dir)?;

        for (index, student) in students.iter().enumerate() {
            let student_dir = course_dir.join(student);
            let path = student_dir.join(INDEX_FILE);
            log.status(&format!("Making {}", path.display()));

            let html = student_page(&student_dir, student, index, &students, timestamp)?;
            fs::write(&path, html)?;
            pages += 1;
        }
    }

    Ok(pages)
}

fn student_page(
    student_dir: &Path,
    user_name: &str,
    index: usize,
    students: &[String],
    timestamp: &str,
) -> Result<String> {
    let submissions: Vec<SubmissionRecord> =
        read_records(&student_dir.join(SubmissionRecord::FILE_NAME))?;
    let comments: Vec<CommentRecord> = read_records(&student_dir.join(CommentRecord::FILE_NAME))?;
    let attachments: Vec<AttachmentRecord> =
        read_records(&student_dir.join(AttachmentRecord::FILE_NAME))?;
    let rubric: Vec<RubricAssessmentRecord> =
        read_records(&student_dir.join(RubricAssessmentRecord::FILE_NAME))?;

    let name = escape(user_name);
    let mut html = page_start(&format!("Export for {user_name}"), STUDENT_STYLE);
    html.push_str(&format!(
        "<h1>Export for <span style=\"font-style: italic\">{name}</span></h1>\n"
    ));
    html.push_str(&navigation(index, students));
    html.push_str(&timestamp_paragraph(timestamp));

    html.push_str("<table>\n<tr>");
    for column in SUBMISSION_COLUMNS {
        html.push_str(&format!("<th>{column}</th>"));
    }
    html.push_str("</tr>\n");

    for submission in &submissions {
        let id = submission.submission_id;
        html.push_str("<tr>");

        html.push_str(&text_cell(&id.to_string()));
        html.push_str(&text_cell(&submission.user_name));
        html.push_str(&text_cell(&submission.course_name));
        html.push_str(&text_cell(text(&submission.course_start_at)));
        html.push_str(&text_cell(&submission.assignment_name));
        // Descriptions are authored as HTML.
        html.push_str(&format!("<td>{}</td>", submission.assignment_description));
        html.push_str(&text_cell(text(&submission.submitted_at)));
        html.push_str(&text_cell(text(&submission.submission_type)));
        html.push_str(&text_cell(text(&submission.submission_body)));

        html.push_str(&link_cell(text(&submission.submission_url), "Online URL"));
        html.push_str(&link_cell(
            &local_href(text(&submission.media_file)),
            text(&submission.media_type),
        ));
        html.push_str(&attachments_cell(&StudentExport::related(&attachments, id)));
        html.push_str(&nested_table_cell(&StudentExport::related(&comments, id)));
        html.push_str(&text_cell(text(&submission.submission_grade)));
        html.push_str(&nested_table_cell(&StudentExport::related(&rubric, id)));

        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");

    let links: Vec<String> = FOOTER_TABLES
        .iter()
        .map(|file| format!("<a href=\"{file}\">{file}</a>"))
        .collect();
    html.push_str(&format!("<p>{}</p>\n", links.join(" | ")));
    html.push_str(PAGE_END);

    Ok(html)
}

/// Home, previous and next links for a student page.
fn navigation(index: usize, students: &[String]) -> String {
    let mut nav = format!("<a href=\"../../{INDEX_FILE}\">Artifact Exports</a>");
    if index > 0 {
        nav.push_str(&student_link(&students[index - 1], "Prev"));
    }
    if let Some(next) = students.get(index + 1) {
        nav.push_str(&student_link(next, "Next"));
    }
    nav.push('\n');
    nav
}

fn student_link(student: &str, label: &str) -> String {
    let href = encode_path(&format!("../{student}/{INDEX_FILE}"));
    format!(" | <a href=\"{}\">{label}</a>", escape(&href))
}

/// Attachment links for one submission: a thumbnail image when one was
/// downloaded, otherwise the display name.
fn attachments_cell(related: &[&AttachmentRecord]) -> String {
    if related.is_empty() {
        return text_cell("");
    }

    let mut cell = String::from("<td>");
    for attachment in related {
        let href = escape(&local_href(&attachment.file_name));
        cell.push_str("<div style=\"margin-bottom: 1em\">");
        match attachment.thumbnail_file.as_deref() {
            None | Some("") => cell.push_str(&format!(
                "<a href=\"{href}\">{}</a>",
                escape(&attachment.display_name)
            )),
            Some(thumbnail) => cell.push_str(&format!(
                "<a href=\"{href}\"><img src=\"{}\" alt=\"Attachment\"></a>",
                escape(&local_href(thumbnail))
            )),
        }
        cell.push_str("</div>");
    }
    cell.push_str("</td>");
    cell
}

/// A related table shown inside a submission cell.
trait NestedTable: TableRecord {
    /// Displayed columns; the submission id is implied by the row.
    const COLUMNS: &'static [&'static str];

    /// Field values in [`Self::COLUMNS`] order.
    fn cells(&self) -> Vec<&str>;
}

impl NestedTable for CommentRecord {
    const COLUMNS: &'static [&'static str] = &["created_at", "comment", "user_name"];

    fn cells(&self) -> Vec<&str> {
        vec![
            text(&self.created_at),
            self.comment.as_str(),
            self.user_name.as_str(),
        ]
    }
}

impl NestedTable for RubricAssessmentRecord {
    const COLUMNS: &'static [&'static str] = &["description", "points", "rating", "comments"];

    fn cells(&self) -> Vec<&str> {
        vec![
            self.description.as_str(),
            self.points.as_str(),
            self.rating.as_str(),
            self.comments.as_str(),
        ]
    }
}

fn nested_table_cell<T: NestedTable>(related: &[&T]) -> String {
    if related.is_empty() {
        return text_cell("");
    }

    let mut cell = String::from("<td><table>\n<tr>");
    for column in T::COLUMNS {
        cell.push_str(&format!("<th>{column}</th>"));
    }
    cell.push_str("</tr>\n");
    for row in related {
        cell.push_str("<tr>");
        for value in row.cells() {
            cell.push_str(&text_cell(value));
        }
        cell.push_str("</tr>\n");
    }
    cell.push_str("</table>\n</td>");
    cell
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

/// Relative link to a downloaded file, named the way the downloader saved it.
fn local_href(file_name: &str) -> String {
    if file_name.is_empty() {
        return String::new();
    }
    encode_path(&path_component(file_name))
}

fn text_cell(text: &str) -> String {
    format!("<td>{}</td>", escape(text))
}

/// A link cell, or an empty cell when there is nothing to link to.
fn link_cell(href: &str, label: &str) -> String {
    if href.is_empty() {
        text_cell("")
    } else {
        format!("<td><a href=\"{}\">{}</a></td>", escape(href), escape(label))
    }
}

fn timestamp_paragraph(timestamp: &str) -> String {
    format!("<p>Data exported at {}</p>\n", escape(timestamp))
}

fn page_start(title: &str, style: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}\n</style>\n</head>\n<body>\n",
        escape(title),
        style
    )
}

const PAGE_END: &str = "</body>\n</html>\n";

/// Sorted names of the directories directly under `dir`.
fn subdirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
