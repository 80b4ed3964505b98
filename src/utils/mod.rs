//! Utility functions and helpers.

pub mod html;
pub mod http;

use sha2::{Digest, Sha256};

/// Made-up file name for an attachment's thumbnail image.
///
/// The LMS exposes neither a name nor a content type for thumbnails, so the
/// name is derived from the thumbnail URL and assumed to be PNG. The same URL
/// always maps to the same name, so attachments sharing a thumbnail URL share
/// the file.
pub fn thumbnail_file_name(thumbnail_url: &str) -> String {
    let digest = Sha256::digest(thumbnail_url.as_bytes());
    format!("thumb{}.png", &hex::encode(digest)[..16])
}

/// Make a name from the LMS usable as a single path component.
///
/// Course, user and file names all pass through here before they are joined
/// onto a local directory, so none of them can leave it.
pub fn path_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
