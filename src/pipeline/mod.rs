//! Pipeline entry points for archiver operations.
//!
//! - `run_retrieve`: Snapshot every course collection from the LMS
//! - `run_export`: Flatten snapshots into per-student tables
//! - `run_download`: Fetch attachments, thumbnails and media recordings
//! - `run_render`: Generate the static HTML pages
//! - `run_replay`: Retry downloads that failed earlier
//! - `run_pipeline`: All of the above, in order

pub mod download;
pub mod flatten;
#[allow(clippy::module_inception)]
mod pipeline;
pub mod render;
pub mod replay;
pub mod retrieve;

pub use download::run_download;
pub use flatten::run_export;
pub use pipeline::run_pipeline;
pub use render::run_render;
pub use replay::run_replay;
pub use retrieve::run_retrieve;
