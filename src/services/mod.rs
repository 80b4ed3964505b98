//! Service layer for the archiver.
//!
//! This module contains the network-facing logic:
//! - Paginated collection retrieval (`PageFetcher`)
//! - LMS endpoints used for snapshots (`LmsClient`)
//! - Resilient binary downloads (`Downloader`)

mod canvas;
pub mod downloader;
mod fetcher;

pub use canvas::LmsClient;
pub use downloader::{DownloadOutcome, Downloader};
pub use fetcher::PageFetcher;
