// src/pipeline/pipeline.rs

use crate::error::Result;
use crate::logging::{self, RunLog};
use crate::models::Config;

use super::download::run_download;
use super::flatten::run_export;
use super::render::run_render;
use super::replay::run_replay;
use super::retrieve::run_retrieve;

/// Run every stage in order: retrieve, export, download, render, retry.
///
/// Both logs are cleared first, so an error log left behind means this run
/// had errors. With `skip_download`, neither downloads nor retries happen.
pub async fn run_pipeline(
    config: &Config,
    log: &RunLog,
    course_ids: &[u64],
    skip_download: bool,
) -> Result<()> {
    log.clear();
    logging::header("Archiving course artifacts");

    let total_steps = if skip_download { 3 } else { 5 };
    let mut current_step = 1;

    logging::step(current_step, total_steps, "Retrieve - Fetching LMS snapshot");
    log.status("Retrieve LMS JSON data");
    run_retrieve(config, log, course_ids).await?;
    current_step += 1;

    logging::step(current_step, total_steps, "Export - Writing student folders");
    log.status("Create student folders");
    run_export(config, log).await?;
    current_step += 1;

    if !skip_download {
        logging::step(current_step, total_steps, "Download - Fetching submission files");
        run_download(config, log).await?;
        current_step += 1;
    }

    logging::step(current_step, total_steps, "Render - Generating HTML");
    log.status("Generate HTML");
    run_render(config, log).await?;
    current_step += 1;

    if !skip_download {
        logging::step(current_step, total_steps, "Retry - Replaying failed downloads");
        run_replay(config, log).await?;
    }

    log.status("Archive complete");
    Ok(())
}
