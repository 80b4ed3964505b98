//! Course artifact archiver CLI
//!
//! Local execution entry point. Each subcommand runs one stage against the
//! configured snapshot and export directories.

use std::path::PathBuf;

use archiver::{
    error::Result,
    logging::RunLog,
    models::Config,
    pipeline,
    storage::{LocalSnapshotStore, SnapshotStore},
};
use clap::{Parser, Subcommand};

/// Archive LMS course submissions into browsable per-student folders
#[derive(Parser, Debug)]
#[command(
    name = "archiver",
    version,
    about = "Course submission archiver"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Snapshot courses, rosters, assignments and submissions as JSON
    Retrieve {
        /// Only keep these course ids
        #[arg(long = "course")]
        courses: Vec<u64>,
    },

    /// Flatten the snapshot into per-student CSV tables
    Export,

    /// Download attachments, thumbnails and media recordings
    Download,

    /// Retry downloads recorded as failed in the error log
    Retry,

    /// Generate the HTML index and student pages
    Render,

    /// Run everything: Retrieve → Export → Download → Render → Retry
    Run {
        /// Skip downloads and retries
        #[arg(long)]
        skip_download: bool,

        /// Only keep these course ids
        #[arg(long = "course")]
        courses: Vec<u64>,
    },

    /// Validate configuration
    Validate,

    /// Show current snapshot info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);
    init_logging(cli.verbose, &config.logging.level);

    log::info!("Loaded configuration from {}", cli.config.display());

    let log = RunLog::from_config(&config.paths);

    match cli.command {
        Command::Retrieve { courses } => {
            config.validate()?;
            log.clear();
            pipeline::run_retrieve(&config, &log, &courses).await?;
        }

        Command::Export => {
            log.clear();
            pipeline::run_export(&config, &log).await?;
        }

        Command::Download => {
            config.validate()?;
            log.clear();
            pipeline::run_download(&config, &log).await?;
        }

        // The error log is the retry queue, so it is not cleared here.
        Command::Retry => {
            config.validate()?;
            pipeline::run_replay(&config, &log).await?;
        }

        Command::Render => {
            log.clear();
            pipeline::run_render(&config, &log).await?;
        }

        Command::Run {
            skip_download,
            courses,
        } => {
            config.validate()?;
            pipeline::run_pipeline(&config, &log, &courses, skip_download).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            if config.api.access_token.is_empty() {
                log::warn!(
                    "No access token configured; set api.access_token or {}",
                    archiver::models::ACCESS_TOKEN_ENV
                );
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("API: {}", config.api.base_url);
            log::info!("Snapshot directory: {}", config.paths.json_dir.display());
            log::info!("Export directory: {}", config.paths.exports_dir.display());

            let store = LocalSnapshotStore::new(&config.paths.json_dir);
            match store.read_timestamp().await {
                Ok(timestamp) => log::info!("Snapshot taken: {}", timestamp),
                Err(_) => log::info!("No snapshot found yet."),
            }

            log::info!(
                "Error log: {}",
                if log.error_path().exists() {
                    "present, the last run had errors"
                } else {
                    "clean"
                }
            );
        }
    }

    log::info!("Done!");

    Ok(())
}
