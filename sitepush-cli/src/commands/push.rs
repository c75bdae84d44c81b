//! `sitepush`: upload new and changed files from the build directory.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use sitepush_sync::{pipeline, report, FileOutcome, RunOptions, SyncReport};

use super::{runtime, target::TargetArgs};
use crate::EXIT_PARTIAL_FAILURE;

/// Upper bound for `--retries`.
const MAX_RETRIES: i64 = 10;

/// Arguments for a push (the default command).
#[derive(Args, Debug)]
pub struct PushArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Directory holding the built site (overrides the config file).
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Show what would be uploaded without uploading anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Upload everything if the remote listing fails instead of aborting.
    #[arg(long)]
    pub fail_open: bool,

    /// Maximum number of files hashed and uploaded at once.
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..=256))]
    pub concurrency: u32,

    /// Extra attempts for a failed upload (exponential backoff).
    #[arg(
        long,
        default_value_t = 0,
        value_parser = clap::value_parser!(u32).range(0..=MAX_RETRIES)
    )]
    pub retries: u32,

    /// Write the run report as JSON to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print the run report as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

impl PushArgs {
    pub fn run(self) -> Result<ExitCode> {
        let mut config = self.target.load()?;
        if let Some(dir) = &self.build_dir {
            config.build_dir = dir.clone();
        }
        tracing::debug!(build_dir = %config.build_dir.display(), "build directory");
        let options = RunOptions {
            dry_run: self.dry_run,
            fail_open: self.fail_open,
            concurrency: self.concurrency as usize,
            max_retries: self.retries,
            ..RunOptions::default()
        };

        let result = runtime()?
            .block_on(pipeline::push(&config, &options, self.target.timeout()))
            .with_context(|| format!("push to s3://{}/{} failed", config.bucket, config.prefix))?;

        if let Some(path) = &self.report {
            report::save_at(path, &result)
                .with_context(|| format!("failed to write report {}", path.display()))?;
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_report(&result);
        }

        Ok(if result.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(EXIT_PARTIAL_FAILURE)
        })
    }
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let target = if report.prefix.is_empty() {
        format!("s3://{}", report.bucket)
    } else {
        format!("s3://{}/{}", report.bucket, report.prefix)
    };

    if report.inventory_degraded {
        println!(
            "{}",
            "! remote listing failed; every file was treated as new".yellow()
        );
    }

    for outcome in &report.outcomes {
        match outcome {
            FileOutcome::Uploaded { key, .. } => println!("  {}  {key}", "↑".green()),
            FileOutcome::WouldUpload { key, .. } => println!("  {}  {key}", "~".cyan()),
            FileOutcome::Unchanged { .. } => {}
            FileOutcome::Failed { key, path, error } => {
                let label = key
                    .as_ref()
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| path.display().to_string());
                println!("  {}  {label}: {error}", "✗".red());
            }
        }
    }

    let summary = format!(
        "{prefix}{target}: {} uploaded ({} bytes), {} would upload, {} unchanged, {} failed",
        report.uploaded(),
        report.uploaded_bytes(),
        report.would_upload(),
        report.unchanged(),
        report.failed(),
    );
    if report.is_success() {
        println!("{} {summary}", "✓".green());
    } else {
        println!("{} {summary}", "✗".red());
    }
}
