//! sitepush: incremental static-site upload to an S3 bucket.
//!
//! # Usage
//!
//! ```text
//! sitepush                       push ./build using ./.awscredentials
//! sitepush [push] [--credentials <file> | --config <file>] [--build-dir <dir>]
//!          [--dry-run] [--fail-open] [--concurrency <n>] [--retries <n>]
//!          [--timeout <secs>] [--report <file>] [--json]
//! sitepush inventory [--credentials <file> | --config <file>] [--json]
//! ```
//!
//! # Exit status
//!
//! - `0` every file uploaded or unchanged
//! - `1` run aborted (configuration, build directory, inventory)
//! - `2` command-line usage error
//! - `3` run completed but at least one file failed

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{inventory::InventoryArgs, push::PushArgs};

/// Exit status when the run finished but some files failed.
pub const EXIT_PARTIAL_FAILURE: u8 = 3;

/// Exit status when the run could not complete.
pub const EXIT_ABORTED: u8 = 1;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "sitepush",
    version,
    about = "Upload new and changed files from a static site build to S3",
    long_about = None,
    args_conflicts_with_subcommands = true,
)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    push: PushArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload new and changed files (the default when no command is given).
    Push(PushArgs),
    /// List remote keys and entity tags under the configured prefix.
    Inventory(InventoryArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<ExitCode> = match cli.command {
        Some(Commands::Push(args)) => args.run(),
        Some(Commands::Inventory(args)) => args.run().map(|()| ExitCode::SUCCESS),
        None => cli.push.run(),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_ABORTED)
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
