//! Command-line interface definition.
//!
//! All argument parsing lives here so the rest of the codebase can stay
//! agnostic to `clap`.  The `Cli` struct is parsed once in `main` and passed
//! by reference into the orchestrator.

use std::path::PathBuf;

use clap::Parser;

/// `blue-backup [--first-time] [--dry-run] [--verbose] <config>`
///
/// Exit codes: 0 on success, 1 on any run failure, 2 on argument errors.
#[derive(Parser, Debug)]
#[command(
    name = "blue-backup",
    about = "Incremental snapshot backups driven by a TOML config and rsync",
    version
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    pub config: PathBuf,

    /// Back up into a target that has no snapshots yet.
    ///
    /// Protects against typos in `target-location`: without this flag an
    /// empty target is treated as a mistake, with it a populated target is.
    #[arg(long)]
    pub first_time: bool,

    /// Hand `--dry-run` to rsync and write nothing to the target.
    #[arg(long)]
    pub dry_run: bool,

    /// Print each rsync command line before running it.
    #[arg(long)]
    pub verbose: bool,
}
