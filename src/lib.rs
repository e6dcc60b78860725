//! `blue-backup` — incremental, snapshot-oriented rsync backups.
//!
//! # Overview
//!
//! This crate is a thin orchestration layer around `rsync`.  A TOML file
//! declares one target location and a set of source folders; every run
//! produces one dated snapshot under the target, seeded from the previous
//! snapshot by hard links (or a btrfs subvolume snapshot) so that unchanged
//! files cost no space.  History is pruned to one snapshot per month plus
//! the twenty most recent days.
//!
//! ```text
//! blue-backup blue.toml                # incremental snapshot
//! blue-backup --first-time blue.toml   # first backup into an empty target
//! blue-backup --dry-run blue.toml      # rehearse without writing
//! ```
//!
//! Targets with `{LATEST}` instead of `{TODAY}` mirror the newest snapshot
//! off-site; targets with neither collect sources into flat sub-targets.
//!
//! # Module layout
//!
//! | Module         | Responsibility                                    |
//! |----------------|---------------------------------------------------|
//! | [`cli`]        | Argument types parsed by clap                     |
//! | [`endpoint`]   | `[address:]path` parsing, `{KEY}` placeholders    |
//! | [`connection`] | File/exec capability, local or SSH/SFTP           |
//! | [`lock`]       | Advisory per-target-root lock                     |
//! | [`config`]     | TOML loader and validation                        |
//! | [`history`]    | Dated snapshot enumeration and retention          |
//! | [`snapshot`]   | Staging-directory state machine, cheap copies     |
//! | [`transfer`]   | rsync argv composition, streaming execution       |
//! | [`run`]        | Orchestrator and mode dispatch                    |
//! | [`clock`]      | Injected source of "today"                        |
//! | [`errors`]     | Error taxonomy, errno-style message rendering     |

pub mod cli;
pub mod clock;
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod errors;
pub mod history;
pub mod lock;
pub mod run;
pub mod snapshot;
pub mod transfer;

pub use errors::BlueError;
