//! Preparing and pruning dated snapshot directories on the target.
//!
//! Today's directory is staged as `<date>.tmp` and renamed only after every
//! transfer finished, so an aborted run never leaves a half-written dated
//! directory behind.  The staging copy is cheap: hard links on ordinary
//! filesystems (`cp -al`), a subvolume snapshot on btrfs.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::connection::Connection;
use crate::errors::BlueError;

/// Where transfers should write, and what to do afterwards.
#[derive(Debug, PartialEq, Eq)]
pub enum Prepared {
    /// Same-day retry: the dated directory already exists, write into it.
    Existing(PathBuf),
    /// Fresh staging directory; rename `tmp` to `dated` after the transfers.
    Staged { tmp: PathBuf, dated: PathBuf },
}

impl Prepared {
    /// The directory the transfer driver writes into.
    pub fn dest_root(&self) -> &Path {
        match self {
            Self::Existing(path) => path,
            Self::Staged { tmp, .. } => tmp,
        }
    }
}

/// Whether the filesystem holding `root` does copy-on-write snapshots.
pub fn is_cow_filesystem(conn: &Connection, root: &Path) -> bool {
    conn.run(&["stat", "-f", "--format=%T", &root.to_string_lossy()])
        .map(|out| out.success() && out.stdout.trim() == "btrfs")
        .unwrap_or(false)
}

/// Stage the snapshot directory for `date` under `root`.
///
/// `reference` is the snapshot to seed from; `None` stages an empty
/// directory (first-time runs and offsite roots with no usable history).
pub fn prepare(
    conn: &Connection,
    root: &Path,
    date: NaiveDate,
    reference: Option<NaiveDate>,
    cow: bool,
    warn: &mut dyn Write,
) -> Result<Prepared, BlueError> {
    let dated = root.join(date.to_string());
    let tmp = root.join(format!("{date}.tmp"));

    if conn.exists(&tmp) {
        let _ = writeln!(
            warn,
            "Removing leftover temporary folder '{}'",
            tmp.display()
        );
        if let Err(detail) = remove_snapshot_dir(conn, &tmp, cow) {
            // A btrfs subvolume can refuse deletion without privileges;
            // keep the staging directory and let rsync reconcile it.
            let _ = writeln!(warn, "{detail}");
            return Ok(Prepared::Staged { tmp, dated });
        }
    }

    if conn.exists(&dated) {
        return Ok(Prepared::Existing(dated));
    }

    match reference {
        None => {
            conn.mkdir(&tmp).map_err(|err| BlueError::TargetLocation {
                path: root.display().to_string(),
                detail: crate::errors::errno_detail_path(&err, tmp.display()),
            })?;
            let _ = conn.chmod(&tmp, 0o755);
        }
        Some(reference) => {
            let source = root.join(reference.to_string());
            cheap_copy(conn, &source, &tmp, cow, warn)?;
        }
    }

    Ok(Prepared::Staged { tmp, dated })
}

/// Seed `dst` from `src` without duplicating file contents.
fn cheap_copy(
    conn: &Connection,
    src: &Path,
    dst: &Path,
    cow: bool,
    warn: &mut dyn Write,
) -> Result<(), BlueError> {
    let src = src.to_string_lossy();
    let dst = dst.to_string_lossy();
    let argv: Vec<&str> = if cow {
        vec!["btrfs", "subvolume", "snapshot", &src, &dst]
    } else {
        vec!["cp", "-al", &src, &dst]
    };

    let out = conn
        .run(&argv)
        .map_err(|err| BlueError::Run(format!("Failed to run {}: {err}", argv[0])))?;
    if out.success() {
        Ok(())
    } else {
        let _ = write!(warn, "{}", out.stderr);
        Err(BlueError::ReturnCode(out.code))
    }
}

/// Delete one dated snapshot and its sidecar log; never fatal.
pub fn prune_snapshot(
    conn: &Connection,
    root: &Path,
    date: NaiveDate,
    cow: bool,
    warn: &mut dyn Write,
) {
    let dir = root.join(date.to_string());
    if let Err(detail) = remove_snapshot_dir(conn, &dir, cow) {
        let _ = writeln!(warn, "{detail}");
    }
    let _ = conn.remove_file(&root.join(format!("{date}.log")));
}

/// Subvolume-aware recursive delete.  Returns a printable detail on failure.
fn remove_snapshot_dir(conn: &Connection, dir: &Path, cow: bool) -> Result<(), String> {
    if cow {
        let path = dir.to_string_lossy();
        match conn.run(&["btrfs", "subvolume", "delete", &path]) {
            Ok(out) if out.success() => Ok(()),
            // Snapshots made before the filesystem was btrfs (or plain
            // directories inside a btrfs root) fall back to a recursive
            // remove.
            Ok(_) => conn
                .remove_dir_all(dir)
                .map_err(|err| format!("{}: {err}", dir.display())),
            Err(err) => Err(format!("{}: {err}", dir.display())),
        }
    } else {
        conn.remove_dir_all(dir)
            .map_err(|err| format!("{}: {err}", dir.display()))
    }
}
