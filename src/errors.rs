//! Error taxonomy and errno-style rendering.
//!
//! Every user-visible failure message is part of the CLI contract and is
//! asserted verbatim by the test suite, so the variants here carry fully
//! rendered strings rather than source errors.  I/O details are rendered in
//! the classic errno shape (`[Errno 2] No such file or directory: '/p'`)
//! by [`errno_detail`] / [`errno_detail_path`].

use std::io;

use thiserror::Error;

/// Failures that abort a run with exit code 1.
#[derive(Debug, Error)]
pub enum BlueError {
    /// Configuration schema or semantics problem; the message is final.
    #[error("{0}")]
    Config(String),

    /// SSH/SFTP connection could not be established.
    #[error("Failed connecting to {host}: {detail}")]
    Connection { host: String, detail: String },

    /// The `remote` cargo feature is compiled out but the target is remote.
    #[error("Accessing remote host {0} requires the ssh2 feature.")]
    RemoteUnavailable(String),

    /// Another process holds the lock, or the lock file is inaccessible.
    #[error("Failed locking {path}: {detail}")]
    Lock { path: String, detail: String },

    /// The target root is missing or not writable.
    #[error("Error writing to target location '{path}': {detail}")]
    TargetLocation { path: String, detail: String },

    /// The per-run log could not be opened or written.
    #[error("Error writing to log '{path}': {detail}")]
    Log { path: String, detail: String },

    /// A stream was requested in a non-binary mode.
    #[error("File '{0}' must be opened in binary mode")]
    BinaryMode(String),

    /// The target history holds no usable dated directories.
    #[error("No dated folders found in '{0}'")]
    NoDatedFolders(String),

    /// First run against this target; `--first-time` is required.
    #[error("This is the first time you are backing up to this folder, specify --first-time")]
    FirstTime,

    /// `--first-time` was given but the target already has snapshots.
    #[error("This is not the first time you are backing up to this folder, remove --first-time")]
    NotFirstTime,

    /// A child process exited with a code that aborts the run.
    #[error("Return code: {0}")]
    ReturnCode(i32),

    /// SIGINT/SIGTERM received; the external process was terminated.
    #[error("Interrupted")]
    Interrupted,

    /// Anything else that ends the run; the message is final.
    #[error("{0}")]
    Run(String),
}

/// Render an I/O error as `[Errno <n>] <message>`.
///
/// Errors without an OS error code fall back to their plain display.
pub fn errno_detail(err: &io::Error) -> String {
    match err.raw_os_error() {
        Some(n) => format!("[Errno {n}] {}", strip_os_suffix(&err.to_string())),
        None => err.to_string(),
    }
}

/// Render an I/O error as `[Errno <n>] <message>: '<path>'`.
pub fn errno_detail_path(err: &io::Error, path: impl std::fmt::Display) -> String {
    match err.raw_os_error() {
        Some(_) => format!("{}: '{}'", errno_detail(err), path),
        None => err.to_string(),
    }
}

/// Shorthand for the ubiquitous missing-path detail.
pub fn missing_path_detail(path: impl std::fmt::Display) -> String {
    errno_detail_path(&io::Error::from_raw_os_error(2), path)
}

// std renders OS errors as "<message> (os error <n>)"; the suffix is noise
// in the errno shape.
fn strip_os_suffix(msg: &str) -> &str {
    match msg.rfind(" (os error") {
        Some(idx) => &msg[..idx],
        None => msg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_detail_renders_os_error() {
        let err = io::Error::from_raw_os_error(2);
        assert_eq!(errno_detail(&err), "[Errno 2] No such file or directory");
    }

    #[test]
    fn errno_detail_path_appends_quoted_path() {
        let err = io::Error::from_raw_os_error(13);
        assert_eq!(
            errno_detail_path(&err, "/tmp/lock"),
            "[Errno 13] Permission denied: '/tmp/lock'"
        );
    }

    #[test]
    fn errno_detail_without_code_uses_plain_message() {
        let err = io::Error::new(io::ErrorKind::Other, "custom failure");
        assert_eq!(errno_detail(&err), "custom failure");
    }

    #[test]
    fn missing_path_detail_is_errno_2() {
        assert_eq!(
            missing_path_detail("/tmp/t"),
            "[Errno 2] No such file or directory: '/tmp/t'"
        );
    }

    #[test]
    fn first_time_messages_are_exact() {
        assert_eq!(
            BlueError::FirstTime.to_string(),
            "This is the first time you are backing up to this folder, specify --first-time"
        );
        assert_eq!(
            BlueError::NotFirstTime.to_string(),
            "This is not the first time you are backing up to this folder, remove --first-time"
        );
    }

    #[test]
    fn lock_error_renders_contended_shape() {
        let err = BlueError::Lock {
            path: "/tmp/test.lock".into(),
            detail: "[Errno 11] Resource temporarily unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed locking /tmp/test.lock: [Errno 11] Resource temporarily unavailable"
        );
    }
}
