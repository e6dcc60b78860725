//! Composing and running the external transfer tool.
//!
//! Building the argument vector is pure and unit-tested without spawning
//! anything; execution streams the tool's stderr to the terminal (indented
//! four spaces) while collecting both streams for the run log and the
//! statistics summary.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::{Config, FolderRule};
use crate::errors::{BlueError, errno_detail};

/// Default `--timeout` handed to rsync, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// The rsync timeout, overridable through `RSYNC_TIMEOUT` (used by tests).
pub fn timeout_secs() -> u64 {
    std::env::var("RSYNC_TIMEOUT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static INSTALL_HANDLER: Once = Once::new();

/// Install the SIGINT/SIGTERM handler once per process.
///
/// The handler only raises a flag; the driver notices it after the current
/// child exits, so the lock is released and `<date>.tmp` stays on disk for
/// the next invocation.
pub fn install_signal_handler() {
    INSTALL_HANDLER.call_once(|| {
        let _ = ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst));
    });
}

fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Full rsync argument vector for one folder rule.
pub fn build_args(
    config: &Config,
    rule: &FolderRule,
    source: &str,
    dest: &str,
    dry_run: bool,
    timeout: u64,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "rsync".into(),
        "--archive".into(),
        "--stats".into(),
        "--itemize-changes".into(),
        format!("--timeout={timeout}"),
    ];
    if dry_run {
        args.push("--dry-run".into());
    }
    args.push("--delete".into());
    for pattern in config.exclude.iter().chain(&rule.exclude) {
        args.push(format!("--exclude={pattern}"));
    }
    if let Some(chown) = &rule.chown {
        args.push(format!("--chown={chown}"));
    }
    if let Some(chmod) = &rule.chmod {
        args.push(format!("--chmod={chmod}"));
    }
    args.extend(config.rsync_options.iter().cloned());
    args.extend(rule.rsync_options.iter().cloned());
    args.push(source.to_owned());
    args.push(dest.to_owned());
    args
}

/// Transfer counters scraped from `--stats` output.
#[derive(Debug, Default, Clone)]
pub struct TransferStats {
    pub total_files: u64,
    pub total_bytes: u64,
    pub transferred_files: u64,
    pub transferred_bytes: u64,
    pub elapsed: Duration,
}

/// What the tool's exit code means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    Success,
    /// 23/24: some files were skipped; surface and continue.
    Partial(i32),
    /// 30: I/O timeout.
    Timeout(i32),
    /// Anything else non-zero.
    Failed(i32),
}

impl ExitClass {
    pub fn classify(code: i32) -> Self {
        match code {
            0 => Self::Success,
            23 | 24 => Self::Partial(code),
            30 => Self::Timeout(code),
            code => Self::Failed(code),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Partial(code) | Self::Timeout(code) | Self::Failed(code) => code,
        }
    }
}

#[derive(Debug)]
pub struct TransferOutcome {
    pub class: ExitClass,
    pub stats: TransferStats,
    pub stdout: String,
    pub stderr: String,
}

/// Run the composed command, streaming its stderr to `err` indented by four
/// spaces.
pub fn run_transfer(args: &[String], err: &mut dyn Write) -> Result<TransferOutcome, BlueError> {
    let started = Instant::now();

    let mut child = Command::new(&args[0])
        .args(&args[1..])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| BlueError::Run(format!("Failed to run {}: {}", args[0], errno_detail(&e))))?;

    let Some(stdout_pipe) = child.stdout.take() else {
        return Err(BlueError::Run(format!("Failed to run {}: no stdout", args[0])));
    };
    let stdout_reader = std::thread::spawn(move || {
        let mut text = String::new();
        let _ = BufReader::new(stdout_pipe).read_to_string(&mut text);
        text
    });

    let mut stderr_text = String::new();
    if let Some(stderr_pipe) = child.stderr.take() {
        for line in BufReader::new(stderr_pipe).lines() {
            let Ok(line) = line else { break };
            let _ = writeln!(err, "    {line}");
            stderr_text.push_str(&line);
            stderr_text.push('\n');
        }
    }

    if interrupted() {
        let _ = child.kill();
        let _ = child.wait();
        return Err(BlueError::Interrupted);
    }

    let status = child
        .wait()
        .map_err(|e| BlueError::Run(format!("Failed to run {}: {}", args[0], errno_detail(&e))))?;
    let stdout_text = stdout_reader.join().unwrap_or_default();

    let mut stats = parse_stats(&stdout_text);
    stats.elapsed = started.elapsed();

    Ok(TransferOutcome {
        class: ExitClass::classify(status.code().unwrap_or(-1)),
        stats,
        stdout: stdout_text,
        stderr: stderr_text,
    })
}

fn parse_stats(stdout: &str) -> TransferStats {
    let mut stats = TransferStats::default();
    for line in stdout.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Number of files:") {
            stats.total_files = leading_number(rest);
        } else if let Some(rest) = line.strip_prefix("Number of regular files transferred:") {
            stats.transferred_files = leading_number(rest);
        } else if let Some(rest) = line.strip_prefix("Total file size:") {
            stats.total_bytes = leading_number(rest);
        } else if let Some(rest) = line.strip_prefix("Total transferred file size:") {
            stats.transferred_bytes = leading_number(rest);
        }
    }
    stats
}

// rsync groups digits with commas ("1,234,567 bytes").
fn leading_number(text: &str) -> u64 {
    text.trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// One line of the end-of-run summary table.
#[derive(Debug)]
pub struct SummaryRow {
    pub source: String,
    pub stats: TransferStats,
}

/// Fixed-column summary printed after all rules ran.
pub fn write_summary(rows: &[SummaryRow], out: &mut dyn Write) {
    let _ = writeln!(
        out,
        "{:<40} | {:>21} | {:>21} | {:>8}",
        "Source", "Total files / bytes", "Transferred / bytes", "Time"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<40} | {:>21} | {:>21} | {:>7.1}s",
            row.source,
            format!("{} / {}", row.stats.total_files, row.stats.total_bytes),
            format!(
                "{} / {}",
                row.stats.transferred_files, row.stats.transferred_bytes
            ),
            row.stats.elapsed.as_secs_f64(),
        );
    }
}
