//! The orchestrator: one end-to-end run per invocation.
//!
//! Output goes through [`RunContext`] sinks rather than straight to the
//! process streams so the engine tests can capture stdout/stderr and
//! simulate day changes with an injected clock.

use std::io::Write;
use std::path::{Path, PathBuf};

use console::style;

use crate::cli::Cli;
use crate::clock::Clock;
use crate::config::{self, Config, Mode};
use crate::connection::{Connection, FileStream};
use crate::endpoint::Endpoint;
use crate::errors::{BlueError, errno_detail, missing_path_detail};
use crate::history::{self, History};
use crate::lock::LockGuard;
use crate::snapshot::{self, Prepared};
use crate::transfer::{self, ExitClass, SummaryRow};

/// Lock file created inside the target root.
pub const LOCK_FILE_NAME: &str = ".blue-backup.lock";

/// Everything a run needs besides the parsed CLI.
pub struct RunContext<'a> {
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
    pub clock: &'a dyn Clock,
}

/// Run to completion; the returned value is the process exit code.
pub fn run(cli: &Cli, ctx: &mut RunContext) -> i32 {
    transfer::install_signal_handler();
    match execute(cli, ctx) {
        Ok(code) => code,
        Err(err) => {
            let _ = writeln!(ctx.err, "{err}");
            1
        }
    }
}

fn execute(cli: &Cli, ctx: &mut RunContext) -> Result<i32, BlueError> {
    let config = config::load(&cli.config, cli.first_time, ctx.err)?;
    match config.mode {
        Mode::Snapshot => run_snapshot(cli, &config, ctx),
        Mode::Offsite => run_offsite(cli, &config, ctx),
        Mode::Collect => run_collect(cli, &config, ctx),
    }
}

// ── Snapshot mode ─────────────────────────────────────────────────────────

fn run_snapshot(cli: &Cli, config: &Config, ctx: &mut RunContext) -> Result<i32, BlueError> {
    let today = ctx.clock.today();
    let today_str = today.to_string();
    let resolved = config.target.resolve(&[("TODAY", &today_str)]);
    let _ = writeln!(ctx.out, "Backup target: {resolved}");

    let conn = Connection::open_endpoint(resolved.address())?;
    let root = PathBuf::from(resolved.parent().local_path());
    probe_root(&conn, &root)?;
    let _lock = acquire_lock(resolved.address(), &root, cli.dry_run)?;

    let history = scan_target(&conn, &root, ctx.err)?;
    if cli.first_time && !history.is_empty() {
        return Err(BlueError::NotFirstTime);
    }
    if !cli.first_time && history.is_empty() {
        return Err(BlueError::FirstTime);
    }
    let reference = history.reference(today);
    let timeout = transfer::timeout_secs();

    if cli.dry_run {
        let dest_root = root.join(format!("{today}.tmp"));
        let mut rows = Vec::new();
        for rule in &config.folders {
            let source = rule.source.with_trailing_slash();
            let _ = writeln!(ctx.out, "Backup source: {source}");
            let dest = render_dest(&resolved, &dest_root, &rule.sub_target);
            let args = transfer::build_args(config, rule, &source, &dest, true, timeout);
            if cli.verbose {
                let _ = writeln!(ctx.out, "{}", style(args.join(" ")).dim().for_stdout());
            }
            let outcome = transfer::run_transfer(&args, ctx.err)?;
            if let ExitClass::Timeout(code) | ExitClass::Failed(code) = outcome.class {
                return Err(BlueError::ReturnCode(code));
            }
            rows.push(SummaryRow {
                source,
                stats: outcome.stats,
            });
        }
        transfer::write_summary(&rows, ctx.out);
        return Ok(0);
    }

    let cow = snapshot::is_cow_filesystem(&conn, &root);
    let mut log = RunLog::open(&conn, &root.join(format!("{today}.log")))?;
    log.write_line(&format!("Backup target: {resolved}"))?;

    let prepared = snapshot::prepare(&conn, &root, today, reference, cow, ctx.err)?;

    let mut rows = Vec::new();
    for rule in &config.folders {
        let source = rule.source.with_trailing_slash();
        let _ = writeln!(ctx.out, "Backup source: {source}");
        let dest = render_dest(&resolved, prepared.dest_root(), &rule.sub_target);
        let args = transfer::build_args(config, rule, &source, &dest, false, timeout);
        if cli.verbose {
            let _ = writeln!(ctx.out, "{}", style(args.join(" ")).dim().for_stdout());
        }

        let outcome = transfer::run_transfer(&args, ctx.err)?;
        log.write_line(&format!("Backup source: {source}"))?;
        log.write(&outcome.stdout)?;
        log.write(&outcome.stderr)?;

        match outcome.class {
            ExitClass::Success => {}
            ExitClass::Partial(code) => {
                let _ = writeln!(ctx.err, "Return code: {code}");
            }
            ExitClass::Timeout(code) | ExitClass::Failed(code) => {
                return Err(BlueError::ReturnCode(code));
            }
        }
        rows.push(SummaryRow {
            source,
            stats: outcome.stats,
        });
    }

    if let Prepared::Staged { tmp, dated } = &prepared {
        conn.rename(tmp, dated)
            .map_err(|err| BlueError::TargetLocation {
                path: root.display().to_string(),
                detail: errno_detail(&err),
            })?;
    }

    transfer::write_summary(&rows, ctx.out);
    apply_retention(&conn, &root, &history, today, cow, ctx)?;
    Ok(0)
}

// ── Offsite mode ──────────────────────────────────────────────────────────

fn run_offsite(cli: &Cli, config: &Config, ctx: &mut RunContext) -> Result<i32, BlueError> {
    let rule = &config.folders[0];

    // Resolve {LATEST} from the source history.  Warnings about stray names
    // belong to the source's own backup runs, not this one.
    let src_root = PathBuf::from(rule.source.parent().local_path());
    let src_conn = Connection::open_endpoint(rule.source.address())?;
    let src_history = History::scan(&src_conn, &src_root, &mut std::io::sink())
        .map_err(|err| BlueError::Run(format!(
            "Failed reading source location '{}': {}",
            src_root.display(),
            errno_detail(&err)
        )))?;
    let latest = src_history
        .latest()
        .ok_or_else(|| BlueError::NoDatedFolders(src_root.display().to_string()))?;
    let latest_str = latest.to_string();

    let source_endpoint = rule.source.resolve(&[("LATEST", &latest_str)]);
    let resolved = config.target.resolve(&[("LATEST", &latest_str)]);
    let _ = writeln!(ctx.out, "Backup target: {resolved}");

    let conn = Connection::open_endpoint(resolved.address())?;
    let root = PathBuf::from(resolved.parent().local_path());
    probe_root(&conn, &root)?;
    let _lock = acquire_lock(resolved.address(), &root, cli.dry_run)?;

    let history = scan_target(&conn, &root, ctx.err)?;
    let reference = history.reference(latest);
    let timeout = transfer::timeout_secs();
    let source = source_endpoint.with_trailing_slash();

    if cli.dry_run {
        let _ = writeln!(ctx.out, "Backup source: {source}");
        let dest = render_dest(&resolved, &root.join(format!("{latest}.tmp")), "");
        let args = transfer::build_args(config, rule, &source, &dest, true, timeout);
        if cli.verbose {
            let _ = writeln!(ctx.out, "{}", style(args.join(" ")).dim().for_stdout());
        }
        let outcome = transfer::run_transfer(&args, ctx.err)?;
        if let ExitClass::Timeout(code) | ExitClass::Failed(code) = outcome.class {
            return Err(BlueError::ReturnCode(code));
        }
        transfer::write_summary(
            &[SummaryRow {
                source,
                stats: outcome.stats,
            }],
            ctx.out,
        );
        return Ok(0);
    }

    let cow = snapshot::is_cow_filesystem(&conn, &root);
    let mut log = RunLog::open(&conn, &root.join(format!("{latest}.log")))?;
    log.write_line(&format!("Backup target: {resolved}"))?;

    // The offsite root seeds from its own newest older snapshot; with no
    // usable history it starts from an empty staging directory, so offsite
    // mode never needs --first-time.
    let prepared = snapshot::prepare(&conn, &root, latest, reference, cow, ctx.err)?;

    let _ = writeln!(ctx.out, "Backup source: {source}");
    let dest = render_dest(&resolved, prepared.dest_root(), "");
    let args = transfer::build_args(config, rule, &source, &dest, false, timeout);
    if cli.verbose {
        let _ = writeln!(ctx.out, "{}", style(args.join(" ")).dim().for_stdout());
    }

    let outcome = transfer::run_transfer(&args, ctx.err)?;
    log.write_line(&format!("Backup source: {source}"))?;
    log.write(&outcome.stdout)?;
    log.write(&outcome.stderr)?;

    match outcome.class {
        ExitClass::Success => {}
        ExitClass::Partial(code) => {
            let _ = writeln!(ctx.err, "Return code: {code}");
        }
        ExitClass::Timeout(code) | ExitClass::Failed(code) => {
            return Err(BlueError::ReturnCode(code));
        }
    }

    if let Prepared::Staged { tmp, dated } = &prepared {
        conn.rename(tmp, dated)
            .map_err(|err| BlueError::TargetLocation {
                path: root.display().to_string(),
                detail: errno_detail(&err),
            })?;
    }

    transfer::write_summary(
        &[SummaryRow {
            source,
            stats: outcome.stats,
        }],
        ctx.out,
    );
    apply_retention(&conn, &root, &history, latest, cow, ctx)?;
    Ok(0)
}

// ── Collect mode ──────────────────────────────────────────────────────────

fn run_collect(cli: &Cli, config: &Config, ctx: &mut RunContext) -> Result<i32, BlueError> {
    let resolved = &config.target;
    let _ = writeln!(ctx.out, "Backup target: {resolved}");

    let conn = Connection::open_endpoint(resolved.address())?;
    let root = PathBuf::from(resolved.local_path());
    probe_root(&conn, &root)?;
    let _lock = acquire_lock(resolved.address(), &root, cli.dry_run)?;
    let timeout = transfer::timeout_secs();

    let mut rows = Vec::new();
    let mut failed = false;
    for rule in &config.folders {
        let source = rule.source.with_trailing_slash();
        let _ = writeln!(ctx.out, "Backup source: {source}");
        let dest = render_dest(resolved, &root, &rule.sub_target);
        let args = transfer::build_args(config, rule, &source, &dest, cli.dry_run, timeout);
        if cli.verbose {
            let _ = writeln!(ctx.out, "{}", style(args.join(" ")).dim().for_stdout());
        }

        let outcome = transfer::run_transfer(&args, ctx.err)?;
        if !cli.dry_run {
            let mut log = RunLog::open(&conn, &root.join(format!("{}.log", rule.sub_target)))?;
            log.write_line(&format!("Backup target: {resolved}"))?;
            log.write(&outcome.stdout)?;
            log.write(&outcome.stderr)?;
        }

        match outcome.class {
            ExitClass::Success => {}
            ExitClass::Partial(code) => {
                let _ = writeln!(ctx.err, "Return code: {code}");
            }
            ExitClass::Timeout(code) | ExitClass::Failed(code) => {
                let _ = writeln!(ctx.err, "Return code: {code}");
                let _ = writeln!(
                    ctx.err,
                    "Errors in rsync from: {source} to: {}",
                    rule.sub_target
                );
                failed = true;
            }
        }
        rows.push(SummaryRow {
            source,
            stats: outcome.stats,
        });
    }

    transfer::write_summary(&rows, ctx.out);
    Ok(if failed { 1 } else { 0 })
}

// ── Shared pieces ─────────────────────────────────────────────────────────

fn probe_root(conn: &Connection, root: &Path) -> Result<(), BlueError> {
    if conn.exists(root) {
        Ok(())
    } else {
        Err(BlueError::TargetLocation {
            path: root.display().to_string(),
            detail: missing_path_detail(root.display()),
        })
    }
}

// flock has no SFTP equivalent; remote roots are protected by the staging
// rename protocol instead.
fn acquire_lock(
    address: Option<&str>,
    root: &Path,
    dry_run: bool,
) -> Result<Option<LockGuard>, BlueError> {
    if dry_run || address.is_some() {
        return Ok(None);
    }
    LockGuard::acquire(&root.join(LOCK_FILE_NAME)).map(Some)
}

fn scan_target(
    conn: &Connection,
    root: &Path,
    warn: &mut dyn Write,
) -> Result<History, BlueError> {
    History::scan(conn, root, warn).map_err(|err| BlueError::TargetLocation {
        path: root.display().to_string(),
        detail: errno_detail(&err),
    })
}

fn apply_retention(
    conn: &Connection,
    root: &Path,
    history: &History,
    current: chrono::NaiveDate,
    cow: bool,
    ctx: &mut RunContext,
) -> Result<(), BlueError> {
    let mut dates = history.dates.clone();
    if !dates.contains(&current) {
        dates.push(current);
    }
    let retention = history::plan(&dates);
    for date in &retention.prune {
        snapshot::prune_snapshot(conn, root, *date, cow, ctx.err);
    }
    let _ = writeln!(
        ctx.out,
        "Kept backups: {} monthly, {} daily",
        retention.monthly.len(),
        retention.daily.len()
    );
    Ok(())
}

/// Destination argument for the transfer tool; remote targets get their
/// address back in front.
fn render_dest(target: &Endpoint, dest_root: &Path, sub_target: &str) -> String {
    let path = if sub_target.is_empty() {
        dest_root.display().to_string()
    } else {
        dest_root.join(sub_target).display().to_string()
    };
    match target.address() {
        Some(address) => format!("{address}:{path}"),
        None => path,
    }
}

/// Append-only view of the per-run log on the target.
struct RunLog {
    stream: Box<dyn FileStream>,
    path: String,
}

impl RunLog {
    fn open(conn: &Connection, path: &Path) -> Result<Self, BlueError> {
        let stream = conn.open(path, "ab").map_err(|err| BlueError::Log {
            path: path.display().to_string(),
            detail: errno_detail(&err),
        })?;
        Ok(Self {
            stream,
            path: path.display().to_string(),
        })
    }

    fn write(&mut self, text: &str) -> Result<(), BlueError> {
        self.stream
            .write_all(text.as_bytes())
            .and_then(|()| self.stream.flush())
            .map_err(|err| BlueError::Log {
                path: self.path.clone(),
                detail: errno_detail(&err),
            })
    }

    fn write_line(&mut self, line: &str) -> Result<(), BlueError> {
        self.write(&format!("{line}\n"))
    }
}
