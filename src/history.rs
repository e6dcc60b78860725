//! Dated-snapshot enumeration, reference selection, and retention.
//!
//! A history entry is a directory named exactly `YYYY-MM-DD`.  Anything
//! else (except sidecar logs, `.tmp` staging directories, and dotfiles)
//! is reported to stderr and skipped.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{Datelike, NaiveDate};

use crate::connection::Connection;

/// How many snapshots the daily retention tier keeps.
pub const KEPT_DAILY: usize = 20;

/// Valid snapshot dates under one target root, ascending.
#[derive(Debug, Default)]
pub struct History {
    pub dates: Vec<NaiveDate>,
}

impl History {
    /// Scan the immediate children of `root`, warning about invalid names.
    pub fn scan(conn: &Connection, root: &Path, warn: &mut dyn Write) -> std::io::Result<Self> {
        let mut dates = Vec::new();
        for name in conn.listdir(root)? {
            if name.starts_with('.') || name.ends_with(".log") || name.ends_with(".tmp") {
                continue;
            }
            match parse_snapshot_date(&name) {
                Ok(date) => dates.push(date),
                Err(detail) => {
                    let _ = writeln!(warn, "Folder {name}, non ISO date: {detail}");
                }
            }
        }
        dates.sort_unstable();
        Ok(Self { dates })
    }

    /// The most recent snapshot, if any.
    pub fn latest(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// The reference snapshot for an incremental run: the greatest date
    /// strictly before `today`.
    pub fn reference(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.dates.iter().rev().find(|&&d| d < today).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Strict `YYYY-MM-DD` parse.
///
/// Forms that parse but are not canonical (`20191204`, `1999-2-25`) are
/// rejected with a `<name> != <canonical>` detail so the warning explains
/// what the name was read as.
pub fn parse_snapshot_date(name: &str) -> Result<NaiveDate, String> {
    match NaiveDate::parse_from_str(name, "%Y-%m-%d") {
        Ok(date) => {
            let canonical = date.format("%Y-%m-%d").to_string();
            if canonical == name {
                Ok(date)
            } else {
                Err(format!("{name} != {canonical}"))
            }
        }
        Err(err) => Err(err.to_string()),
    }
}

/// The retention decision for one run.
#[derive(Debug)]
pub struct Retention {
    /// Earliest snapshot of each `(year, month)`.
    pub monthly: Vec<NaiveDate>,
    /// The most recent [`KEPT_DAILY`] of the rest.
    pub daily: Vec<NaiveDate>,
    /// Everything else, ascending.
    pub prune: Vec<NaiveDate>,
}

/// Partition `dates` (today's snapshot included) into kept and pruned sets.
pub fn plan(dates: &[NaiveDate]) -> Retention {
    let mut monthly: BTreeMap<(i32, u32), NaiveDate> = BTreeMap::new();
    for &date in dates {
        monthly
            .entry((date.year(), date.month()))
            .and_modify(|kept| {
                if date < *kept {
                    *kept = date;
                }
            })
            .or_insert(date);
    }
    let monthly: Vec<NaiveDate> = monthly.into_values().collect();

    let mut rest: Vec<NaiveDate> = dates
        .iter()
        .copied()
        .filter(|d| !monthly.contains(d))
        .collect();
    rest.sort_unstable_by(|a, b| b.cmp(a));

    let daily: Vec<NaiveDate> = rest.iter().copied().take(KEPT_DAILY).collect();
    let mut prune: Vec<NaiveDate> = rest.into_iter().skip(KEPT_DAILY).collect();
    prune.sort_unstable();

    Retention {
        monthly,
        daily,
        prune,
    }
}
