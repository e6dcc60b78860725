//! Today's date as an injected capability.
//!
//! Snapshot names derive from "today"; hardcoding `Utc::now` would make the
//! multi-day retention scenarios untestable.  The orchestrator takes a
//! `&dyn Clock` and the binary passes [`SystemClock`].

use std::cell::Cell;

use chrono::{NaiveDate, Utc};

pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// UTC calendar date of the host.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Settable clock used by the test suite to simulate day changes.
pub struct FixedClock(Cell<NaiveDate>);

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self(Cell::new(date))
    }

    pub fn set(&self, date: NaiveDate) {
        self.0.set(date);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0.get()
    }
}
