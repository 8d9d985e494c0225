//! Budget periods.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// A `(year, month)` pair identifying a budget period.
///
/// Ordering is chronological. `Display`/`FromStr` use the `YYYY-MM` form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> ResultEngine<Self> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::Validation(format!(
                "month must be in 1..=12, got {month}"
            )));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(EngineError::Validation(format!("year out of range: {year}")));
        }
        Ok(Self { year, month })
    }

    /// Period containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// First calendar day of the period.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// First calendar day *after* the period (exclusive upper bound).
    #[must_use]
    pub fn end_exclusive(self) -> NaiveDate {
        self.next().first_day()
    }

    #[must_use]
    pub fn next(self) -> Self {
        self.plus_months(1)
    }

    #[must_use]
    pub fn prev(self) -> Self {
        self.minus_months(1)
    }

    #[must_use]
    pub fn plus_months(self, months: u32) -> Self {
        self.first_day()
            .checked_add_months(Months::new(months))
            .map_or(self, Self::of)
    }

    #[must_use]
    pub fn minus_months(self, months: u32) -> Self {
        self.first_day()
            .checked_sub_months(Months::new(months))
            .map_or(self, Self::of)
    }

    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        Self::of(date) == self
    }

    /// Monotonic month index (`year * 12 + month`), handy for SQL comparisons.
    #[must_use]
    pub const fn ordinal(self) -> i64 {
        self.year as i64 * 12 + self.month as i64
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::Validation(format!("invalid year-month (YYYY-MM): {s}"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}
