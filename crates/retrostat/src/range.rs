// Inclusive date ranges confined to a single season.

use chrono::{Datelike, NaiveDate};

use crate::error::StatsError;

/// Date format SQLite compares natively; season tables store `date` this way.
pub const SQL_DATE_FORMAT: &str = "%Y-%m-%d";

/// An inclusive `start..=end` range whose endpoints share a calendar year.
///
/// Construction is the only place the range preconditions are checked, so a
/// `DateRange` in hand is always safe to query with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Validate and build a range.
    ///
    /// Ordering is checked before the year so a reversed range spanning two
    /// years reports `InvalidRange`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, StatsError> {
        if start > end {
            return Err(StatsError::InvalidRange { start, end });
        }
        if start.year() != end.year() {
            return Err(StatsError::CrossYearRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The whole of `season`, January 1 through December 31.
    pub fn full_season(season: i32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(season, 1, 1)?;
        let end = NaiveDate::from_ymd_opt(season, 12, 31)?;
        Some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// The season (year) both endpoints fall in.
    pub fn season(&self) -> i32 {
        self.start.year()
    }

    /// Inclusive bounds rendered as SQL date literals, ready to bind.
    pub fn sql_bounds(&self) -> (String, String) {
        (
            self.start.format(SQL_DATE_FORMAT).to_string(),
            self.end.format(SQL_DATE_FORMAT).to_string(),
        )
    }
}
