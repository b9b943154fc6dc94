//! Resolves the months requested for a report into the instants used to query the ledger.
//!
//! A report covers either a single `YYYY-MM` month or an inclusive range of
//! months. The resolved [Period] covers every second from midnight UTC on the
//! first day of the first month up to 23:59:59 UTC on the last day of the
//! last month. Single-month periods also know the month before them, which is
//! used for month-over-month trends.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, macros::time};

use crate::{Error, timestamp::format_timestamp};

/// A calendar month, e.g. September 2025.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    // Field order matters for the derived ordering.
    year: i32,
    month: u8,
}

impl YearMonth {
    /// Create a year-month from a year and a month.
    pub const fn new(year: i32, month: Month) -> Self {
        Self {
            year,
            month: month as u8,
        }
    }

    /// The month containing `date`.
    pub fn from_date(date: Date) -> Self {
        Self::new(date.year(), date.month())
    }

    /// Parse a `YYYY-MM` token.
    ///
    /// # Errors
    /// Returns [Error::InvalidPeriod] if `token` is not exactly four digits, a
    /// dash and two digits, or if the month is not between 01 and 12.
    pub fn parse(token: &str) -> Result<Self, Error> {
        let invalid = || {
            Error::InvalidPeriod(format!("\"{token}\" is not a month in the format YYYY-MM"))
        };

        let (year, month) = token.split_once('-').ok_or_else(invalid)?;

        if year.len() != 4
            || month.len() != 2
            || !year.chars().all(|c| c.is_ascii_digit())
            || !month.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;

        Ok(Self::new(year, month))
    }

    /// The year of the month.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The month of the year.
    pub fn month(&self) -> Month {
        // `month` is always in 1..=12 since it is only set from a `Month`.
        Month::try_from(self.month).unwrap_or(Month::January)
    }

    /// The first day of the month.
    pub fn first_day(&self) -> Date {
        Date::from_calendar_date(self.year, self.month(), 1).unwrap_or(Date::MIN)
    }

    /// The last day of the month.
    pub fn last_day(&self) -> Date {
        self.next().first_day().previous_day().unwrap_or(Date::MAX)
    }

    /// The month immediately before this one, wrapping January back to December of the
    /// previous year.
    pub fn previous(&self) -> Self {
        match self.month() {
            Month::January => Self::new(self.year - 1, Month::December),
            month => Self::new(self.year, month.previous()),
        }
    }

    /// The month immediately after this one, wrapping December to January of the next year.
    pub fn next(&self) -> Self {
        match self.month() {
            Month::December => Self::new(self.year + 1, Month::January),
            month => Self::new(self.year, month.next()),
        }
    }

    /// Whether `date` falls within this month.
    pub fn contains(&self, date: Date) -> bool {
        Self::from_date(date) == *self
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        YearMonth::parse(s)
    }
}

/// The query parameters that select a report period.
///
/// Either `month` or both of `start` and `end` must be given. When `month` is
/// given, `start` and `end` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodQuery {
    /// A single month, `YYYY-MM`.
    pub month: Option<String>,
    /// The first month of a range, `YYYY-MM`.
    pub start: Option<String>,
    /// The last month of a range, `YYYY-MM`.
    pub end: Option<String>,
}

impl PeriodQuery {
    /// A query for a single month.
    pub fn month(month: &str) -> Self {
        Self {
            month: Some(month.to_owned()),
            ..Default::default()
        }
    }

    /// A query for an inclusive range of months.
    pub fn range(start: &str, end: &str) -> Self {
        Self {
            month: None,
            start: Some(start.to_owned()),
            end: Some(end.to_owned()),
        }
    }
}

/// An inclusive span of instants, from the first second of a day to the last
/// second of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// The first instant in the interval.
    pub start: OffsetDateTime,
    /// The last instant in the interval.
    pub end: OffsetDateTime,
}

impl Interval {
    /// The interval covering the days from `first_day` to `last_day` inclusive.
    pub fn from_days(first_day: Date, last_day: Date) -> Self {
        Self {
            start: first_day.midnight().assume_utc(),
            end: PrimitiveDateTime::new(last_day, time!(23:59:59)).assume_utc(),
        }
    }

    /// The start of the interval as stored timestamp text, for use as a query parameter.
    pub fn start_param(&self) -> String {
        format_timestamp(self.start)
    }

    /// The end of the interval as stored timestamp text, for use as a query parameter.
    pub fn end_param(&self) -> String {
        format_timestamp(self.end)
    }
}

/// The period boundaries echoed back in reports, as `YYYY-MM` tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodLabel {
    /// The first month of the period.
    pub start: String,
    /// The last month of the period. Equal to `start` for a single month.
    pub end: String,
}

/// A resolved, inclusive range of whole months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: YearMonth,
    end: YearMonth,
    single_month: bool,
}

impl Period {
    /// A period covering exactly one month.
    pub fn single(month: YearMonth) -> Self {
        Self {
            start: month,
            end: month,
            single_month: true,
        }
    }

    /// A period covering the months from `start` to `end` inclusive.
    ///
    /// # Errors
    /// Returns [Error::InvalidPeriod] if `start` is after `end`.
    pub fn range(start: YearMonth, end: YearMonth) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidPeriod(format!(
                "the start month {start} is after the end month {end}"
            )));
        }

        Ok(Self {
            start,
            end,
            single_month: false,
        })
    }

    /// The first month in the period.
    pub fn start(&self) -> YearMonth {
        self.start
    }

    /// The last month in the period.
    pub fn end(&self) -> YearMonth {
        self.end
    }

    /// The single month this period was requested for, if it was requested with `month`.
    ///
    /// A range whose start and end happen to be the same month is still a
    /// range and returns `None`.
    pub fn single_month(&self) -> Option<YearMonth> {
        self.single_month.then_some(self.start)
    }

    /// The instants covered by this period.
    pub fn interval(&self) -> Interval {
        Interval::from_days(self.start.first_day(), self.end.last_day())
    }

    /// The period to compare against for month-over-month trends.
    ///
    /// Only single-month periods have a comparison period: the calendar month
    /// immediately before. Ranges return `None`.
    pub fn comparison(&self) -> Option<Period> {
        self.single_month()
            .map(|month| Period::single(month.previous()))
    }

    /// The period boundaries as `YYYY-MM` tokens.
    pub fn label(&self) -> PeriodLabel {
        PeriodLabel {
            start: self.start.to_string(),
            end: self.end.to_string(),
        }
    }
}

/// Resolve report query parameters into a [Period].
///
/// # Errors
/// Returns [Error::InvalidPeriod] if neither `month` nor both of `start` and
/// `end` are given, if a month token is malformed, or if `start` is after `end`.
pub fn resolve_period(query: &PeriodQuery) -> Result<Period, Error> {
    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    if let Some(month) = non_empty(&query.month) {
        return YearMonth::parse(month).map(Period::single);
    }

    match (non_empty(&query.start), non_empty(&query.end)) {
        (Some(start), Some(end)) => Period::range(YearMonth::parse(start)?, YearMonth::parse(end)?),
        _ => Err(Error::InvalidPeriod(
            "provide ?month=YYYY-MM or ?start=YYYY-MM&end=YYYY-MM".to_owned(),
        )),
    }
}
