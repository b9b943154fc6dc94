//! Conversions between `time` values and the text stored in the database.
//!
//! Timestamps are stored as UTC text with second precision, e.g.
//! "2025-09-14 00:00:00". With a fixed width format, comparing the text
//! compares the instants, and SQLite's `date()` and `strftime()` can group
//! rows by day or month.

use rusqlite::{Row, types::Type};
use time::{
    Date, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::BorrowedFormatItem, macros::format_description,
};

use crate::Error;

/// Date time format for stored timestamps, e.g. "2025-09-14 00:00:00".
const TIMESTAMP_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Date format used by the API, e.g. "2025-09-14".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Format `date_time` as UTC text for storage.
pub fn format_timestamp(date_time: OffsetDateTime) -> String {
    let utc = date_time.to_offset(UtcOffset::UTC);

    utc.format(TIMESTAMP_FORMAT).unwrap_or_else(|error| {
        tracing::error!("could not format timestamp {utc}: {error}");
        utc.to_string()
    })
}

/// The current time in UTC, truncated to whole seconds to match what is stored.
pub fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();

    now - Duration::nanoseconds(i64::from(now.nanosecond()))
}

/// Parse a stored timestamp, interpreting it as UTC.
pub fn parse_timestamp(text: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(text, TIMESTAMP_FORMAT).map(PrimitiveDateTime::assume_utc)
}

/// Parse a "YYYY-MM-DD" date from an API request.
///
/// # Errors
/// Returns [Error::InvalidDate] if `text` is not a valid calendar date.
pub fn parse_date(text: &str) -> Result<Date, Error> {
    Date::parse(text.trim(), DATE_FORMAT).map_err(|_| Error::InvalidDate(text.to_owned()))
}

/// The start of `date` in UTC.
pub fn start_of_day(date: Date) -> OffsetDateTime {
    date.midnight().assume_utc()
}

/// Read the timestamp stored in column `index` of `row`.
pub fn get_timestamp(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    let raw: String = row.get(index)?;

    parse_timestamp(&raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

/// Read the optional timestamp stored in column `index` of `row`.
pub fn get_optional_timestamp(
    row: &Row,
    index: usize,
) -> Result<Option<OffsetDateTime>, rusqlite::Error> {
    let raw: Option<String> = row.get(index)?;

    raw.map(|raw| {
        parse_timestamp(&raw).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
        })
    })
    .transpose()
}
