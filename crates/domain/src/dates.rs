//! Parsing of client-supplied dates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::ValidationError;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parses an order timestamp.
///
/// Accepts RFC 3339 (`2024-05-01T12:30:00+02:00`), a naive datetime read as
/// UTC (`2024-05-01T12:30:00`), or a bare day (`2024-05-01`) read as
/// midnight UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, ValidationError> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(input, DAY_FORMAT)
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| ValidationError::InvalidDate(input.to_string()))
}

/// Parses a calendar day (`YYYY-MM-DD`) used to filter orders.
pub fn parse_day(input: &str) -> Result<NaiveDate, ValidationError> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, DAY_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(input.to_string()))
}
