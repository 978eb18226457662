//! HTTP handlers, grouped by resource.

pub mod admin;
pub mod auth;
pub mod branches;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod products;
pub mod profile;

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use store::DateRange;

use crate::error::ApiError;

/// Parses an identifier taken from the request path.
pub(crate) fn parse_id<T: FromStr>(id: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}

/// Parses a date filter. Accepts RFC 3339 timestamps or plain `YYYY-MM-DD`
/// dates; a plain date covers the whole day.
fn parse_bound(name: &str, value: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest(format!("{name} must be a date (YYYY-MM-DD) or RFC 3339 timestamp"))
    })?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
    } else {
        NaiveTime::MIN
    };
    Ok(date.and_time(time).and_utc())
}

/// Builds an inclusive creation-time window from optional query values.
pub(crate) fn date_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange, ApiError> {
    let from = start.map(|v| parse_bound("startDate", v, false)).transpose()?;
    let to = end.map(|v| parse_bound("endDate", v, true)).transpose()?;
    if let (Some(from), Some(to)) = (from, to)
        && from > to
    {
        return Err(ApiError::BadRequest(
            "startDate must not be after endDate".to_string(),
        ));
    }
    Ok(DateRange::new(from, to))
}
