// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use crate::error::AppError;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Which end of a range a bare date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

/// Parse an RFC3339 timestamp or `YYYY-MM-DD` into a UTC RFC3339 string.
///
/// A bare date covers the whole UTC day: midnight for `Start`, the last
/// second for `End`.
pub fn parse_date_bound(raw: &str, bound: DateBound) -> Result<String, AppError> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(format_utc_rfc3339(ts.with_timezone(&Utc)));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date: {}", raw)))?;
    let time = match bound {
        DateBound::Start => date.and_hms_opt(0, 0, 0),
        DateBound::End => date.and_hms_opt(23, 59, 59),
    }
    .ok_or_else(|| AppError::BadRequest(format!("Invalid date: {}", raw)))?;

    Ok(format_utc_rfc3339(time.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_utc_rfc3339() {
        let date = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2026-03-01T12:30:05Z");
    }

    #[test]
    fn test_parse_date_bound() {
        assert_eq!(
            parse_date_bound("2026-03-01", DateBound::Start).unwrap(),
            "2026-03-01T00:00:00Z"
        );
        assert_eq!(
            parse_date_bound("2026-03-01", DateBound::End).unwrap(),
            "2026-03-01T23:59:59Z"
        );
        assert_eq!(
            parse_date_bound("2026-03-01T10:00:00+02:00", DateBound::Start).unwrap(),
            "2026-03-01T08:00:00Z"
        );
        assert!(matches!(
            parse_date_bound("yesterday", DateBound::Start),
            Err(AppError::BadRequest(_))
        ));
    }
}
