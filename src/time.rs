//! Timestamp helpers shared by the catalog, the search hits and the classifier.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::error::AppError;

const SECONDS_PER_DAY: i64 = 86_400;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole days in `delta`, rounded toward negative infinity.
///
/// Half a day in the past is `-1`, not `0`.
pub fn whole_days(delta: TimeDelta) -> i64 {
    delta.num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Signed whole days from `now` until `target`.
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    whole_days(target - now)
}

/// Parse a catalog or index timestamp.
///
/// Accepts RFC 3339, the space separated `2023-03-01 00:00:00+00:00` form, naive
/// date-times (read as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(AppError::UnparseableTimestamp {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Parse an optional column; empty strings count as absent.
pub fn parse_optional_timestamp(
    field: &str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_timestamp(field, v).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_whole_days_floors_negative_fractions() {
        assert_eq!(whole_days(TimeDelta::hours(36)), 1);
        assert_eq!(whole_days(TimeDelta::hours(-12)), -1);
        assert_eq!(whole_days(TimeDelta::zero()), 0);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap();
        for value in [
            "2023-03-01T00:00:00+00:00",
            "2023-03-01T00:00:00Z",
            "2023-03-01 00:00:00+00:00",
            "2023-03-01T00:00:00",
            "2023-03-01",
        ] {
            assert_eq!(parse_timestamp("start", value).unwrap(), expected, "{value}");
        }
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("start", "next tuesday").unwrap_err();
        assert!(matches!(err, AppError::UnparseableTimestamp { .. }));
    }

    #[test]
    fn test_parse_optional_timestamp_blank_is_none() {
        assert_eq!(parse_optional_timestamp("end", Some("")).unwrap(), None);
        assert_eq!(parse_optional_timestamp("end", None).unwrap(), None);
    }
}
