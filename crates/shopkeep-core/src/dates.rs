//! # Date Helpers
//!
//! Parsing for dashboard date inputs and the day-window arithmetic used by
//! reports, expiry alerts and debt due dates.
//!
//! The dashboard sends dates either as a plain calendar day (`2025-03-01`,
//! from an `<input type="date">`) or as a full ISO timestamp. Both are
//! accepted; a plain day means midnight UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::ValidationError;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Parses a date input in any of the accepted shapes.
///
/// ## Accepted Formats
/// - `2025-03-01` (midnight UTC)
/// - `2025-03-01T08:30:00` (UTC assumed)
/// - `2025-03-01T08:30:00.000Z` / `2025-03-01T15:30:00+07:00` (RFC 3339)
pub fn parse_date_input(field: &str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }

    Err(ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("'{}' is not a date (expected YYYY-MM-DD or ISO 8601)", value),
    })
}

/// Midnight at the start of the given instant's UTC day.
pub fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&at.date_naive().and_time(NaiveTime::MIN))
}

/// Last millisecond of the given instant's UTC day.
///
/// Used for `endDate` filters so a range ending on a day includes that
/// whole day.
pub fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(at) + Duration::days(1) - Duration::milliseconds(1)
}

/// Whole days from `now` until `target`, rounded up.
///
/// Half a day left counts as 1; a day and a half ago counts as -1.
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (target - now).num_milliseconds();
    if ms >= 0 {
        (ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    } else {
        -((-ms) / MILLIS_PER_DAY)
    }
}

/// Calendar-day key, `YYYY-MM-DD`.
pub fn day_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

// =============================================================================
// Serde Support
// =============================================================================

/// Deserializes an optional date field accepting every shape
/// [`parse_date_input`] does. Empty strings and `null` become `None`.
///
/// ```rust
/// use chrono::{DateTime, Utc};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Body {
///     #[serde(default, deserialize_with = "shopkeep_core::dates::deserialize_optional")]
///     due_date: Option<DateTime<Utc>>,
/// }
///
/// let body: Body = serde_json::from_str(r#"{"due_date":"2025-03-01"}"#).unwrap();
/// assert!(body.due_date.is_some());
/// ```
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_date_input("date", value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        parse_date_input("at", s).unwrap()
    }

    #[test]
    fn test_parse_accepts_plain_day() {
        let dt = at("2025-03-01");
        assert_eq!(dt.to_rfc3339(), "2025-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_accepts_rfc3339_with_offset() {
        let dt = at("2025-03-01T15:30:00+07:00");
        assert_eq!(dt, at("2025-03-01T08:30:00Z"));
        assert_eq!(at("2025-03-01T08:30:00"), dt);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_date_input("startDate", "yesterday").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
        let err = parse_date_input("startDate", "  ").unwrap_err();
        assert!(matches!(err, ValidationError::Required { .. }));
    }

    #[test]
    fn test_day_window() {
        let noon = at("2025-03-01T12:00:00Z");
        assert_eq!(start_of_day(noon), at("2025-03-01"));
        assert_eq!(end_of_day(noon), at("2025-03-01T23:59:59.999Z"));
        assert_eq!(day_key(noon), "2025-03-01");
    }

    #[test]
    fn test_days_until_rounds_up() {
        let now = at("2025-03-01T12:00:00Z");
        assert_eq!(days_until(at("2025-03-02T00:00:00Z"), now), 1);
        assert_eq!(days_until(at("2025-03-08T12:00:00Z"), now), 7);
        assert_eq!(days_until(now, now), 0);
        assert_eq!(days_until(at("2025-02-28T00:00:00Z"), now), -1);
        assert_eq!(days_until(at("2025-02-27T12:00:00Z"), now), -2);
    }
}
