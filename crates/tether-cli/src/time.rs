//! UTC timestamp parsing and display.
//!
//! Timestamps are epoch milliseconds everywhere in the store; the CLI shows
//! them as `YYYY-MM-DD HH:MM` in UTC and accepts the same forms back.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{CliError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

fn format_with(ms: i64, format: &str) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.format(format).to_string(),
        None => ms.to_string(),
    }
}

/// Render epoch milliseconds as `YYYY-MM-DD HH:MM` (UTC)
pub fn format_timestamp(ms: i64) -> String {
    format_with(ms, DATE_TIME_FORMATS[0])
}

/// Render epoch milliseconds as `YYYY-MM-DD` (UTC)
pub fn format_date(ms: i64) -> String {
    format_with(ms, DATE_FORMAT)
}

/// Parse `YYYY-MM-DD`, `YYYY-MM-DD HH:MM` (UTC) or raw epoch milliseconds
pub fn parse_timestamp(input: &str) -> Result<i64> {
    let input = input.trim();
    let invalid = || {
        CliError::InvalidInput(format!(
            "Invalid time '{}'. Expected YYYY-MM-DD, YYYY-MM-DD HH:MM or epoch milliseconds",
            input
        ))
    };

    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        let ms = input.parse::<i64>().map_err(|_| invalid())?;
        return DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.timestamp_millis())
            .ok_or_else(invalid);
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MS_PER_MINUTE: i64 = 60_000;

    #[test]
    fn test_epoch() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00");
        assert_eq!(parse_timestamp("1970-01-01").unwrap(), 0);
    }

    #[test]
    fn test_known_dates() {
        // 2024-02-29 12:30 UTC
        assert_eq!(parse_timestamp("2024-02-29 12:30").unwrap(), 1_709_209_800_000);
        assert_eq!(format_timestamp(1_709_209_800_000), "2024-02-29 12:30");
        assert_eq!(format_date(1_704_067_200_000), "2024-01-01");
        assert_eq!(parse_timestamp("2024-01-01T00:00").unwrap(), 1_704_067_200_000);
    }

    #[test]
    fn test_raw_milliseconds() {
        assert_eq!(parse_timestamp("1700000000000").unwrap(), 1_700_000_000_000);
    }

    #[test]
    fn test_invalid_inputs() {
        for bad in ["", "yesterday", "2023-02-29", "2024-13-01", "2024-01-01 25:00", "2024-01"] {
            assert!(parse_timestamp(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(parse_timestamp("999999999-01-01").is_err());
        assert!(parse_timestamp("99999999999999999").is_err());
        assert!(parse_timestamp("99999999999999999999").is_err());
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }

    proptest! {
        #[test]
        fn prop_minute_precision_roundtrip(minutes in 0i64..100_000_000) {
            let ms = minutes * MS_PER_MINUTE;
            prop_assert_eq!(parse_timestamp(&format_timestamp(ms)).unwrap(), ms);
        }
    }
}
