//! Lenient field parsers shared by the file readers.

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Parses a calendar date, accepting a trailing midnight time component.
///
/// # Errors
/// Returns an error if no supported format matches.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    let date_part = value.split([' ', 'T']).next().unwrap_or(value);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .ok_or_else(|| anyhow!("Unrecognized date: '{value}'"))
}

/// Parses a local timestamp; a bare date is taken as midnight.
///
/// # Errors
/// Returns an error if no supported format matches.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            parse_date(value)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| anyhow!("Unrecognized timestamp: '{value}'"))
}

/// Parses an optional float: empty and `NaN` cells are `None`.
///
/// # Errors
/// Returns an error for a non-empty cell that is not a number.
pub fn parse_optional_f64(value: &str) -> Result<Option<f64>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let parsed: f64 = value
        .parse()
        .map_err(|_| anyhow!("Not a number: '{value}'"))?;
    Ok(Some(parsed))
}

/// Normalizes a ticker cell; spreadsheet exports render `7203` as `7203.0`.
#[must_use]
pub fn normalize_ticker(value: &str) -> String {
    let value = value.trim();
    value.strip_suffix(".0").unwrap_or(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 6).unwrap();
        assert_eq!(parse_date("2020-01-06").unwrap(), expected);
        assert_eq!(parse_date("20200106").unwrap(), expected);
        assert_eq!(parse_date("2020-01-06 00:00:00").unwrap(), expected);
        assert!(parse_date("06/01/2020").is_err());
    }

    #[test]
    fn parses_timestamps_and_bare_dates() {
        let ts = parse_datetime("2020-01-06 15:30:00").unwrap();
        assert_eq!(ts.format("%H:%M").to_string(), "15:30");
        let midnight = parse_datetime("2020/01/06").unwrap();
        assert_eq!(midnight.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn optional_float_treats_blank_and_nan_as_missing() {
        assert_eq!(parse_optional_f64("").unwrap(), None);
        assert_eq!(parse_optional_f64("NaN").unwrap(), None);
        assert_eq!(parse_optional_f64(" 0.25 ").unwrap(), Some(0.25));
        assert!(parse_optional_f64("abc").is_err());
    }

    #[test]
    fn ticker_float_suffix_is_stripped() {
        assert_eq!(normalize_ticker("7203.0"), "7203");
        assert_eq!(normalize_ticker(" 1301 "), "1301");
    }
}
