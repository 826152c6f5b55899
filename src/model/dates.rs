//! Calendar-day arithmetic. Every date computation in the crate goes through
//! these helpers so day boundaries are handled one way only.

use chrono::{DateTime, Duration, Local, NaiveDate};

/// Wire format for dates crossing the store boundary.
pub const ISO_FORMAT: &str = "%Y-%m-%d";

/// Parse a date from user or store input.
///
/// Accepts `YYYY-MM-DD` (read as a local calendar day) and falls back to an
/// RFC 3339 timestamp, which is converted to the local calendar day it falls
/// on. Returns `None` for empty or unparseable input.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, ISO_FORMAT) {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|ts| ts.with_timezone(&Local).date_naive())
}

/// Same as [`parse_date`] for optional input.
pub fn parse_opt_date(input: Option<&str>) -> Option<NaiveDate> {
    input.and_then(parse_date)
}

/// Format a date as `YYYY-MM-DD` from its calendar fields.
pub fn to_iso_date(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// Inclusive length of a bar in days. Never below 1, so equal or inverted
/// dates still produce a drawable bar.
pub fn duration_days(start: NaiveDate, end: NaiveDate) -> i64 {
    ((end - start).num_days() + 1).max(1)
}

/// Shift a date by `n` calendar days, saturating at the representable range.
pub fn add_days(date: NaiveDate, n: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(n)).unwrap_or(if n < 0 {
        NaiveDate::MIN
    } else {
        NaiveDate::MAX
    })
}

/// Today's local calendar day.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Serde helper for optional `YYYY-MM-DD` fields. Unparseable values
/// deserialize to `None` instead of failing the whole record.
pub mod iso_opt {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&super::to_iso_date(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(super::parse_opt_date(raw.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date("2024-03-01"), Some(d(2024, 3, 1)));
        assert_eq!(parse_date("  2024-03-01 "), Some(d(2024, 3, 1)));
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_opt_date(None), None);
    }

    #[test]
    fn accepts_timestamps() {
        let parsed = parse_date("2024-03-01T12:00:00+00:00");
        assert!(parsed.is_some());
    }

    #[test]
    fn formats_zero_padded() {
        assert_eq!(to_iso_date(d(2024, 3, 1)), "2024-03-01");
        assert_eq!(to_iso_date(d(987, 12, 31)), "0987-12-31");
    }

    #[test]
    fn duration_is_inclusive_and_clamped() {
        assert_eq!(duration_days(d(2024, 3, 1), d(2024, 3, 1)), 1);
        assert_eq!(duration_days(d(2024, 3, 1), d(2024, 3, 7)), 7);
        assert_eq!(duration_days(d(2024, 3, 5), d(2024, 3, 1)), 1);
        // leap day
        assert_eq!(duration_days(d(2024, 2, 28), d(2024, 3, 1)), 3);
    }

    #[test]
    fn add_days_crosses_month_boundaries() {
        assert_eq!(add_days(d(2024, 1, 31), 1), d(2024, 2, 1));
        assert_eq!(add_days(d(2024, 3, 1), -1), d(2024, 2, 29));
        assert_eq!(add_days(NaiveDate::MAX, 5), NaiveDate::MAX);
    }
}
