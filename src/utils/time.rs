//! Time utilities: timestamp storage format, parsing user/wire input, durations.

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Storage format: RFC 3339, UTC, fixed millisecond precision.
/// Fixed width keeps lexical order equal to chronological order in SQLite.
pub fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse RFC 3339 (any offset) or a naive `YYYY-MM-DD[T ]HH:MM[:SS]` read as UTC.
pub fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }

    None
}

/// Optional wire timestamp: absent or blank → `now`; present but unreadable → error.
pub fn parse_occurred_at(input: Option<&str>, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
    match input.map(str::trim) {
        None | Some("") => Ok(now),
        Some(s) => parse_ts(s).ok_or_else(|| {
            AppError::validation("occurred_at", format!("unparseable timestamp '{s}'"))
        }),
    }
}

/// Column reader used by every row mapper.
pub fn ts_from_sql(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    parse_ts(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(AppError::validation("timestamp", raw.clone())),
        )
    })
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

pub fn hours(seconds: f64) -> f64 {
    seconds / 3600.0
}

/// Round to two decimals, the precision reports show.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-03-05T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn storage_format_is_fixed_width_utc() {
        let ts = parse_ts("2026-03-05T13:04:05+01:00").unwrap();
        assert_eq!(fmt_ts(&ts), "2026-03-05T12:04:05.000Z");
    }

    #[test]
    fn naive_timestamps_are_read_as_utc() {
        let ts = parse_ts("2026-03-05 08:30").unwrap();
        assert_eq!(fmt_ts(&ts), "2026-03-05T08:30:00.000Z");
        assert!(parse_ts("not a time").is_none());
        assert!(parse_ts("   ").is_none());
    }

    #[test]
    fn occurred_at_defaults_only_when_absent() {
        assert_eq!(parse_occurred_at(None, now()).unwrap(), now());
        assert_eq!(parse_occurred_at(Some(""), now()).unwrap(), now());
        assert!(matches!(
            parse_occurred_at(Some("2026-13-40"), now()),
            Err(AppError::Validation { field: "occurred_at", .. })
        ));
    }

    #[test]
    fn dates_and_rounding() {
        assert_eq!(parse_date(" 2026-02-28 "), NaiveDate::from_ymd_opt(2026, 2, 28));
        assert!(parse_date("28/02/2026").is_none());
        assert_eq!(round2(hours(5400.0)), 1.5);
        assert_eq!(round2(2.0 / 3.0), 0.67);
    }
}
