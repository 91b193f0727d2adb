//! Report date ranges. All days are UTC days; ranges are half-open
//! `[start, end)`.

use crate::utils::time::parse_date;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RangePreset {
    #[default]
    Last7,
    Last30,
    ThisWeek,
    Custom,
}

impl RangePreset {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "last7" | "last_7" | "7d" => Some(RangePreset::Last7),
            "last30" | "last_30" | "30d" => Some(RangePreset::Last30),
            "this_week" | "week" => Some(RangePreset::ThisWeek),
            "custom" => Some(RangePreset::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub preset: RangePreset,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// A custom range was invalid and the last-7-days preset was used instead.
    pub fell_back: bool,
}

impl DateRange {
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.start && *ts < self.end
    }
}

fn day_start(d: NaiveDate) -> DateTime<Utc> {
    d.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn last_days(n: i64, today: NaiveDate, preset: RangePreset) -> DateRange {
    DateRange {
        preset,
        start: day_start(today - Duration::days(n - 1)),
        end: day_start(today + Duration::days(1)),
        fell_back: false,
    }
}

/// Monday-based calendar week containing `now`.
pub fn current_week(now: DateTime<Utc>) -> DateRange {
    let today = now.date_naive();
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    DateRange {
        preset: RangePreset::ThisWeek,
        start: day_start(monday),
        end: day_start(monday + Duration::days(7)),
        fell_back: false,
    }
}

/// Resolve a preset. Custom dates are inclusive calendar days; a missing,
/// unparseable or inverted custom range falls back to the last 7 days.
pub fn resolve_range(
    preset: RangePreset,
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> DateRange {
    let today = now.date_naive();

    match preset {
        RangePreset::Last7 => last_days(7, today, preset),
        RangePreset::Last30 => last_days(30, today, preset),
        RangePreset::ThisWeek => current_week(now),
        RangePreset::Custom => {
            let parsed = (start.and_then(parse_date), end.and_then(parse_date));
            match parsed {
                (Some(s), Some(e)) if e >= s => DateRange {
                    preset,
                    start: day_start(s),
                    end: day_start(e + Duration::days(1)),
                    fell_back: false,
                },
                _ => {
                    tracing::debug!(?start, ?end, "invalid custom range, using last 7 days");
                    DateRange {
                        fell_back: true,
                        ..last_days(7, today, RangePreset::Last7)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        // Wednesday
        "2024-01-10T15:30:00Z".parse().unwrap()
    }

    #[test]
    fn last7_covers_today_and_six_days_back() {
        let r = resolve_range(RangePreset::Last7, None, None, now());
        assert_eq!(r.start.to_rfc3339(), "2024-01-04T00:00:00+00:00");
        assert_eq!(r.end.to_rfc3339(), "2024-01-11T00:00:00+00:00");
    }

    #[test]
    fn week_starts_on_monday() {
        let r = current_week(now());
        assert_eq!(r.start.to_rfc3339(), "2024-01-08T00:00:00+00:00");
        assert_eq!(r.end.to_rfc3339(), "2024-01-15T00:00:00+00:00");
    }

    #[test]
    fn inverted_custom_range_falls_back() {
        let r = resolve_range(RangePreset::Custom, Some("2024-01-09"), Some("2024-01-02"), now());
        assert!(r.fell_back);
        assert_eq!(r.preset, RangePreset::Last7);
    }

    #[test]
    fn custom_end_day_is_inclusive() {
        let r = resolve_range(RangePreset::Custom, Some("2024-01-01"), Some("2024-01-01"), now());
        assert!(!r.fell_back);
        assert!(r.contains(&"2024-01-01T23:59:59Z".parse().unwrap()));
    }
}
