//! Time range parsing for array subsetting requests.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EoError, EoResult};

/// An inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Parse "start/end" or a single instant.
    ///
    /// A date-only end bound covers its whole day, so "2020-01-01" alone
    /// selects every timestamp on that date. Either bound may be `..` (or
    /// empty) to leave that side open.
    pub fn parse(s: &str) -> EoResult<Self> {
        let s = s.trim();
        let (start_str, end_str) = match s.split_once('/') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (s, s),
        };

        if is_open(start_str) && is_open(end_str) {
            return Err(EoError::InvalidTime(format!("{} has no bounds", s)));
        }
        let start = if is_open(start_str) {
            DateTime::<Utc>::MIN_UTC
        } else {
            parse_instant(start_str, false)?
        };
        let end = if is_open(end_str) {
            DateTime::<Utc>::MAX_UTC
        } else {
            parse_instant(end_str, true)?
        };
        if end < start {
            return Err(EoError::InvalidTime(format!(
                "end {} is before start {}",
                end_str, start_str
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    /// Bounds as seconds since the Unix epoch.
    pub fn as_epoch_seconds(&self) -> (f64, f64) {
        (epoch_seconds(&self.start), epoch_seconds(&self.end))
    }

    /// "start/end" in ISO 8601, with `..` for an open side. Used to record
    /// the request on persisted outputs.
    pub fn to_attribute_string(&self) -> String {
        let bound = |dt: &DateTime<Utc>, open: DateTime<Utc>| {
            if *dt == open {
                "..".to_string()
            } else {
                dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
            }
        };
        format!(
            "{}/{}",
            bound(&self.start, DateTime::<Utc>::MIN_UTC),
            bound(&self.end, DateTime::<Utc>::MAX_UTC)
        )
    }
}

/// Seconds since the Unix epoch with sub-second precision.
pub fn epoch_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9
}

fn is_open(bound: &str) -> bool {
    bound.is_empty() || bound == ".."
}

fn parse_instant(s: &str, end_of_day: bool) -> EoResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        let start = Utc.from_utc_datetime(&midnight);
        return Ok(if end_of_day {
            start + Duration::days(1) - Duration::milliseconds(1)
        } else {
            start
        });
    }

    Err(EoError::InvalidTime(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let range = TimeRange::parse("2020-01-01/2020-12-31").unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        assert!(range.contains(&Utc.with_ymd_and_hms(2020, 12, 31, 12, 0, 0).unwrap()));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_single_date_covers_day() {
        let range = TimeRange::parse("2021-06-15").unwrap();
        assert!(range.contains(&Utc.with_ymd_and_hms(2021, 6, 15, 18, 0, 0).unwrap()));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2021, 6, 16, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_rfc3339_range() {
        let range = TimeRange::parse("2024-01-15T00:00:00Z/2024-01-16T06:00:00Z").unwrap();
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 1, 16, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_open_ended_ranges() {
        let from = TimeRange::parse("2020-01-01/..").unwrap();
        assert!(from.contains(&Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()));
        assert!(!from.contains(&Utc.with_ymd_and_hms(2019, 12, 31, 0, 0, 0).unwrap()));

        let until = TimeRange::parse("../2020-01-01").unwrap();
        assert!(until.contains(&Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).unwrap()));

        assert!(TimeRange::parse("../..").is_err());
    }

    #[test]
    fn test_attribute_string() {
        let range = TimeRange::parse("2020-01-02T00:00:00Z/2020-01-03T00:00:00Z").unwrap();
        assert_eq!(range.to_attribute_string(), "2020-01-02T00:00:00Z/2020-01-03T00:00:00Z");
        let from = TimeRange::parse("2020-01-01/..").unwrap();
        assert_eq!(from.to_attribute_string(), "2020-01-01T00:00:00Z/..");
    }

    #[test]
    fn test_reject_inverted_and_garbage() {
        assert!(TimeRange::parse("2020-12-31/2020-01-01").is_err());
        assert!(TimeRange::parse("last tuesday").is_err());
    }
}
