//! Decoding numeric time coordinates.
//!
//! A time axis is decoded from its CF `units` attribute when present
//! ("days since 1980-01-01"). Without one the unit is inferred from the
//! magnitude of the values.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use eo_common::time::epoch_seconds;
use serde::Serialize;

/// Unit of a numeric time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Nanoseconds => 1e-9,
            Self::Microseconds => 1e-6,
            Self::Milliseconds => 1e-3,
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3600.0,
            Self::Days => 86_400.0,
        }
    }

    /// Convert a count of this unit to seconds. Sub-second units divide so
    /// whole-second values stay exact.
    pub fn to_seconds(&self, value: f64) -> f64 {
        match self {
            Self::Nanoseconds => value / 1e9,
            Self::Microseconds => value / 1e6,
            Self::Milliseconds => value / 1e3,
            _ => value * self.seconds(),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s.to_lowercase().as_str() {
            "ns" | "nanosecond" | "nanoseconds" => Self::Nanoseconds,
            "us" | "microsecond" | "microseconds" => Self::Microseconds,
            "ms" | "millisecond" | "milliseconds" => Self::Milliseconds,
            "s" | "sec" | "secs" | "second" | "seconds" => Self::Seconds,
            "min" | "mins" | "minute" | "minutes" => Self::Minutes,
            "h" | "hr" | "hrs" | "hour" | "hours" => Self::Hours,
            "d" | "day" | "days" => Self::Days,
            _ => return None,
        })
    }
}

/// Calendar used to count days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Calendar {
    Standard,
    /// 365-day years without February 29.
    NoLeap,
    /// Twelve 30-day months.
    #[serde(rename = "360_day")]
    Day360,
}

impl Calendar {
    /// Parse a CF `calendar` attribute. Unknown names are standard.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "noleap" | "365_day" => Self::NoLeap,
            "360_day" => Self::Day360,
            _ => Self::Standard,
        }
    }

    /// Days per year for calendars with fixed-length years.
    fn fixed_year_length(&self) -> Option<i64> {
        match self {
            Self::Standard => None,
            Self::NoLeap => Some(365),
            Self::Day360 => Some(360),
        }
    }

    /// Zero-based day of year of a Gregorian date in this calendar.
    fn day_of_year(&self, date: NaiveDate) -> u32 {
        match self {
            Self::Day360 => date.month0() * 30 + (date.day() - 1).min(29),
            _ => noleap_day_of_year(date),
        }
    }

    /// Gregorian date for a zero-based day of year. 360-day dates past the
    /// end of a short month land on its last day.
    fn date(&self, year: i32, day_of_year: u32) -> Option<NaiveDate> {
        match self {
            Self::Day360 => {
                let month = day_of_year / 30 + 1;
                let day = day_of_year % 30 + 1;
                (1..=day)
                    .rev()
                    .find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
            }
            _ => noleap_date(year, day_of_year),
        }
    }
}

/// How numeric time values map to instants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeEncoding {
    pub unit: TimeUnit,
    pub epoch: DateTime<Utc>,
    pub calendar: Calendar,
}

/// Cumulative day-of-year at the start of each month in a 365-day year.
const NOLEAP_MONTH_START: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

impl TimeEncoding {
    pub fn new(unit: TimeUnit, epoch: DateTime<Utc>) -> Self {
        Self {
            unit,
            epoch,
            calendar: Calendar::Standard,
        }
    }

    /// Offsets from the Unix epoch.
    pub fn unix(unit: TimeUnit) -> Self {
        Self::new(unit, DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Parse CF units such as "hours since 1900-01-01 00:00:00".
    pub fn parse_cf(units: &str) -> Option<Self> {
        let (unit, reference) = units.trim().split_once(" since ")?;
        let unit = TimeUnit::parse(unit.trim())?;
        let epoch = parse_reference(reference.trim())?;
        Some(Self::new(unit, epoch))
    }

    /// Infer the encoding from value magnitude.
    ///
    /// Values around 1e9-1e10 are Unix seconds and values of 1e15 or more
    /// Unix nanoseconds; between the two, Unix milliseconds. Anything
    /// smaller counts days since `days_reference`.
    pub fn infer(values: &[f64], days_reference: DateTime<Utc>) -> Option<Self> {
        let magnitude = values
            .iter()
            .filter(|v| v.is_finite())
            .map(|v| v.abs())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))?;

        Some(if magnitude >= 1e15 {
            Self::unix(TimeUnit::Nanoseconds)
        } else if magnitude >= 1e11 {
            Self::unix(TimeUnit::Milliseconds)
        } else if magnitude >= 1e9 {
            Self::unix(TimeUnit::Seconds)
        } else {
            Self::new(TimeUnit::Days, days_reference)
        })
    }

    /// Seconds since the Unix epoch for a raw value.
    pub fn to_epoch_seconds(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        match self.calendar {
            Calendar::Standard => Some(epoch_seconds(&self.epoch) + self.unit.to_seconds(value)),
            Calendar::NoLeap | Calendar::Day360 => {
                self.to_datetime(value).map(|dt| epoch_seconds(&dt))
            }
        }
    }

    /// Instant for a raw value.
    pub fn to_datetime(&self, value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let Some(year_length) = self.calendar.fixed_year_length() else {
            return from_epoch_seconds(self.to_epoch_seconds(value)?);
        };
        let days = self.unit.to_seconds(value) / 86_400.0;
        let whole = days.floor();
        let start = self.calendar.day_of_year(self.epoch.date_naive()) as i64;
        let total = start.checked_add(whole as i64)?;
        let year = (self.epoch.year() as i64).checked_add(total.div_euclid(year_length))?;
        let date = self
            .calendar
            .date(i32::try_from(year).ok()?, total.rem_euclid(year_length) as u32)?;
        let midnight = Utc.from_utc_datetime(&date.and_time(self.epoch.time()));
        let fraction = Duration::milliseconds(((days - whole) * 86_400_000.0).round() as i64);
        midnight.checked_add_signed(fraction)
    }

    /// Decode a whole axis to Unix seconds. Undecodable values become NaN.
    pub fn decode_axis(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .map(|&v| self.to_epoch_seconds(v).unwrap_or(f64::NAN))
            .collect()
    }
}

/// Instant for seconds since the Unix epoch.
pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos)
}

/// ISO date (`YYYY-MM-DD`) for seconds since the Unix epoch.
pub fn iso_date(seconds: f64) -> Option<String> {
    from_epoch_seconds(seconds).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Zero-based day of year ignoring February 29.
fn noleap_day_of_year(date: NaiveDate) -> u32 {
    let month = date.month0() as usize;
    let day = if month == 1 {
        (date.day() - 1).min(27)
    } else {
        date.day() - 1
    };
    NOLEAP_MONTH_START[month] + day
}

/// Date of a zero-based day of a 365-day year.
fn noleap_date(year: i32, day_of_year: u32) -> Option<NaiveDate> {
    let month = NOLEAP_MONTH_START
        .iter()
        .rposition(|&start| start <= day_of_year)?;
    let day = day_of_year - NOLEAP_MONTH_START[month] + 1;
    NaiveDate::from_ymd_opt(year, month as u32 + 1, day)
}

fn parse_reference(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim_end_matches(" UTC").trim_end_matches('Z');
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let mut parts = s.split_whitespace();
    let date_part = parts.next()?;
    let time_part = parts.next();

    let joined = match time_part {
        Some(t) => format!("{}T{}", date_part, t),
        None if date_part.contains('T') => date_part.to_string(),
        None => format!("{}T00:00:00", date_part),
    };
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&joined, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_cf_units() {
        let enc = TimeEncoding::parse_cf("days since 1980-01-01 00:00:00").unwrap();
        assert_eq!(enc.unit, TimeUnit::Days);
        assert_eq!(enc.epoch, utc(1980, 1, 1));

        let enc = TimeEncoding::parse_cf("hours since 1900-01-01").unwrap();
        assert_eq!(enc.to_datetime(24.0), Some(utc(1900, 1, 2)));

        let enc = TimeEncoding::parse_cf("seconds since 1970-01-01T00:00:00Z").unwrap();
        assert_eq!(enc.to_epoch_seconds(60.0), Some(60.0));

        assert!(TimeEncoding::parse_cf("K").is_none());
        assert!(TimeEncoding::parse_cf("fortnights since 1980-01-01").is_none());
    }

    #[test]
    fn test_magnitude_inference() {
        let reference = utc(1900, 1, 1);
        let secs = [1.5778368e9, 1.5779232e9];
        assert_eq!(
            TimeEncoding::infer(&secs, reference).unwrap().unit,
            TimeUnit::Seconds
        );

        let nanos = [1.5778368e18];
        let enc = TimeEncoding::infer(&nanos, reference).unwrap();
        assert_eq!(enc.unit, TimeUnit::Nanoseconds);
        assert_eq!(enc.to_datetime(nanos[0]), Some(utc(2020, 1, 1)));

        let days = [43_829.0];
        let enc = TimeEncoding::infer(&days, reference).unwrap();
        assert_eq!(enc.unit, TimeUnit::Days);
        assert_eq!(enc.to_datetime(days[0]), Some(utc(2020, 1, 1)));

        assert!(TimeEncoding::infer(&[f64::NAN], reference).is_none());
        assert!(TimeEncoding::infer(&[], reference).is_none());
    }

    #[test]
    fn test_noleap_calendar_skips_leap_day() {
        let enc = TimeEncoding::new(TimeUnit::Days, utc(1980, 1, 1)).with_calendar(Calendar::NoLeap);
        // Day 59 of a 365-day year is March 1 even in a leap year
        assert_eq!(enc.to_datetime(59.0), Some(utc(1980, 3, 1)));
        assert_eq!(enc.to_datetime(365.0), Some(utc(1981, 1, 1)));
        assert_eq!(enc.to_datetime(364.5).map(|d| d.date_naive()), Some(utc(1980, 12, 31).date_naive()));
    }

    #[test]
    fn test_360_day_calendar() {
        assert_eq!(Calendar::parse("360_day"), Calendar::Day360);
        let enc = TimeEncoding::new(TimeUnit::Days, utc(2000, 1, 1)).with_calendar(Calendar::Day360);
        assert_eq!(enc.to_datetime(30.0), Some(utc(2000, 2, 1)));
        // February 30 has no Gregorian date
        assert_eq!(enc.to_datetime(59.0), Some(utc(2000, 2, 29)));
        assert_eq!(enc.to_datetime(60.0), Some(utc(2000, 3, 1)));
        assert_eq!(enc.to_datetime(360.0), Some(utc(2001, 1, 1)));
        assert_eq!(enc.to_datetime(-1.0), Some(utc(1999, 12, 30)));
        assert_eq!(
            enc.to_epoch_seconds(360.0),
            Some(epoch_seconds(&utc(2001, 1, 1)))
        );
    }

    #[test]
    fn test_fixed_year_calendar_overflow_is_undecodable() {
        for calendar in [Calendar::NoLeap, Calendar::Day360] {
            let enc = TimeEncoding::new(TimeUnit::Days, utc(1980, 6, 1)).with_calendar(calendar);
            assert_eq!(enc.to_datetime(1e300), None);
            assert_eq!(enc.to_datetime(-1e300), None);
            assert!(enc.decode_axis(&[1e300])[0].is_nan());
        }
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(iso_date(0.0).as_deref(), Some("1970-01-01"));
        assert_eq!(iso_date(f64::NAN), None);
    }
}
