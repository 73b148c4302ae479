//! # UTC Instants
//!
//! Every astronomical calculation in the crate takes an [`Instant`]. It can
//! only be built from values that carry an explicit UTC offset, so a timestamp
//! is never silently read as local time.

use crate::{Result, TerminatorError};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Julian Day of the J2000.0 epoch (2000-01-01T12:00:00 UTC).
pub const J2000_JD: f64 = 2_451_545.0;

/// Julian Day of the Unix epoch (1970-01-01T00:00:00 UTC).
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;

/// An immutable point in time, always in UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Instant(DateTime<Utc>);

impl Instant {
    /// Current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_utc(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Convert a zoned timestamp to UTC.
    pub fn from_datetime<Tz: TimeZone>(datetime: &DateTime<Tz>) -> Self {
        Self(datetime.with_timezone(&Utc))
    }

    /// Build an instant from calendar fields interpreted as UTC.
    pub fn from_ymd_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Result<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
            .ok_or_else(|| {
                TerminatorError::InvalidInput(format!(
                    "no such UTC time: {year:04}-{month:02}-{day:02} {hour:02}:{min:02}:{sec:02}"
                ))
            })
    }

    /// Parse an RFC 3339 timestamp such as `2024-03-20T12:00:00Z`.
    ///
    /// A timestamp without an offset (`2024-03-20T12:00:00`) is rejected with
    /// [`TerminatorError::InvalidInput`].
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        match DateTime::parse_from_rfc3339(text) {
            Ok(datetime) => Ok(Self::from_datetime(&datetime)),
            Err(err) => {
                if text.parse::<NaiveDateTime>().is_ok() {
                    Err(TerminatorError::InvalidInput(format!(
                        "timestamp '{text}' has no UTC offset"
                    )))
                } else {
                    Err(TerminatorError::InvalidInput(format!(
                        "timestamp '{text}' is not RFC 3339: {err}"
                    )))
                }
            }
        }
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Seconds since the Unix epoch, including the sub-second part.
    pub fn unix_seconds(&self) -> f64 {
        self.0.timestamp() as f64 + f64::from(self.0.timestamp_subsec_nanos()) * 1e-9
    }

    /// Julian Day (UT) of this instant.
    pub fn julian_day(&self) -> f64 {
        UNIX_EPOCH_JD + self.unix_seconds() / SECONDS_PER_DAY
    }

    /// Days since J2000.0, the `n` of the low-precision sun formulas.
    pub fn days_since_j2000(&self) -> f64 {
        // Subtract in whole seconds first to keep precision for recent dates
        let j2000_unix = (J2000_JD - UNIX_EPOCH_JD) * SECONDS_PER_DAY;
        (self.unix_seconds() - j2000_unix) / SECONDS_PER_DAY
    }

    /// Julian centuries since J2000.0.
    pub fn julian_centuries(&self) -> f64 {
        self.days_since_j2000() / DAYS_PER_JULIAN_CENTURY
    }

    /// Shift by `step`, failing if the result leaves chrono's range.
    pub fn checked_add(&self, step: Duration) -> Result<Self> {
        self.0
            .checked_add_signed(step)
            .map(Self)
            .ok_or_else(|| TerminatorError::InvalidInput(format!("{self} + {step} overflows")))
    }

    /// Exact time from `earlier` to `self` (negative if `earlier` is later).
    pub fn elapsed_since(&self, earlier: &Instant) -> Duration {
        self.0 - earlier.0
    }

    /// Seconds elapsed from `earlier` to `self` (negative if `earlier` is later).
    pub fn seconds_since(&self, earlier: &Instant) -> f64 {
        let elapsed = self.elapsed_since(earlier);
        match elapsed.num_nanoseconds() {
            Some(ns) => ns as f64 / 1e9,
            // Beyond ~292 years
            None => elapsed.num_milliseconds() as f64 / 1e3,
        }
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl From<DateTime<Utc>> for Instant {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_j2000_epoch() {
        let epoch = Instant::from_ymd_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert!((epoch.julian_day() - J2000_JD).abs() < 1e-9);
        assert!(epoch.days_since_j2000().abs() < 1e-12);
        assert!(epoch.julian_centuries().abs() < 1e-12);
    }

    #[test]
    fn test_days_since_j2000_equinox() {
        // 24 years incl. 6 leap days, plus Jan 1 -> Mar 20 of a leap year
        let equinox = Instant::parse("2024-03-20T12:00:00Z").unwrap();
        assert!((equinox.days_since_j2000() - 8845.0).abs() < 1e-9);
        assert!((equinox.julian_day() - 2_460_390.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_with_offset_converts_to_utc() {
        let tokyo = Instant::parse("2024-03-20T21:00:00+09:00").unwrap();
        let utc = Instant::parse("2024-03-20T12:00:00Z").unwrap();
        assert_eq!(tokyo, utc);
        assert_eq!(tokyo.to_string(), "2024-03-20T12:00:00Z");
    }

    #[test]
    fn test_parse_rejects_missing_offset() {
        let err = Instant::parse("2024-03-20T12:00:00").unwrap_err();
        match err {
            TerminatorError::InvalidInput(msg) => assert!(msg.contains("no UTC offset")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Instant::parse("yesterday"),
            Err(TerminatorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_calendar_fields() {
        assert!(Instant::from_ymd_hms(2023, 2, 29, 0, 0, 0).is_err());
    }

    #[test]
    fn test_checked_add_and_elapsed() {
        let start = Instant::from_ymd_hms(2025, 7, 24, 0, 0, 0).unwrap();
        let later = start.checked_add(Duration::hours(6)).unwrap();
        assert_eq!(later.seconds_since(&start), 6.0 * 3600.0);
        assert_eq!(start.seconds_since(&later), -6.0 * 3600.0);
    }

    #[test]
    fn test_sub_second_elapsed_is_exact() {
        let start = Instant::parse("2024-03-20T12:00:00Z").unwrap();
        let later = start.checked_add(Duration::milliseconds(100)).unwrap();
        assert_eq!(later.elapsed_since(&start), Duration::milliseconds(100));
        assert_eq!(later.seconds_since(&start), 0.1);
        assert_eq!(start.seconds_since(&later), -0.1);
    }
}
