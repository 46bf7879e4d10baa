//! Rail time handling.
//!
//! The routing engine reports every stop time as an absolute UTC instant
//! with a separate delay. This module wraps those instants so the rest of
//! the crate can order them, shift them by a delay and print them as
//! "HH:MM" without touching chrono directly.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use super::Delay;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// An absolute point in time on the rail network.
///
/// Ordering is chronological. Two times on different dates compare by
/// date first, so a board spanning midnight still sorts correctly.
///
/// # Examples
///
/// ```
/// use rail_board::domain::RailTime;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
/// let time = RailTime::parse_hhmm("14:30", date).unwrap();
/// assert_eq!(time.to_string(), "14:30");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RailTime(DateTime<Utc>);

impl RailTime {
    /// Wrap a UTC instant.
    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Build a time from a date and a time of day (interpreted as UTC).
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self(Utc.from_utc_datetime(&date.and_time(time)))
    }

    /// Parse a time from "HH:MM" format on the given date.
    ///
    /// # Examples
    ///
    /// ```
    /// use rail_board::domain::RailTime;
    /// use chrono::NaiveDate;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    ///
    /// assert!(RailTime::parse_hhmm("00:00", date).is_ok());
    /// assert!(RailTime::parse_hhmm("23:59", date).is_ok());
    ///
    /// assert!(RailTime::parse_hhmm("1430", date).is_err());
    /// assert!(RailTime::parse_hhmm("25:00", date).is_err());
    /// ```
    pub fn parse_hhmm(s: &str, date: NaiveDate) -> Result<Self, TimeError> {
        if s.len() != 5 {
            return Err(TimeError::new("expected HH:MM format"));
        }

        let bytes = s.as_bytes();
        if bytes[2] != b':' {
            return Err(TimeError::new("expected colon at position 2"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }

        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| TimeError::new("invalid time"))?;

        Ok(Self::new(date, time))
    }

    /// Parse an RFC 3339 timestamp such as `2018-10-02T10:00:00.000Z`.
    pub fn parse_rfc3339(s: &str) -> Result<Self, TimeError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|_| TimeError::new("expected an RFC 3339 timestamp"))
    }

    /// Returns the underlying UTC instant.
    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    /// Returns the date component.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Returns the hour (0-23).
    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Format as RFC 3339 with millisecond precision, the form the routing
    /// engine expects in request URIs.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }

    /// Add a duration, returning `None` on overflow.
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        self.0.checked_add_signed(duration).map(Self)
    }

    /// Subtract a duration, returning `None` on overflow.
    pub fn checked_sub(&self, duration: Duration) -> Option<Self> {
        self.0.checked_sub_signed(duration).map(Self)
    }

    /// The observed time once `delay` is applied, or `None` when the
    /// result falls outside the representable range.
    ///
    /// ```
    /// use rail_board::domain::{Delay, RailTime};
    /// use chrono::NaiveDate;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    /// let t = RailTime::parse_hhmm("10:00", date).unwrap();
    /// assert_eq!(t.delayed_by(Delay::from_mins(5)).unwrap().to_string(), "10:05");
    /// assert!(t.delayed_by(Delay::from_secs(i64::MAX / 10)).is_none());
    /// ```
    pub fn delayed_by(&self, delay: Delay) -> Option<Self> {
        self.checked_add(delay.as_duration()?)
    }

    /// Returns the duration between two times.
    ///
    /// Returns a negative duration if `other` is after `self`.
    pub fn signed_duration_since(&self, other: Self) -> Duration {
        self.0.signed_duration_since(other.0)
    }
}

impl Add<Duration> for RailTime {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        self.checked_add(rhs).unwrap_or(self)
    }
}

impl From<DateTime<Utc>> for RailTime {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Debug for RailTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RailTime({} {:02}:{:02})",
            self.date(),
            self.hour(),
            self.minute()
        )
    }
}

impl fmt::Display for RailTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}
