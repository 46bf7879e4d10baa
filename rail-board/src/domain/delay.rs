//! Delay type.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A signed offset in seconds between scheduled and observed time.
///
/// Zero means on time; negative values are early running.
///
/// # Examples
///
/// ```
/// use rail_board::domain::Delay;
///
/// assert_eq!(Delay::from_mins(5).to_string(), "+0H05");
/// assert_eq!(Delay::from_mins(75).to_string(), "+1H15");
/// assert!(Delay::ON_TIME.is_on_time());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delay(i64);

impl Delay {
    /// No delay.
    pub const ON_TIME: Delay = Delay(0);

    /// Create a delay from seconds.
    pub const fn from_secs(secs: i64) -> Self {
        Delay(secs)
    }

    /// Create a delay from whole minutes.
    pub const fn from_mins(mins: i64) -> Self {
        Delay(mins * 60)
    }

    /// Returns the delay in seconds.
    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Returns the delay as a chrono duration, or `None` if it does not
    /// fit one.
    pub fn as_duration(&self) -> Option<Duration> {
        Duration::try_seconds(self.0)
    }

    /// Returns true if there is no delay.
    pub fn is_on_time(&self) -> bool {
        self.0 == 0
    }
}

/// Renders as `+{hours}H{minutes:02}`, the compact form used on boards.
impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { '-' } else { '+' };
        let total_mins = self.0.unsigned_abs() / 60;
        write!(f, "{sign}{}H{:02}", total_mins / 60, total_mins % 60)
    }
}
