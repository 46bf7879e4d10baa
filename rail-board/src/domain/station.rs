//! Station identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned when parsing an invalid station identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station id: {reason}")]
pub struct InvalidStationId {
    reason: &'static str,
}

/// A station URI, e.g. `http://irail.be/stations/NMBS/008814001`.
///
/// The routing engine identifies stations by URI. The only validation is
/// that the identifier is non-empty and carries no whitespace, so it can be
/// embedded in request URIs unchanged.
///
/// # Examples
///
/// ```
/// use rail_board::domain::StationId;
///
/// let id = StationId::parse("http://irail.be/stations/NMBS/008814001").unwrap();
/// assert_eq!(id.as_str(), "http://irail.be/stations/NMBS/008814001");
///
/// assert!(StationId::parse("").is_err());
/// assert!(StationId::parse("a b").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    /// Parse a station identifier.
    pub fn parse(s: &str) -> Result<Self, InvalidStationId> {
        if s.is_empty() {
            return Err(InvalidStationId {
                reason: "station id cannot be empty",
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(InvalidStationId {
                reason: "station id cannot contain whitespace",
            });
        }
        Ok(StationId(s.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StationId {
    type Error = InvalidStationId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StationId::parse(&value)
    }
}

impl From<StationId> for String {
    fn from(value: StationId) -> Self {
        value.0
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
