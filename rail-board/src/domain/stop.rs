//! Vehicle stop events shown on a liveboard.
//!
//! A `VehicleStop` is one vehicle calling at the board's station, with the
//! scheduled arrival/departure times and the delays the routing engine
//! currently reports for them.

use serde::{Deserialize, Serialize};

use super::{Delay, RailTime};

/// What the vehicle does at the stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopType {
    /// Origin of the vehicle: only a departure.
    Departure,
    /// Terminus of the vehicle: only an arrival.
    Arrival,
    /// Intermediate stop.
    #[default]
    Stop,
}

/// Crowd estimate reported for a stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OccupancyLevel {
    #[default]
    Unsupported,
    Low,
    Medium,
    High,
}

fn platform_normal_default() -> bool {
    true
}

/// A vehicle calling at a station.
///
/// `arrival_time` and `departure_time` are scheduled times. The observed
/// time of each side is the scheduled time shifted by its delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStop {
    /// Stable URI of this stop event.
    pub uri: String,
    /// URI of the trip the vehicle is running.
    #[serde(default)]
    pub trip_uri: Option<String>,
    /// Final destination shown on the vehicle.
    pub headsign: String,
    #[serde(default)]
    pub arrival_time: Option<RailTime>,
    #[serde(default)]
    pub arrival_delay: Delay,
    #[serde(default)]
    pub is_arrival_canceled: bool,
    #[serde(default)]
    pub departure_time: Option<RailTime>,
    #[serde(default)]
    pub departure_delay: Delay,
    #[serde(default)]
    pub is_departure_canceled: bool,
    #[serde(default)]
    pub platform: Option<String>,
    /// False when the vehicle uses a different platform than planned.
    #[serde(default = "platform_normal_default")]
    pub is_platform_normal: bool,
    /// True once the vehicle has left the station.
    #[serde(default)]
    pub has_left: bool,
    #[serde(default)]
    pub stop_type: StopType,
    #[serde(default)]
    pub occupancy: OccupancyLevel,
    /// True for stops added outside the timetable.
    #[serde(default)]
    pub is_extra_stop: bool,
}

impl VehicleStop {
    /// Creates an on-time stop with only the identity and headsign set.
    pub fn new(uri: impl Into<String>, headsign: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            trip_uri: None,
            headsign: headsign.into(),
            arrival_time: None,
            arrival_delay: Delay::ON_TIME,
            is_arrival_canceled: false,
            departure_time: None,
            departure_delay: Delay::ON_TIME,
            is_departure_canceled: false,
            platform: None,
            is_platform_normal: true,
            has_left: false,
            stop_type: StopType::Stop,
            occupancy: OccupancyLevel::Unsupported,
            is_extra_stop: false,
        }
    }

    /// Sets the scheduled departure time.
    pub fn with_departure(mut self, time: RailTime, delay: Delay) -> Self {
        self.departure_time = Some(time);
        self.departure_delay = delay;
        self
    }

    /// Sets the scheduled arrival time.
    pub fn with_arrival(mut self, time: RailTime, delay: Delay) -> Self {
        self.arrival_time = Some(time);
        self.arrival_delay = delay;
        self
    }

    /// Observed departure time (scheduled plus delay). `None` without a
    /// departure or when the delay is out of range.
    ///
    /// ```
    /// use rail_board::domain::{Delay, RailTime, VehicleStop};
    /// use chrono::NaiveDate;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    /// let stop = VehicleStop::new("urn:stop:1", "Oostende")
    ///     .with_departure(RailTime::parse_hhmm("10:00", date).unwrap(), Delay::from_mins(4));
    /// assert_eq!(stop.observed_departure().unwrap().to_string(), "10:04");
    /// assert!(stop.observed_arrival().is_none());
    /// ```
    pub fn observed_departure(&self) -> Option<RailTime> {
        self.departure_time
            .and_then(|t| t.delayed_by(self.departure_delay))
    }

    /// Observed arrival time (scheduled plus delay).
    pub fn observed_arrival(&self) -> Option<RailTime> {
        self.arrival_time.and_then(|t| t.delayed_by(self.arrival_delay))
    }
}
