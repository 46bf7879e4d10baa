//! Itinerary types.
//!
//! A `Route` is one itinerary candidate computed by the routing engine: an
//! ordered list of `Transfer`s from the departure station to the arrival
//! station, each boarding, alighting or changing vehicle.

use std::collections::HashSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{Delay, DomainError, RailTime, StationId};

/// Role of a transfer within a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferKind {
    /// Boarding the first vehicle.
    Departure,
    /// Alighting from the last vehicle.
    Arrival,
    /// Changing vehicles.
    #[default]
    Transfer,
}

fn platform_normal_default() -> bool {
    true
}

/// A point in a route where the traveller boards, alights or changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub station: StationId,
    pub station_name: String,
    /// Scheduled time at this point.
    pub time: RailTime,
    #[serde(default)]
    pub delay: Delay,
    #[serde(default)]
    pub is_canceled: bool,
    /// Vehicle boarded (or alighted from, for the arrival).
    #[serde(default)]
    pub vehicle_uri: Option<String>,
    #[serde(default)]
    pub vehicle_headsign: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default = "platform_normal_default")]
    pub is_platform_normal: bool,
    /// True once this point lies in the past.
    #[serde(default)]
    pub is_passed: bool,
    #[serde(default)]
    pub kind: TransferKind,
}

impl Transfer {
    /// Creates an on-time transfer.
    pub fn new(
        kind: TransferKind,
        station: StationId,
        station_name: impl Into<String>,
        time: RailTime,
    ) -> Self {
        Self {
            station,
            station_name: station_name.into(),
            time,
            delay: Delay::ON_TIME,
            is_canceled: false,
            vehicle_uri: None,
            vehicle_headsign: None,
            platform: None,
            is_platform_normal: true,
            is_passed: false,
            kind,
        }
    }

    /// Sets the vehicle for this transfer.
    pub fn with_vehicle(mut self, uri: impl Into<String>, headsign: impl Into<String>) -> Self {
        self.vehicle_uri = Some(uri.into());
        self.vehicle_headsign = Some(headsign.into());
        self
    }

    /// Sets the delay for this transfer.
    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }

    /// Observed time (scheduled plus delay), `None` if the delay is out of
    /// range.
    pub fn observed_time(&self) -> Option<RailTime> {
        self.time.delayed_by(self.delay)
    }
}

/// An itinerary between two stations.
///
/// # Invariants
///
/// Routes built with [`Route::new`] have at least one transfer. Routes
/// deserialized from the engine are not checked here; consumers that need
/// the invariant validate with [`Route::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub transfers: Vec<Transfer>,
}

impl Route {
    /// Builds a route, rejecting an empty transfer list.
    pub fn new(transfers: Vec<Transfer>) -> Result<Self, DomainError> {
        let route = Route { transfers };
        route.validate()?;
        Ok(route)
    }

    /// Checks the route has at least one transfer.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.transfers.is_empty() {
            return Err(DomainError::EmptyRoute);
        }
        Ok(())
    }

    /// First transfer of the route.
    pub fn departure(&self) -> Option<&Transfer> {
        self.transfers.first()
    }

    /// Last transfer of the route.
    pub fn arrival(&self) -> Option<&Transfer> {
        self.transfers.last()
    }

    /// Observed departure time.
    pub fn departure_time(&self) -> Option<RailTime> {
        self.departure().and_then(Transfer::observed_time)
    }

    /// Observed arrival time.
    pub fn arrival_time(&self) -> Option<RailTime> {
        self.arrival().and_then(Transfer::observed_time)
    }

    /// Observed travel time from departure to arrival.
    pub fn duration(&self) -> Option<Duration> {
        Some(
            self.arrival_time()?
                .signed_duration_since(self.departure_time()?),
        )
    }

    /// Number of vehicle changes (distinct vehicles minus one).
    ///
    /// ```
    /// use rail_board::domain::{RailTime, Route, StationId, Transfer, TransferKind};
    /// use chrono::NaiveDate;
    ///
    /// let d = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    /// let t = |s| RailTime::parse_hhmm(s, d).unwrap();
    /// let st = |s| StationId::parse(s).unwrap();
    ///
    /// let route = Route::new(vec![
    ///     Transfer::new(TransferKind::Departure, st("GENT"), "Gent", t("10:00")).with_vehicle("IC1", "Brussel"),
    ///     Transfer::new(TransferKind::Transfer, st("BRUS"), "Brussel", t("10:30")).with_vehicle("IC2", "Leuven"),
    ///     Transfer::new(TransferKind::Arrival, st("LEUV"), "Leuven", t("11:00")).with_vehicle("IC2", "Leuven"),
    /// ]).unwrap();
    /// assert_eq!(route.change_count(), 1);
    /// ```
    pub fn change_count(&self) -> usize {
        let vehicles: HashSet<&str> = self
            .transfers
            .iter()
            .filter_map(|t| t.vehicle_uri.as_deref())
            .collect();
        vehicles.len().saturating_sub(1)
    }

    /// Returns true if any point of the route is cancelled.
    pub fn is_canceled(&self) -> bool {
        self.transfers.iter().any(|t| t.is_canceled)
    }
}
