//! Ordering and identity rules for streamed records.
//!
//! An `OrderingPolicy` turns a record into the handful of keys the
//! consolidation engine needs: where it sorts (`effective`), which real
//! world event it describes (`identity` + `scheduled`) and whether a
//! re-emission changed anything visible (`delay`, `canceled`).
//!
//! Identity deliberately ignores the effective time. A delay correction
//! moves a record's effective time but it is still the same departure, so
//! matching is done on the delay-independent scheduled times.

use crate::domain::{Delay, DomainError, RailTime, Route, VehicleStop};

/// Keys derived from one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKeys {
    /// Stable identifier of the real-world event, when the record has one.
    pub identity: Option<String>,
    /// Delay-independent (start, end) times.
    pub scheduled: (RailTime, RailTime),
    /// Sort key: observed time including delay.
    pub effective: RailTime,
    pub delay: Delay,
    pub canceled: bool,
}

impl RecordKeys {
    /// True if both keys describe the same real-world event.
    ///
    /// Scheduled times must match. Identities must match too, unless either
    /// side has none, in which case the scheduled pair decides alone.
    pub fn same_event(&self, other: &RecordKeys) -> bool {
        if self.scheduled != other.scheduled {
            return false;
        }
        match (&self.identity, &other.identity) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    /// True if a re-emission carries nothing new for display.
    pub fn same_status(&self, other: &RecordKeys) -> bool {
        self.delay == other.delay && self.canceled == other.canceled
    }
}

/// Strategy extracting ordering and identity keys from a record type.
///
/// Implementations are pure: the same record always yields the same keys.
pub trait OrderingPolicy {
    /// The record type this policy understands.
    type Record;

    /// Short name used in logs and latency measurements.
    fn name(&self) -> &'static str;

    /// Derive the keys for a record.
    ///
    /// Fails with a [`DomainError`] when the record lacks the time data
    /// needed to place it.
    fn keys(&self, record: &Self::Record) -> Result<RecordKeys, DomainError>;

    /// Human-readable subject of an update notification (destination).
    fn headline(&self, record: &Self::Record) -> String;
}

/// Which side of a stop a liveboard is sorted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoardMode {
    #[default]
    Departures,
    Arrivals,
}

/// Policy for liveboard entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardPolicy {
    pub mode: BoardMode,
}

impl BoardPolicy {
    pub fn new(mode: BoardMode) -> Self {
        Self { mode }
    }
}

impl OrderingPolicy for BoardPolicy {
    type Record = VehicleStop;

    fn name(&self) -> &'static str {
        "liveboard"
    }

    fn keys(&self, stop: &VehicleStop) -> Result<RecordKeys, DomainError> {
        let departure = stop
            .departure_time
            .map(|t| (t, stop.departure_delay, stop.is_departure_canceled));
        let arrival = stop
            .arrival_time
            .map(|t| (t, stop.arrival_delay, stop.is_arrival_canceled));

        // Origins have no arrival and termini no departure, so fall back
        // to the other side rather than dropping them from the board.
        let primary = match self.mode {
            BoardMode::Departures => departure.or(arrival),
            BoardMode::Arrivals => arrival.or(departure),
        };
        let (scheduled, delay, canceled) =
            primary.ok_or(DomainError::MissingTime("departure or arrival"))?;
        let effective = scheduled
            .delayed_by(delay)
            .ok_or(DomainError::DelayOutOfRange(delay.as_secs()))?;

        Ok(RecordKeys {
            identity: Some(stop.uri.clone()),
            scheduled: (scheduled, scheduled),
            effective,
            delay,
            canceled,
        })
    }

    fn headline(&self, stop: &VehicleStop) -> String {
        stop.headsign.clone()
    }
}

/// Policy for itinerary candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutePolicy;

impl OrderingPolicy for RoutePolicy {
    type Record = Route;

    fn name(&self) -> &'static str {
        "router"
    }

    fn keys(&self, route: &Route) -> Result<RecordKeys, DomainError> {
        route.validate()?;
        let (Some(departure), Some(arrival)) = (route.departure(), route.arrival()) else {
            return Err(DomainError::EmptyRoute);
        };

        let vehicles: Vec<&str> = route
            .transfers
            .iter()
            .filter_map(|t| t.vehicle_uri.as_deref())
            .fold(Vec::new(), |mut acc, uri| {
                if acc.last() != Some(&uri) {
                    acc.push(uri);
                }
                acc
            });
        let identity = (!vehicles.is_empty()).then(|| vehicles.join(">"));

        Ok(RecordKeys {
            identity,
            scheduled: (departure.time, arrival.time),
            effective: departure
                .observed_time()
                .ok_or(DomainError::DelayOutOfRange(departure.delay.as_secs()))?,
            delay: departure.delay,
            canceled: route.is_canceled(),
        })
    }

    fn headline(&self, route: &Route) -> String {
        route
            .arrival()
            .map(|t| t.station_name.clone())
            .unwrap_or_default()
    }
}
