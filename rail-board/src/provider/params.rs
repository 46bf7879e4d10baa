//! Request parameters for the two stream kinds.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::{RailTime, StationId};
use crate::stream::{BoardMode, Direction, RequestParams};

/// A liveboard query: one station, one side, an optional time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardRequest {
    pub station: StationId,
    #[serde(default)]
    pub mode: BoardMode,
    /// Earliest effective time to include.
    #[serde(default)]
    pub from: Option<RailTime>,
    /// Latest effective time to include.
    #[serde(default)]
    pub until: Option<RailTime>,
}

impl BoardRequest {
    pub fn new(station: StationId, mode: BoardMode) -> Self {
        Self {
            station,
            mode,
            from: None,
            until: None,
        }
    }

    /// True if `time` falls inside the requested window. Both ends inclusive.
    pub fn covers(&self, time: RailTime) -> bool {
        self.from.is_none_or(|from| time >= from) && self.until.is_none_or(|until| time <= until)
    }
}

impl RequestParams for BoardRequest {
    fn continued(&self, direction: Direction, anchor: RailTime, window: Duration) -> Self {
        match direction {
            Direction::Later => Self {
                from: Some(anchor),
                until: None,
                ..self.clone()
            },
            Direction::Earlier => Self {
                from: anchor.checked_sub(window),
                until: Some(anchor),
                ..self.clone()
            },
        }
    }
}

/// An itinerary query between two stations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub from: StationId,
    pub to: StationId,
    /// Earliest departure to consider.
    #[serde(default)]
    pub departure_time: Option<RailTime>,
    /// Upper bound on changes; unlimited when absent.
    #[serde(default)]
    pub max_transfers: Option<usize>,
    /// Only routes departing at or before this time.
    #[serde(default)]
    pub depart_before: Option<RailTime>,
}

impl RouteRequest {
    pub fn new(from: StationId, to: StationId) -> Self {
        Self {
            from,
            to,
            departure_time: None,
            max_transfers: None,
            depart_before: None,
        }
    }

    pub fn departing_at(mut self, time: RailTime) -> Self {
        self.departure_time = Some(time);
        self
    }

    pub fn with_max_transfers(mut self, max: usize) -> Self {
        self.max_transfers = Some(max);
        self
    }
}

impl RequestParams for RouteRequest {
    fn continued(&self, direction: Direction, anchor: RailTime, window: Duration) -> Self {
        match direction {
            Direction::Later => Self {
                departure_time: Some(anchor),
                depart_before: None,
                ..self.clone()
            },
            Direction::Earlier => Self {
                departure_time: anchor.checked_sub(window),
                depart_before: Some(anchor),
                ..self.clone()
            },
        }
    }
}
