//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{RailTime, Route, StationId, VehicleStop};
use crate::provider::{BoardFixtureProvider, RouteFixtureProvider};
use crate::models::{Liveboard, RoutePlanner};
use crate::stations::StationMatch;
use crate::stream::{BoardMode, Direction, RequestState};

/// Query for station search.
#[derive(Debug, Deserialize)]
pub struct StationSearchRequest {
    /// Part of a station name
    #[serde(default)]
    pub q: String,

    /// Maximum number of results
    pub limit: Option<usize>,
}

/// Station search results, best first.
#[derive(Debug, Serialize)]
pub struct StationSearchResponse {
    pub stations: Vec<StationMatch>,
}

/// Request to load a liveboard.
#[derive(Debug, Deserialize)]
pub struct BoardStartRequest {
    /// Station identifier
    pub station: String,

    /// Departures (default) or arrivals
    #[serde(default)]
    pub mode: BoardMode,
}

/// Request to plan routes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStartRequest {
    pub from: String,
    pub to: String,

    /// Earliest departure, RFC 3339
    pub departure_time: Option<RailTime>,

    /// Maximum number of changes
    pub max_transfers: Option<usize>,
}

/// Request to page a list.
#[derive(Debug, Deserialize)]
pub struct ExtendRequest {
    pub direction: Direction,
}

/// Accepted start or extend.
#[derive(Debug, Serialize)]
pub struct StartedResponse {
    /// Generation of the request that was issued
    pub generation: u64,
}

/// Result of pushing a correction.
#[derive(Debug, Serialize)]
pub struct CorrectionResponse {
    /// Number of watched requests that received it
    pub notified: usize,
}

/// Lifecycle fields shared by every list view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleView {
    pub state: RequestState,
    pub busy: bool,
    pub valid: bool,
    pub last_latency_millis: Option<i64>,
    pub last_error: Option<String>,
    pub from: Option<RailTime>,
    pub until: Option<RailTime>,
    pub count: usize,
}

/// The current liveboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub station: Option<StationId>,
    pub station_name: Option<String>,
    pub mode: BoardMode,
    #[serde(flatten)]
    pub lifecycle: LifecycleView,
    pub entries: Vec<VehicleStop>,
}

/// The current route search.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteView {
    pub from: Option<StationId>,
    pub to: Option<StationId>,
    #[serde(flatten)]
    pub lifecycle: LifecycleView,
    pub entries: Vec<Route>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

// Conversion implementations

impl BoardView {
    /// Snapshot a liveboard. `station_name` comes from the directory.
    pub fn from_liveboard(board: &Liveboard<BoardFixtureProvider>, station_name: Option<String>) -> Self {
        Self {
            station: board.station().cloned(),
            station_name,
            mode: board.mode(),
            lifecycle: LifecycleView {
                state: board.state(),
                busy: board.busy(),
                valid: board.valid(),
                last_latency_millis: board.last_latency_millis(),
                last_error: board.last_error().map(str::to_string),
                from: board.from(),
                until: board.until(),
                count: board.count(),
            },
            entries: board.entries(),
        }
    }
}

impl RouteView {
    /// Snapshot a route search.
    pub fn from_planner(planner: &RoutePlanner<RouteFixtureProvider>) -> Self {
        let request = planner.request();
        Self {
            from: request.map(|r| r.from.clone()),
            to: request.map(|r| r.to.clone()),
            lifecycle: LifecycleView {
                state: planner.state(),
                busy: planner.busy(),
                valid: planner.valid(),
                last_latency_millis: planner.last_latency_millis(),
                last_error: planner.last_error().map(str::to_string),
                from: planner.from(),
                until: planner.until(),
                count: planner.count(),
            },
            entries: planner.entries(),
        }
    }
}
