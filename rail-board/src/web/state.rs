//! Application state for the web layer.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::AppConfig;
use crate::models::{Liveboard, RoutePlanner};
use crate::provider::{
    BoardFixtureProvider, FixtureError, RouteFixtureProvider, load_boards, load_routes,
};
use crate::stations::StationDirectory;
use crate::stream::{Shared, SystemClock, event_channel, spawn_driver, supervise};

/// Liveboard served over HTTP.
pub type BoardModel = Liveboard<BoardFixtureProvider>;

/// Route planner served over HTTP.
pub type PlannerModel = RoutePlanner<RouteFixtureProvider>;

/// Shared application state.
///
/// Each model sits behind its own lock, shared with the driver task that
/// feeds it provider events.
#[derive(Clone)]
pub struct AppState {
    pub liveboard: Shared<BoardModel>,
    pub planner: Shared<PlannerModel>,
    pub stations: StationDirectory,
    /// Supervisors of the driver tasks, by stream name.
    drivers: Arc<Vec<(&'static str, JoinHandle<()>)>>,
}

impl AppState {
    /// Load fixtures, build both models and start their drivers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load(config: &AppConfig) -> Result<Self, FixtureError> {
        let boards = load_boards(config.fixtures_dir.join("boards"))?;
        let routes = load_routes(config.fixtures_dir.join("routes.json"))?;
        info!(boards = boards.len(), routes = routes.len(), "Loaded fixtures");

        let (board_sink, board_events) = event_channel();
        let board_provider = BoardFixtureProvider::new(boards, board_sink);

        let (route_sink, route_events) = event_channel();
        let route_provider = RouteFixtureProvider::new(routes, route_sink);

        let stations = StationDirectory::from_entries(
            board_provider.stations().chain(route_provider.stations()),
        );
        info!(stations = stations.len(), "Built station directory");

        let liveboard = Arc::new(Mutex::new(Liveboard::new(
            board_provider,
            SystemClock,
            config.stream.clone(),
        )));
        let planner = Arc::new(Mutex::new(RoutePlanner::new(
            route_provider,
            SystemClock,
            config.stream.clone(),
        )));

        let drivers = vec![
            (
                "liveboard",
                supervise("liveboard", spawn_driver(liveboard.clone(), board_events)),
            ),
            (
                "planner",
                supervise("planner", spawn_driver(planner.clone(), route_events)),
            ),
        ];

        Ok(Self {
            liveboard,
            planner,
            stations,
            drivers: Arc::new(drivers),
        })
    }

    /// Streams whose driver task has ended and no longer receive events.
    pub fn stopped_drivers(&self) -> Vec<&'static str> {
        self.drivers
            .iter()
            .filter(|(_, supervisor)| supervisor.is_finished())
            .map(|(name, _)| *name)
            .collect()
    }
}
