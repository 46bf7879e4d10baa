//! Liveboard provider replaying station boards from fixtures.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, warn};

use crate::domain::{RailTime, StationId, VehicleStop};
use crate::stream::{
    BoardPolicy, Direction, EventSink, Generation, OrderingPolicy, Provider, ProviderError,
    RequestHandle,
};

use super::fixture::{self, BoardFixture, Handles};
use super::params::BoardRequest;

/// Serves liveboards from loaded fixtures.
///
/// Answers are emitted synchronously into the event sink when a request is
/// issued; the stream picks them up through its driver.
pub struct BoardFixtureProvider {
    boards: HashMap<StationId, BoardFixture>,
    sink: EventSink<VehicleStop>,
    handles: Handles<BoardRequest>,
    page_size: Option<usize>,
}

impl BoardFixtureProvider {
    pub fn new(boards: HashMap<StationId, BoardFixture>, sink: EventSink<VehicleStop>) -> Self {
        Self {
            boards,
            sink,
            handles: Handles::default(),
            page_size: None,
        }
    }

    /// Cap the number of entries per answer.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Stations with a board.
    pub fn stations(&self) -> impl Iterator<Item = (&StationId, &str)> {
        self.boards.iter().map(|(id, b)| (id, b.name.as_str()))
    }

    /// Apply a correction to the fixture data and push it to every watched
    /// request whose board carries the same stop.
    ///
    /// Returns the number of requests notified.
    pub fn publish_correction(&mut self, stop: VehicleStop) -> Result<usize, ProviderError> {
        let mut touched = Vec::new();
        for board in self.boards.values_mut() {
            if let Some(existing) = board.stops.iter_mut().find(|s| s.uri == stop.uri) {
                *existing = stop.clone();
                touched.push(board.station.clone());
            }
        }

        let targets: Vec<RequestHandle> = self
            .handles
            .watched()
            .filter(|(_, params)| touched.contains(&params.station))
            .map(|(handle, _)| *handle)
            .collect();

        let now = Utc::now();
        for handle in &targets {
            fixture::correct(&self.sink, handle, now, stop.clone())?;
        }
        debug!(uri = %stop.uri, notified = targets.len(), "Published board correction");
        Ok(targets.len())
    }

    fn answer(&self, params: &BoardRequest) -> Option<(Vec<VehicleStop>, Option<RailTime>)> {
        let board = self.boards.get(&params.station)?;
        let policy = BoardPolicy::new(params.mode);

        let candidates = board
            .stops
            .iter()
            .enumerate()
            .filter_map(|(i, stop)| match policy.keys(stop) {
                Ok(keys) => params.covers(keys.effective).then_some((i, Some(keys.effective))),
                // Passed through so the stream can report it.
                Err(_) => Some((i, None)),
            })
            .collect::<Vec<_>>();
        let earliest = candidates.iter().filter_map(|(_, t)| *t).min();

        let from_end = params.until.is_some() && params.from.is_some();
        let records = fixture::select_page(candidates, self.page_size, from_end)
            .into_iter()
            .map(|i| board.stops[i].clone())
            .collect();
        Some((records, params.from.or(earliest)))
    }
}

impl Provider for BoardFixtureProvider {
    type Params = BoardRequest;
    type Record = VehicleStop;

    fn request(&mut self, params: &BoardRequest, generation: Generation) -> Result<RequestHandle, ProviderError> {
        let handle = self.handles.issue(generation, params.clone());

        let Some((records, progress)) = self.answer(params) else {
            let err = ProviderError::UnknownStation(params.station.clone());
            warn!(station = %params.station, "No board fixture for station");
            fixture::fail(&self.sink, generation, &err)?;
            return Ok(handle);
        };

        debug!(
            station = %params.station,
            mode = ?params.mode,
            count = records.len(),
            direction = ?direction_of(params),
            "Replaying board"
        );
        let uri = fixture::progress_uri(&format!("liveboard/{}", params.station), progress);
        fixture::replay(&self.sink, generation, uri, records)?;
        Ok(handle)
    }

    fn abort(&mut self, handle: &RequestHandle) {
        self.handles.forget(handle);
    }

    fn watch(&mut self, handle: &RequestHandle) {
        self.handles.watch(handle);
    }

    fn unwatch(&mut self, handle: &RequestHandle) {
        self.handles.forget(handle);
    }
}

fn direction_of(params: &BoardRequest) -> Option<Direction> {
    match (params.from, params.until) {
        (Some(_), Some(_)) => Some(Direction::Earlier),
        (Some(_), None) => Some(Direction::Later),
        _ => None,
    }
}
