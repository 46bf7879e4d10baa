//! Fixture files and the request bookkeeping shared by fixture providers.
//!
//! Boards live in `<dir>/boards/*.json`, one station per file. Routes live
//! in `<dir>/routes.json` as a flat array.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::form_urlencoded;

use crate::domain::{RailTime, Route, StationId, VehicleStop};
use crate::stream::{
    EventSink, Generation, ProgressToken, ProviderError, ProviderEvent, RequestHandle,
};

use super::error::FixtureError;

/// One station's board as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardFixture {
    pub station: StationId,
    pub name: String,
    #[serde(default)]
    pub stops: Vec<VehicleStop>,
}

/// Load every `*.json` board in `dir`, keyed by station.
///
/// Non-JSON files are skipped. An empty directory is an error since a
/// liveboard without stations cannot answer anything.
pub fn load_boards(dir: impl AsRef<Path>) -> Result<HashMap<StationId, BoardFixture>, FixtureError> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|source| FixtureError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut boards = HashMap::new();
    for entry in entries {
        let entry = entry.map_err(|source| FixtureError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }

        let board: BoardFixture = read_json(&path)?;
        debug!(station = %board.station, stops = board.stops.len(), ?path, "Loaded board fixture");
        boards.insert(board.station.clone(), board);
    }

    if boards.is_empty() {
        return Err(FixtureError::NoBoards(dir.to_path_buf()));
    }
    Ok(boards)
}

/// Load the route list. A missing file yields no routes.
pub fn load_routes(path: impl AsRef<Path>) -> Result<Vec<Route>, FixtureError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let routes: Vec<Route> = read_json(path)?;
    debug!(routes = routes.len(), ?path, "Loaded route fixtures");
    Ok(routes)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FixtureError> {
    let json = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: PathBuf::from(path),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| FixtureError::Json {
        path: PathBuf::from(path),
        source,
    })
}

/// Handles issued by a provider, the parameters each was issued for, and
/// the subset subscribed to corrections.
///
/// Only watched handles are kept past the next request.
#[derive(Debug)]
pub(crate) struct Handles<P> {
    next_id: u64,
    params: HashMap<RequestHandle, P>,
    watched: Vec<RequestHandle>,
}

impl<P> Default for Handles<P> {
    fn default() -> Self {
        Self {
            next_id: 0,
            params: HashMap::new(),
            watched: Vec::new(),
        }
    }
}

impl<P> Handles<P> {
    pub(crate) fn issue(&mut self, generation: Generation, params: P) -> RequestHandle {
        self.params.retain(|h, _| self.watched.contains(h));
        self.next_id += 1;
        let handle = RequestHandle::new(self.next_id, generation);
        self.params.insert(handle, params);
        handle
    }

    pub(crate) fn watch(&mut self, handle: &RequestHandle) {
        if self.params.contains_key(handle) && !self.watched.contains(handle) {
            self.watched.push(*handle);
        }
    }

    /// Drop a handle entirely, watched or not.
    pub(crate) fn forget(&mut self, handle: &RequestHandle) {
        self.watched.retain(|h| h != handle);
        self.params.remove(handle);
    }

    pub(crate) fn watched(&self) -> impl Iterator<Item = (&RequestHandle, &P)> {
        self.watched
            .iter()
            .filter_map(|h| self.params.get(h).map(|p| (h, p)))
    }
}

/// Pick at most `limit` candidates by time, keeping file order.
///
/// Candidates are `(index, time)` pairs; entries without a time sort first.
/// With `from_end` the latest candidates are kept, otherwise the earliest.
pub(crate) fn select_page(
    mut candidates: Vec<(usize, Option<RailTime>)>,
    limit: Option<usize>,
    from_end: bool,
) -> Vec<usize> {
    if let Some(limit) = limit {
        if candidates.len() > limit {
            candidates.sort_by_key(|(_, time)| *time);
            if from_end {
                candidates.drain(..candidates.len() - limit);
            } else {
                candidates.truncate(limit);
            }
        }
    }
    let mut picked: Vec<usize> = candidates.into_iter().map(|(i, _)| i).collect();
    picked.sort_unstable();
    picked
}

/// Progress URI in the shape the routing engine reports while paging.
pub(crate) fn progress_uri(resource: &str, time: Option<RailTime>) -> String {
    let mut uri = format!("fixture://{resource}");
    if let Some(time) = time {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("departureTime", &time.to_rfc3339())
            .finish();
        uri.push('?');
        uri.push_str(&query);
    }
    uri
}

fn closed() -> ProviderError {
    ProviderError::Unavailable("event channel closed".into())
}

/// Emit a complete answer: progress, each record, then the full list.
pub(crate) fn replay<T: Clone>(
    sink: &EventSink<T>,
    generation: Generation,
    progress_uri: String,
    records: Vec<T>,
) -> Result<(), ProviderError> {
    let delivered = sink.emit(
        generation,
        ProviderEvent::Processing(ProgressToken::from_uri(progress_uri)),
    ) && records
        .iter()
        .all(|r| sink.emit(generation, ProviderEvent::Record(r.clone())))
        && sink.emit(generation, ProviderEvent::Finished(records));

    if delivered { Ok(()) } else { Err(closed()) }
}

/// Emit a live correction for one watched request.
pub(crate) fn correct<T>(
    sink: &EventSink<T>,
    handle: &RequestHandle,
    now: chrono::DateTime<chrono::Utc>,
    record: T,
) -> Result<(), ProviderError> {
    let generation = handle.generation();
    let delivered = sink.emit(generation, ProviderEvent::LiveUpdate(now))
        && sink.emit(generation, ProviderEvent::Record(record))
        && sink.emit(generation, ProviderEvent::Finished(Vec::new()));

    if delivered { Ok(()) } else { Err(closed()) }
}

/// Emit a failure for a request.
pub(crate) fn fail<T>(sink: &EventSink<T>, generation: Generation, error: &ProviderError) -> Result<(), ProviderError> {
    if sink.emit(generation, ProviderEvent::Error(error.to_string())) {
        Ok(())
    } else {
        Err(closed())
    }
}
