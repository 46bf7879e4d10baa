//! Itinerary provider replaying precomputed routes from fixtures.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, warn};

use crate::domain::{Route, StationId};
use crate::stream::{
    EventSink, Generation, OrderingPolicy, Provider, ProviderError, RequestHandle, RoutePolicy,
};

use super::fixture::{self, Handles};
use super::params::RouteRequest;

/// Serves itineraries from a fixed route list.
pub struct RouteFixtureProvider {
    routes: Vec<Route>,
    stations: HashSet<StationId>,
    sink: EventSink<Route>,
    handles: Handles<RouteRequest>,
    page_size: Option<usize>,
}

impl RouteFixtureProvider {
    pub fn new(routes: Vec<Route>, sink: EventSink<Route>) -> Self {
        let stations = routes
            .iter()
            .flat_map(|r| r.transfers.iter().map(|t| t.station.clone()))
            .collect();
        Self {
            routes,
            stations,
            sink,
            handles: Handles::default(),
            page_size: None,
        }
    }

    /// Cap the number of routes per answer.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Every station some route passes through, with its name.
    pub fn stations(&self) -> impl Iterator<Item = (&StationId, &str)> {
        self.routes
            .iter()
            .flat_map(|r| r.transfers.iter())
            .map(|t| (&t.station, t.station_name.as_str()))
    }

    /// Replace the stored route describing the same journey and push the
    /// new version to watched requests between the same endpoints.
    ///
    /// A correction for a journey not in the fixtures is pushed anyway; the
    /// stream inserts it as a new candidate.
    pub fn publish_correction(&mut self, route: Route) -> Result<usize, ProviderError> {
        let keys = RoutePolicy.keys(&route)?;
        match self
            .routes
            .iter_mut()
            .find(|r| RoutePolicy.keys(r).is_ok_and(|k| k.same_event(&keys)))
        {
            Some(existing) => *existing = route.clone(),
            None => self.routes.push(route.clone()),
        }

        let (Some(from), Some(to)) = (route.departure(), route.arrival()) else {
            return Ok(0);
        };
        let targets: Vec<RequestHandle> = self
            .handles
            .watched()
            .filter(|(_, params)| params.from == from.station && params.to == to.station)
            .map(|(handle, _)| *handle)
            .collect();

        let now = Utc::now();
        for handle in &targets {
            fixture::correct(&self.sink, handle, now, route.clone())?;
        }
        debug!(notified = targets.len(), "Published route correction");
        Ok(targets.len())
    }

    fn matches(params: &RouteRequest, route: &Route) -> bool {
        let (Some(first), Some(last), Some(departs)) =
            (route.departure(), route.arrival(), route.departure_time())
        else {
            return false;
        };
        first.station == params.from
            && last.station == params.to
            && params.departure_time.is_none_or(|t| departs >= t)
            && params.depart_before.is_none_or(|t| departs <= t)
            && params.max_transfers.is_none_or(|max| route.change_count() <= max)
    }
}

impl Provider for RouteFixtureProvider {
    type Params = RouteRequest;
    type Record = Route;

    fn request(&mut self, params: &RouteRequest, generation: Generation) -> Result<RequestHandle, ProviderError> {
        let handle = self.handles.issue(generation, params.clone());

        for station in [&params.from, &params.to] {
            if !self.stations.contains(station) {
                let err = ProviderError::UnknownStation(station.clone());
                warn!(%station, "No route fixtures touch station");
                fixture::fail(&self.sink, generation, &err)?;
                return Ok(handle);
            }
        }

        let candidates = self
            .routes
            .iter()
            .enumerate()
            .filter(|(_, r)| Self::matches(params, r))
            .map(|(i, r)| (i, r.departure_time()))
            .collect::<Vec<_>>();
        let earliest = candidates.iter().filter_map(|(_, t)| *t).min();
        let from_end = params.depart_before.is_some();
        let records: Vec<Route> = fixture::select_page(candidates, self.page_size, from_end)
            .into_iter()
            .map(|i| self.routes[i].clone())
            .collect();

        debug!(from = %params.from, to = %params.to, count = records.len(), "Replaying routes");
        let uri = fixture::progress_uri("connections", params.departure_time.or(earliest));
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
