//! Route planner facade: itineraries between two stations.

use tokio::sync::broadcast;

use crate::config::StreamConfig;
use crate::domain::{RailTime, Route, StationId};
use crate::provider::{RouteFixtureProvider, RouteRequest};
use crate::stream::{
    Clock, ConsolidatedStream, Direction, Generation, Ingest, Provider, ProviderError,
    ProviderEvent, RequestState, RoutePolicy, StreamError, StreamNotification, SystemClock, Tagged,
};

/// Candidate routes kept in departure order while the router streams.
pub struct RoutePlanner<P, C = SystemClock>
where
    P: Provider<Params = RouteRequest, Record = Route>,
    C: Clock,
{
    stream: ConsolidatedStream<P, RoutePolicy, C>,
}

impl<P, C> RoutePlanner<P, C>
where
    P: Provider<Params = RouteRequest, Record = Route>,
    C: Clock,
{
    pub fn new(provider: P, clock: C, config: StreamConfig) -> Self {
        Self {
            stream: ConsolidatedStream::new(provider, RoutePolicy, clock, config),
        }
    }

    /// Plan routes from `from` to `to`.
    ///
    /// Previous routes are discarded. Refused while a search is running so
    /// the running search keeps its results.
    pub fn get_connections(
        &mut self,
        from: StationId,
        to: StationId,
        departure_time: Option<RailTime>,
        max_transfers: Option<usize>,
    ) -> Result<Generation, StreamError> {
        let request = RouteRequest {
            from,
            to,
            departure_time,
            max_transfers,
            depart_before: None,
        };
        self.stream.start(request)
    }

    /// Search for earlier or later departures.
    pub fn extend(&mut self, direction: Direction) -> Result<Generation, StreamError> {
        self.stream.extend(direction)
    }

    pub fn abort(&mut self) -> Result<(), StreamError> {
        self.stream.abort()
    }

    pub fn clear_routes(&mut self) {
        self.stream.clear();
    }

    /// The current query, if any.
    pub fn request(&self) -> Option<&RouteRequest> {
        self.stream.params()
    }

    /// Departure of the earliest route.
    pub fn from(&self) -> Option<RailTime> {
        self.stream.first_time()
    }

    /// Departure of the latest route.
    pub fn until(&self) -> Option<RailTime> {
        self.stream.last_time()
    }

    pub fn count(&self) -> usize {
        self.stream.count()
    }

    pub fn get(&self, index: usize) -> Option<&Route> {
        self.stream.get(index)
    }

    pub fn entries(&self) -> Vec<Route> {
        self.stream.snapshot()
    }

    pub fn busy(&self) -> bool {
        self.stream.busy()
    }

    pub fn valid(&self) -> bool {
        self.stream.valid()
    }

    pub fn state(&self) -> RequestState {
        self.stream.state()
    }

    pub fn last_latency_millis(&self) -> Option<i64> {
        self.stream.last_latency_millis()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.stream.last_error()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamNotification> {
        self.stream.subscribe()
    }

    pub fn stream(&self) -> &ConsolidatedStream<P, RoutePolicy, C> {
        &self.stream
    }
}

impl<C: Clock> RoutePlanner<RouteFixtureProvider, C> {
    /// Push a corrected route through the fixture provider.
    pub fn publish_correction(&mut self, route: Route) -> Result<usize, ProviderError> {
        self.stream.provider_mut().publish_correction(route)
    }
}

impl<P, C> Ingest for RoutePlanner<P, C>
where
    P: Provider<Params = RouteRequest, Record = Route>,
    C: Clock,
{
    type Record = Route;

    fn ingest(&mut self, tagged: Tagged<ProviderEvent<Route>>) -> bool {
        self.stream.ingest(tagged)
    }
}
