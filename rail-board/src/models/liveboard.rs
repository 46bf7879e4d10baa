//! Liveboard facade: one station's departures or arrivals.

use tokio::sync::broadcast;

use crate::config::StreamConfig;
use crate::domain::{RailTime, StationId, VehicleStop};
use crate::provider::{BoardFixtureProvider, BoardRequest};
use crate::stream::{
    BoardMode, BoardPolicy, Clock, ConsolidatedStream, Direction, Generation, Ingest, Provider,
    ProviderError, ProviderEvent, RequestState, StreamError, StreamNotification, SystemClock, Tagged,
};

/// A station board kept sorted and deduplicated while the provider streams.
pub struct Liveboard<P, C = SystemClock>
where
    P: Provider<Params = BoardRequest, Record = VehicleStop>,
    C: Clock,
{
    stream: ConsolidatedStream<P, BoardPolicy, C>,
}

impl<P, C> Liveboard<P, C>
where
    P: Provider<Params = BoardRequest, Record = VehicleStop>,
    C: Clock,
{
    pub fn new(provider: P, clock: C, config: StreamConfig) -> Self {
        Self {
            stream: ConsolidatedStream::new(provider, BoardPolicy::default(), clock, config),
        }
    }

    /// Load the board for `station`.
    ///
    /// Switching between departures and arrivals reorders on the other
    /// side of each stop, so the previous board is dropped first.
    pub fn get_board(&mut self, station: StationId, mode: BoardMode) -> Result<Generation, StreamError> {
        if self.stream.policy().mode != mode {
            self.stream.set_policy(BoardPolicy::new(mode))?;
        }
        self.stream.start(BoardRequest::new(station, mode))
    }

    /// Fetch the page before or after the current board.
    pub fn extend(&mut self, direction: Direction) -> Result<Generation, StreamError> {
        self.stream.extend(direction)
    }

    pub fn abort(&mut self) -> Result<(), StreamError> {
        self.stream.abort()
    }

    pub fn clear_board(&mut self) {
        self.stream.clear();
    }

    /// Station of the current board.
    pub fn station(&self) -> Option<&StationId> {
        self.stream.params().map(|p| &p.station)
    }

    pub fn mode(&self) -> BoardMode {
        self.stream.policy().mode
    }

    /// Effective time of the first entry.
    pub fn from(&self) -> Option<RailTime> {
        self.stream.first_time()
    }

    /// Effective time of the last entry.
    pub fn until(&self) -> Option<RailTime> {
        self.stream.last_time()
    }

    pub fn count(&self) -> usize {
        self.stream.count()
    }

    pub fn get(&self, index: usize) -> Option<&VehicleStop> {
        self.stream.get(index)
    }

    pub fn entries(&self) -> Vec<VehicleStop> {
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

    /// The underlying stream, for counters and progress.
    pub fn stream(&self) -> &ConsolidatedStream<P, BoardPolicy, C> {
        &self.stream
    }
}

impl<C: Clock> Liveboard<BoardFixtureProvider, C> {
    /// Push a corrected stop through the fixture provider.
    pub fn publish_correction(&mut self, stop: VehicleStop) -> Result<usize, ProviderError> {
        self.stream.provider_mut().publish_correction(stop)
    }
}

impl<P, C> Ingest for Liveboard<P, C>
where
    P: Provider<Params = BoardRequest, Record = VehicleStop>,
    C: Clock,
{
    type Record = VehicleStop;

    fn ingest(&mut self, tagged: Tagged<ProviderEvent<VehicleStop>>) -> bool {
        self.stream.ingest(tagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Delay;
    use crate::provider::BoardFixture;
    use crate::stream::{EventReceiver, ManualClock, event_channel};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn time(s: &str) -> RailTime {
        RailTime::parse_hhmm(s, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()).unwrap()
    }

    fn gent() -> StationId {
        StationId::parse("008892007").unwrap()
    }

    fn stop(uri: &str, dep: &str, arr: &str) -> VehicleStop {
        VehicleStop::new(uri, "Oostende")
            .with_arrival(time(arr), Delay::ON_TIME)
            .with_departure(time(dep), Delay::ON_TIME)
    }

    type TestBoard = Liveboard<BoardFixtureProvider, ManualClock>;

    fn board() -> (TestBoard, EventReceiver<VehicleStop>, ManualClock) {
        let fixture = BoardFixture {
            station: gent(),
            name: "Gent-Sint-Pieters".into(),
            stops: vec![
                stop("B", "10:10", "10:08"),
                stop("A", "10:00", "09:58"),
                stop("C", "10:20", "10:30"),
            ],
        };
        let (sink, rx) = event_channel();
        let provider = BoardFixtureProvider::new([(gent(), fixture)].into_iter().collect(), sink);
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap());
        (Liveboard::new(provider, clock.clone(), StreamConfig::default()), rx, clock)
    }

    /// Deliver everything the provider queued.
    fn pump(board: &mut TestBoard, rx: &mut EventReceiver<VehicleStop>) {
        while let Ok(tagged) = rx.try_recv() {
            board.ingest(tagged);
        }
    }

    fn uris(board: &TestBoard) -> Vec<String> {
        board.entries().into_iter().map(|s| s.uri).collect()
    }

    #[test]
    fn departures_board_is_sorted() {
        let (mut board, mut rx, clock) = board();
        board.get_board(gent(), BoardMode::Departures).unwrap();
        assert!(board.busy());

        clock.advance(Duration::milliseconds(40));
        pump(&mut board, &mut rx);

        assert_eq!(uris(&board), vec!["A", "B", "C"]);
        assert_eq!(board.station(), Some(&gent()));
        assert_eq!(board.from(), Some(time("10:00")));
        assert_eq!(board.until(), Some(time("10:20")));
        assert_eq!(board.state(), RequestState::Ready);
        assert!(board.valid());
        assert_eq!(board.last_latency_millis(), Some(40));
    }

    #[test]
    fn arrivals_board_sorts_on_arrival_side() {
        let (mut board, mut rx, _) = board();
        board.get_board(gent(), BoardMode::Departures).unwrap();
        pump(&mut board, &mut rx);

        board.get_board(gent(), BoardMode::Arrivals).unwrap();
        pump(&mut board, &mut rx);

        assert_eq!(board.mode(), BoardMode::Arrivals);
        assert_eq!(uris(&board), vec!["A", "B", "C"]);
        assert_eq!(board.from(), Some(time("09:58")));
        assert_eq!(board.until(), Some(time("10:30")));
    }

    #[test]
    fn mode_switch_while_busy_is_rejected() {
        let (mut board, _rx, _) = board();
        board.get_board(gent(), BoardMode::Departures).unwrap();

        let err = board.get_board(gent(), BoardMode::Arrivals).unwrap_err();

        assert!(matches!(err, StreamError::ConcurrentRequestRejected(_)));
        assert_eq!(board.mode(), BoardMode::Departures);
        assert!(board.busy());
    }

    #[test]
    fn correction_moves_delayed_stop() {
        let (mut board, mut rx, _) = board();
        board.get_board(gent(), BoardMode::Departures).unwrap();
        pump(&mut board, &mut rx);
        let mut notes = board.subscribe();

        let delayed = VehicleStop::new("A", "Oostende")
            .with_arrival(time("09:58"), Delay::ON_TIME)
            .with_departure(time("10:00"), Delay::from_mins(15));
        assert_eq!(board.publish_correction(delayed).unwrap(), 1);
        pump(&mut board, &mut rx);

        assert_eq!(uris(&board), vec!["B", "A", "C"]);
        assert_eq!(board.state(), RequestState::Ready);
        let updated = std::iter::from_fn(|| notes.try_recv().ok())
            .any(|n| matches!(n, StreamNotification::Updated { .. }));
        assert!(updated);
    }

    #[test]
    fn unknown_station_surfaces_error() {
        let (mut board, mut rx, _) = board();
        let other = StationId::parse("008821006").unwrap();

        board.get_board(other, BoardMode::Departures).unwrap();
        pump(&mut board, &mut rx);

        assert_eq!(board.state(), RequestState::Error);
        assert_eq!(board.last_error(), Some("unknown station: 008821006"));
        assert!(!board.busy());
    }

    #[test]
    fn clear_board_forgets_station() {
        let (mut board, mut rx, _) = board();
        board.get_board(gent(), BoardMode::Departures).unwrap();
        pump(&mut board, &mut rx);

        board.clear_board();

        assert_eq!(board.count(), 0);
        assert!(board.station().is_none());
        assert!(board.from().is_none());
    }
}
