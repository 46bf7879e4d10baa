use super::*;

use chrono::{Duration, NaiveDate, TimeZone};
use proptest::prelude::*;

use crate::domain::{Delay, VehicleStop};
use crate::stream::lifecycle::ManualClock;
use crate::stream::list::ListDelta;
use crate::stream::policy::BoardPolicy;
use crate::stream::provider::ProviderError;

#[derive(Debug, Clone, PartialEq)]
struct Query {
    label: &'static str,
    anchor: Option<(Direction, RailTime)>,
}

impl RequestParams for Query {
    fn continued(&self, direction: Direction, anchor: RailTime, _window: Duration) -> Self {
        Query {
            label: self.label,
            anchor: Some((direction, anchor)),
        }
    }
}

/// Provider that records every call and never emits anything itself.
#[derive(Debug, Default)]
struct RecordingProvider {
    next_id: u64,
    requests: Vec<(Query, Generation)>,
    aborted: Vec<RequestHandle>,
    watched: Vec<RequestHandle>,
    unwatched: Vec<RequestHandle>,
    refuse: Option<ProviderError>,
}

impl Provider for RecordingProvider {
    type Params = Query;
    type Record = VehicleStop;

    fn request(&mut self, params: &Query, generation: Generation) -> Result<RequestHandle, ProviderError> {
        if let Some(err) = self.refuse.clone() {
            return Err(err);
        }
        self.next_id += 1;
        self.requests.push((params.clone(), generation));
        Ok(RequestHandle::new(self.next_id, generation))
    }

    fn abort(&mut self, handle: &RequestHandle) {
        self.aborted.push(*handle);
    }

    fn watch(&mut self, handle: &RequestHandle) {
        self.watched.push(*handle);
    }

    fn unwatch(&mut self, handle: &RequestHandle) {
        self.unwatched.push(*handle);
    }
}

type TestStream = ConsolidatedStream<RecordingProvider, BoardPolicy, ManualClock>;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn time(s: &str) -> RailTime {
    RailTime::parse_hhmm(s, date()).unwrap()
}

fn stop(uri: &str, dep: &str, delay_mins: i64) -> VehicleStop {
    VehicleStop::new(uri, "Oostende").with_departure(time(dep), Delay::from_mins(delay_mins))
}

fn query() -> Query {
    Query {
        label: "GENT",
        anchor: None,
    }
}

fn new_stream() -> (TestStream, ManualClock) {
    new_stream_with(StreamConfig::default())
}

fn new_stream_with(config: StreamConfig) -> (TestStream, ManualClock) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap());
    let stream = ConsolidatedStream::new(
        RecordingProvider::default(),
        BoardPolicy::default(),
        clock.clone(),
        config,
    );
    (stream, clock)
}

/// Deliver an event tagged with the stream's current generation.
fn feed(stream: &mut TestStream, event: ProviderEvent<VehicleStop>) -> bool {
    let generation = stream.generation();
    stream.ingest(Tagged::new(generation, event))
}

fn uris(stream: &TestStream) -> Vec<String> {
    stream.iter().map(|s| s.uri.clone()).collect()
}

fn times(stream: &TestStream) -> Vec<String> {
    (0..stream.count())
        .map(|i| stream.keys(i).unwrap().effective.to_string())
        .collect()
}

fn drain(rx: &mut broadcast::Receiver<StreamNotification>) -> Vec<StreamNotification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

fn row_deltas(notifications: &[StreamNotification]) -> Vec<ListDelta> {
    notifications
        .iter()
        .filter_map(|n| match n {
            StreamNotification::Rows { delta } => Some(*delta),
            _ => None,
        })
        .collect()
}

/// Start, stream `records` and finish with the same list.
fn load(stream: &mut TestStream, records: Vec<VehicleStop>) {
    stream.start(query()).unwrap();
    for r in &records {
        feed(stream, ProviderEvent::Record(r.clone()));
    }
    feed(stream, ProviderEvent::Finished(records));
}

#[test]
fn cold_start_orders_out_of_order_records() {
    let (mut stream, _) = new_stream();
    stream.start(query()).unwrap();

    for (uri, dep) in [("B", "10:05"), ("A", "10:00"), ("C", "10:10")] {
        feed(&mut stream, ProviderEvent::Record(stop(uri, dep, 0)));
    }

    assert_eq!(times(&stream), vec!["10:00", "10:05", "10:10"]);
    assert_eq!(uris(&stream), vec!["A", "B", "C"]);
    assert_eq!(stream.state(), RequestState::Streaming);
}

#[test]
fn start_enters_requesting_and_invalidates() {
    let (mut stream, _) = new_stream();
    let mut rx = stream.subscribe();

    let generation = stream.start(query()).unwrap();

    assert_eq!(stream.state(), RequestState::Requesting);
    assert!(stream.busy());
    assert!(!stream.valid());
    assert_eq!(stream.provider().requests, vec![(query(), generation)]);

    let notes = drain(&mut rx);
    assert!(notes.contains(&StreamNotification::Started { generation }));
    assert!(notes.contains(&StreamNotification::BusyChanged { busy: true }));
    assert!(notes.contains(&StreamNotification::StateChanged {
        state: RequestState::Requesting
    }));
}

#[test]
fn processing_surfaces_progress_timestamp() {
    let (mut stream, _) = new_stream();
    stream.start(query()).unwrap();
    let mut rx = stream.subscribe();

    let token = ProgressToken::from_uri("https://example.org/connections?departureTime=2024-03-15T10:15:00.000Z");
    assert!(feed(&mut stream, ProviderEvent::Processing(token)));

    assert_eq!(stream.state(), RequestState::Streaming);
    assert_eq!(stream.last_progress().map(|t| t.to_string()), Some("10:15".into()));
    assert!(drain(&mut rx).iter().any(|n| matches!(n, StreamNotification::Processing { .. })));
}

#[test]
fn start_while_streaming_is_rejected() {
    let (mut stream, _) = new_stream();
    let generation = stream.start(query()).unwrap();
    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 0)));
    let mut rx = stream.subscribe();

    let err = stream.start(Query {
        label: "BRUG",
        anchor: None,
    });

    assert_eq!(err, Err(StreamError::ConcurrentRequestRejected(RequestState::Streaming)));
    assert_eq!(stream.generation(), generation);
    assert_eq!(stream.state(), RequestState::Streaming);
    assert_eq!(stream.count(), 1);
    assert_eq!(stream.provider().requests.len(), 1);
    assert_eq!(
        drain(&mut rx),
        vec![StreamNotification::Rejected {
            state: RequestState::Streaming
        }]
    );
}

#[test]
fn finished_measures_latency_exactly() {
    let (mut stream, clock) = new_stream();
    stream.start(query()).unwrap();
    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 0)));
    clock.advance(Duration::milliseconds(1234));

    feed(&mut stream, ProviderEvent::Finished(vec![stop("A", "10:00", 0)]));

    assert_eq!(stream.last_latency_millis(), Some(1234));
    assert_eq!(stream.state(), RequestState::Ready);
    assert!(stream.valid());
    assert!(!stream.busy());
}

#[test]
fn cold_start_finished_is_authoritative() {
    let (mut stream, _) = new_stream();
    stream.start(query()).unwrap();
    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 0)));
    feed(&mut stream, ProviderEvent::Record(stop("GONE", "10:02", 0)));
    let mut rx = stream.subscribe();

    feed(
        &mut stream,
        ProviderEvent::Finished(vec![stop("C", "10:10", 0), stop("A", "10:00", 0)]),
    );

    assert_eq!(uris(&stream), vec!["A", "C"]);
    assert_eq!(row_deltas(&drain(&mut rx)), vec![ListDelta::Reset]);
}

#[test]
fn finished_with_same_content_emits_no_rows() {
    let (mut stream, _) = new_stream();
    stream.start(query()).unwrap();
    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 0)));
    feed(&mut stream, ProviderEvent::Record(stop("B", "10:05", 0)));
    let mut rx = stream.subscribe();

    feed(
        &mut stream,
        ProviderEvent::Finished(vec![stop("A", "10:00", 0), stop("B", "10:05", 0)]),
    );

    let notes = drain(&mut rx);
    assert!(row_deltas(&notes).is_empty());
    assert!(notes.contains(&StreamNotification::Finished {
        latency_ms: 0,
        count: 2
    }));
}

#[test]
fn finished_payload_replaces_records_with_same_keys() {
    let (mut stream, _) = new_stream();
    stream.start(query()).unwrap();
    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 0)));
    let mut rx = stream.subscribe();

    let mut rerouted = stop("A", "10:00", 0);
    rerouted.headsign = "Brussel-Zuid".into();
    rerouted.platform = Some("4".into());
    feed(&mut stream, ProviderEvent::Finished(vec![rerouted.clone()]));

    assert_eq!(stream.get(0), Some(&rerouted));
    assert_eq!(row_deltas(&drain(&mut rx)), vec![ListDelta::Reset]);
}

#[test]
fn live_update_replaces_delayed_record() {
    let (mut stream, clock) = new_stream();
    load(&mut stream, vec![stop("A", "10:00", 0)]);
    let mut rx = stream.subscribe();

    let source = clock.now();
    assert!(feed(&mut stream, ProviderEvent::LiveUpdate(source)));
    assert_eq!(stream.state(), RequestState::Streaming);
    assert_eq!(stream.mode(), Mode::Continuation);

    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 5)));

    assert_eq!(stream.count(), 1);
    assert_eq!(times(&stream), vec!["10:05"]);
    assert_eq!(stream.get(0).unwrap().departure_delay, Delay::from_mins(5));

    let notes = drain(&mut rx);
    assert_eq!(
        row_deltas(&notes),
        vec![
            ListDelta::RowsRemoved { first: 0, last: 0 },
            ListDelta::RowsInserted { first: 0, last: 0 },
        ]
    );
    let updates: Vec<_> = notes
        .iter()
        .filter_map(|n| match n {
            StreamNotification::Updated { summary } => Some(summary.message()),
            _ => None,
        })
        .collect();
    assert_eq!(updates, vec!["Oostende 10:05 (+0H05)"]);
}

#[test]
fn delayed_record_moves_past_later_ones() {
    let (mut stream, _) = new_stream();
    load(
        &mut stream,
        vec![stop("A", "10:00", 0), stop("B", "10:05", 0), stop("C", "10:10", 0)],
    );

    feed(&mut stream, ProviderEvent::LiveUpdate(Utc::now()));
    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 8)));

    assert_eq!(uris(&stream), vec!["B", "A", "C"]);
    assert_eq!(times(&stream), vec!["10:05", "10:08", "10:10"]);
}

#[test]
fn redelivery_with_same_delay_is_silent() {
    let (mut stream, _) = new_stream();
    load(&mut stream, vec![stop("A", "10:00", 2)]);
    feed(&mut stream, ProviderEvent::LiveUpdate(Utc::now()));
    let mut rx = stream.subscribe();

    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 2)));

    let notes = drain(&mut rx);
    assert!(row_deltas(&notes).is_empty());
    assert!(!notes.iter().any(|n| matches!(n, StreamNotification::Updated { .. })));
}

#[test]
fn replacement_during_cold_start_has_no_update_notice() {
    let (mut stream, _) = new_stream();
    stream.start(query()).unwrap();
    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 0)));
    let mut rx = stream.subscribe();

    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 3)));

    assert_eq!(stream.count(), 1);
    assert_eq!(times(&stream), vec!["10:03"]);
    assert!(!drain(&mut rx).iter().any(|n| matches!(n, StreamNotification::Updated { .. })));
}

#[test]
fn cancellation_counts_as_a_change() {
    let (mut stream, _) = new_stream();
    load(&mut stream, vec![stop("A", "10:00", 0)]);
    feed(&mut stream, ProviderEvent::LiveUpdate(Utc::now()));
    let mut rx = stream.subscribe();

    let mut canceled = stop("A", "10:00", 0);
    canceled.is_departure_canceled = true;
    feed(&mut stream, ProviderEvent::Record(canceled));

    assert!(stream.get(0).unwrap().is_departure_canceled);
    let notes = drain(&mut rx);
    assert!(notes.iter().any(|n| matches!(
        n,
        StreamNotification::Updated { summary } if summary.message() == "Oostende 10:00 cancelled"
    )));
}

#[test]
fn abort_fences_off_old_generation() {
    let (mut stream, _) = new_stream();
    let old = stream.start(query()).unwrap();
    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 0)));

    stream.abort().unwrap();
    assert_eq!(stream.state(), RequestState::Aborted);
    assert!(!stream.valid());
    assert_eq!(stream.provider().aborted.len(), 1);

    let mut rx = stream.subscribe();
    assert!(!stream.ingest(Tagged::new(old, ProviderEvent::Record(stop("B", "10:05", 0)))));
    assert!(!stream.ingest(Tagged::new(old, ProviderEvent::Finished(vec![]))));

    assert_eq!(uris(&stream), vec!["A"]);
    assert_eq!(stream.state(), RequestState::Aborted);
    assert_eq!(stream.stale_events(), 2);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn abort_when_idle_is_an_error() {
    let (mut stream, _) = new_stream();
    assert_eq!(stream.abort(), Err(StreamError::NotBusy(RequestState::Idle)));
}

#[test]
fn provider_error_keeps_list_and_reports_message() {
    let (mut stream, _) = new_stream();
    load(&mut stream, vec![stop("A", "10:00", 0)]);
    stream.extend(Direction::Later).unwrap();
    let mut rx = stream.subscribe();

    feed(&mut stream, ProviderEvent::Error("upstream timed out".into()));

    assert_eq!(stream.state(), RequestState::Error);
    assert_eq!(stream.last_error(), Some("upstream timed out"));
    assert!(stream.valid());
    assert_eq!(stream.count(), 1);
    assert!(drain(&mut rx).contains(&StreamNotification::Error {
        message: "upstream timed out".into()
    }));
}

#[test]
fn refused_request_moves_to_error() {
    let (mut stream, _) = new_stream();
    stream.provider_mut().refuse = Some(ProviderError::Unavailable("offline".into()));

    let err = stream.start(query()).unwrap_err();

    assert_eq!(err, StreamError::Provider(ProviderError::Unavailable("offline".into())));
    assert_eq!(stream.state(), RequestState::Error);
    assert!(!stream.busy());
    assert_eq!(stream.last_error(), Some("provider unavailable: offline"));
}

#[test]
fn malformed_record_is_dropped_and_stream_continues() {
    let (mut stream, _) = new_stream();
    stream.start(query()).unwrap();
    let mut rx = stream.subscribe();

    feed(&mut stream, ProviderEvent::Record(VehicleStop::new("X", "Nowhere")));
    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 0)));

    assert_eq!(uris(&stream), vec!["A"]);
    assert_eq!(stream.rejected_records(), 1);
    assert!(stream.busy());
    assert!(drain(&mut rx).iter().any(|n| matches!(n, StreamNotification::RecordRejected { .. })));
}

#[test]
fn malformed_record_is_reported_once_per_request() {
    let (mut stream, _) = new_stream();
    stream.start(query()).unwrap();
    let mut rx = stream.subscribe();

    let broken = VehicleStop::new("X", "Nowhere");
    feed(&mut stream, ProviderEvent::Record(broken.clone()));
    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 0)));
    feed(
        &mut stream,
        ProviderEvent::Finished(vec![broken, stop("A", "10:00", 0)]),
    );

    let rejections = drain(&mut rx)
        .into_iter()
        .filter(|n| matches!(n, StreamNotification::RecordRejected { .. }))
        .count();
    assert_eq!(stream.rejected_records(), 1);
    assert_eq!(rejections, 1);
    assert_eq!(stream.state(), RequestState::Ready);
    assert_eq!(uris(&stream), vec!["A"]);
}

#[test]
fn malformed_record_only_in_finished_is_still_reported() {
    let (mut stream, _) = new_stream();
    load(&mut stream, vec![stop("A", "10:00", 0)]);
    let mut rx = stream.subscribe();

    stream.extend(Direction::Later).unwrap();
    feed(
        &mut stream,
        ProviderEvent::Finished(vec![VehicleStop::new("X", "Nowhere"), stop("B", "10:30", 0)]),
    );

    assert_eq!(stream.rejected_records(), 1);
    assert_eq!(uris(&stream), vec!["A", "B"]);
    assert!(drain(&mut rx).iter().any(|n| matches!(n, StreamNotification::RecordRejected { .. })));
}

#[test]
fn oversized_delay_is_rejected_without_stopping_the_stream() {
    let (mut stream, _) = new_stream();
    stream.start(query()).unwrap();
    let mut rx = stream.subscribe();

    let mut broken = stop("A", "10:00", 0);
    broken.departure_delay = Delay::from_secs(i64::MAX / 10);
    assert!(!feed(&mut stream, ProviderEvent::Record(broken.clone())));
    assert!(feed(&mut stream, ProviderEvent::Record(stop("B", "10:05", 0))));
    feed(
        &mut stream,
        ProviderEvent::Finished(vec![broken, stop("B", "10:05", 0)]),
    );

    assert_eq!(uris(&stream), vec!["B"]);
    assert_eq!(stream.rejected_records(), 1);
    assert_eq!(stream.state(), RequestState::Ready);
    assert!(drain(&mut rx).iter().any(|n| matches!(
        n,
        StreamNotification::RecordRejected { reason } if reason.contains("out of range")
    )));
}

#[test]
fn extend_later_anchors_on_last_element() {
    let (mut stream, _) = new_stream();
    load(&mut stream, vec![stop("A", "10:00", 0), stop("B", "10:05", 3)]);

    let generation = stream.extend(Direction::Later).unwrap();

    let (params, issued) = stream.provider().requests.last().cloned().unwrap();
    assert_eq!(issued, generation);
    assert_eq!(params.anchor, Some((Direction::Later, time("10:08"))));
    assert_eq!(stream.mode(), Mode::Continuation);
    assert!(stream.valid());
    assert_eq!(stream.count(), 2);
}

#[test]
fn extend_merges_without_discarding() {
    let (mut stream, _) = new_stream();
    load(&mut stream, vec![stop("B", "10:05", 0)]);
    stream.extend(Direction::Earlier).unwrap();

    feed(&mut stream, ProviderEvent::Record(stop("A", "09:40", 0)));
    feed(
        &mut stream,
        ProviderEvent::Finished(vec![stop("A", "09:40", 0), stop("B", "10:05", 0)]),
    );

    assert_eq!(uris(&stream), vec!["A", "B"]);
    assert_eq!(stream.state(), RequestState::Ready);
}

#[test]
fn extend_requires_ready_and_content() {
    let (mut stream, _) = new_stream();
    assert_eq!(
        stream.extend(Direction::Later),
        Err(StreamError::NotReady(RequestState::Idle))
    );

    stream.start(query()).unwrap();
    assert_eq!(
        stream.extend(Direction::Later),
        Err(StreamError::ConcurrentRequestRejected(RequestState::Requesting))
    );

    feed(&mut stream, ProviderEvent::Finished(vec![]));
    assert_eq!(stream.extend(Direction::Earlier), Err(StreamError::NothingToExtend));
}

#[test]
fn finished_request_is_watched_until_next_start() {
    let (mut stream, _) = new_stream();
    load(&mut stream, vec![stop("A", "10:00", 0)]);
    let handle = stream.provider().watched[0];

    stream.start(query()).unwrap();

    assert_eq!(stream.provider().unwatched, vec![handle]);
}

#[test]
fn watching_can_be_disabled() {
    let (mut stream, _) = new_stream_with(StreamConfig::default().with_watch_after_finish(false));
    load(&mut stream, vec![stop("A", "10:00", 0)]);
    assert!(stream.provider().watched.is_empty());
}

#[test]
fn live_update_outside_ready_is_ignored() {
    let (mut stream, _) = new_stream();
    stream.start(query()).unwrap();
    assert!(!feed(&mut stream, ProviderEvent::LiveUpdate(Utc::now())));
    assert_eq!(stream.state(), RequestState::Requesting);
    assert_eq!(stream.mode(), Mode::ColdStart);
}

#[test]
fn live_update_latency_measured_from_source() {
    let (mut stream, clock) = new_stream();
    load(&mut stream, vec![stop("A", "10:00", 0)]);

    let source = clock.now();
    clock.advance(Duration::milliseconds(700));
    feed(&mut stream, ProviderEvent::LiveUpdate(source));
    feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 1)));
    feed(&mut stream, ProviderEvent::Finished(vec![]));

    assert_eq!(stream.last_latency_millis(), Some(700));
    assert_eq!(times(&stream), vec!["10:01"]);
}

#[test]
fn clear_resets_everything() {
    let (mut stream, _) = new_stream();
    load(&mut stream, vec![stop("A", "10:00", 0)]);
    let old = stream.generation();
    let mut rx = stream.subscribe();

    stream.clear();

    assert_eq!(stream.count(), 0);
    assert_eq!(stream.state(), RequestState::Idle);
    assert!(stream.params().is_none());
    assert!(stream.generation() > old);
    assert_eq!(stream.provider().unwatched.len(), 1);
    let notes = drain(&mut rx);
    assert!(row_deltas(&notes).contains(&ListDelta::Reset));
    assert!(notes.contains(&StreamNotification::ValidChanged { valid: false }));
}

#[test]
fn clear_while_busy_aborts_the_provider() {
    let (mut stream, _) = new_stream();
    stream.start(query()).unwrap();
    stream.clear();
    assert_eq!(stream.provider().aborted.len(), 1);
    assert!(!stream.busy());
}

#[test]
fn restart_discards_previous_list() {
    let (mut stream, _) = new_stream();
    load(&mut stream, vec![stop("A", "10:00", 0)]);

    stream.start(query()).unwrap();

    assert_eq!(stream.count(), 0);
    assert!(!stream.valid());
}

#[test]
fn events_before_any_request_are_ignored() {
    let (mut stream, _) = new_stream();
    assert!(!feed(&mut stream, ProviderEvent::Record(stop("A", "10:00", 0))));
    assert!(!feed(&mut stream, ProviderEvent::Finished(vec![stop("A", "10:00", 0)])));
    assert_eq!(stream.count(), 0);
    assert_eq!(stream.state(), RequestState::Idle);
}

fn arb_stop() -> impl Strategy<Value = VehicleStop> {
    ("[A-E]", 0u32..120, 0i64..30).prop_map(|(uri, offset, delay)| {
        let dep = RailTime::new(date(), chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap())
            + Duration::minutes(offset as i64);
        VehicleStop::new(uri, "Oostende").with_departure(dep, Delay::from_mins(delay))
    })
}

proptest! {
    #[test]
    fn list_stays_sorted_after_every_record(records in prop::collection::vec(arb_stop(), 0..40)) {
        let (mut stream, _) = new_stream();
        stream.start(query()).unwrap();
        for r in records {
            feed(&mut stream, ProviderEvent::Record(r));
            let effective: Vec<_> = (0..stream.count()).map(|i| stream.keys(i).unwrap().effective).collect();
            prop_assert!(effective.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn no_two_entries_share_an_event(records in prop::collection::vec(arb_stop(), 0..40)) {
        let (mut stream, _) = new_stream();
        stream.start(query()).unwrap();
        for r in records {
            feed(&mut stream, ProviderEvent::Record(r));
        }
        for i in 0..stream.count() {
            for j in (i + 1)..stream.count() {
                prop_assert!(!stream.keys(i).unwrap().same_event(stream.keys(j).unwrap()));
            }
        }
    }

    #[test]
    fn redelivering_everything_changes_nothing(records in prop::collection::vec(arb_stop(), 1..20)) {
        let (mut stream, _) = new_stream();
        stream.start(query()).unwrap();
        for r in &records {
            feed(&mut stream, ProviderEvent::Record(r.clone()));
        }
        let before = stream.snapshot();
        let mut rx = stream.subscribe();

        for r in stream.snapshot() {
            feed(&mut stream, ProviderEvent::Record(r));
        }

        prop_assert_eq!(stream.snapshot(), before);
        prop_assert!(row_deltas(&drain(&mut rx)).is_empty());
    }
}
