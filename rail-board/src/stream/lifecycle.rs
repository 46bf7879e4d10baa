//! Request lifecycle state machine.
//!
//! `RequestLifecycle` owns everything the presentation layer reads about a
//! request besides the list itself: the state, whether the data is valid,
//! the generation fence and latency bookkeeping. `busy` is derived from the
//! state and has no storage of its own.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::error::StreamError;

/// Monotonic request counter used to fence off stale provider events.
///
/// Every `start`, `extend`, `abort` and `clear` moves to a new generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Generation(u64);

impl Generation {
    pub fn new(value: u64) -> Self {
        Generation(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of the most recent request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestState {
    #[default]
    Idle,
    /// Request issued, provider has not produced anything yet.
    Requesting,
    /// Provider is producing records.
    Streaming,
    /// Stream finished; list is complete.
    Ready,
    /// Provider reported a fatal error.
    Error,
    /// Request was cancelled by the caller.
    Aborted,
}

impl RequestState {
    /// True while a request is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, RequestState::Requesting | RequestState::Streaming)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Idle => "idle",
            RequestState::Requesting => "requesting",
            RequestState::Streaming => "streaming",
            RequestState::Ready => "ready",
            RequestState::Error => "error",
            RequestState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Source of wall-clock time for latency measurement.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = instant;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Lifecycle of the current request.
#[derive(Debug, Clone, Default)]
pub struct RequestLifecycle {
    state: RequestState,
    valid: bool,
    generation: Generation,
    started_at: Option<DateTime<Utc>>,
    last_record_at: Option<DateTime<Utc>>,
    last_latency_ms: Option<i64>,
    last_error: Option<String>,
}

impl RequestLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn last_record_at(&self) -> Option<DateTime<Utc>> {
        self.last_record_at
    }

    pub fn last_latency_ms(&self) -> Option<i64> {
        self.last_latency_ms
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True if an event tagged with `generation` belongs to this request.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    /// Begin a new request.
    ///
    /// A cold start invalidates the displayed data; a continuation keeps
    /// it valid since the existing list stays on screen.
    pub fn begin(&mut self, now: DateTime<Utc>, continuation: bool) -> Result<Generation, StreamError> {
        if self.busy() {
            return Err(StreamError::ConcurrentRequestRejected(self.state));
        }
        self.generation = self.generation.next();
        self.state = RequestState::Requesting;
        self.started_at = Some(now);
        self.last_error = None;
        if !continuation {
            self.valid = false;
        }
        Ok(self.generation)
    }

    /// Provider started producing results. Returns false outside a request.
    pub fn processing(&mut self) -> bool {
        if !self.busy() {
            return false;
        }
        self.state = RequestState::Streaming;
        true
    }

    /// A record was received. Returns false outside a request.
    pub fn record(&mut self, now: DateTime<Utc>) -> bool {
        if !self.busy() {
            return false;
        }
        self.state = RequestState::Streaming;
        self.last_record_at = Some(now);
        true
    }

    /// Provider finished. Returns the measured latency in milliseconds,
    /// or `None` outside a request.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Option<i64> {
        if !self.busy() {
            return None;
        }
        self.state = RequestState::Ready;
        self.valid = true;
        let latency = self
            .started_at
            .map(|start| now.signed_duration_since(start).num_milliseconds())
            .unwrap_or(0);
        self.last_latency_ms = Some(latency);
        Some(latency)
    }

    /// Provider failed. `valid` is left as it was.
    pub fn fail(&mut self, message: String) -> bool {
        if !self.busy() {
            return false;
        }
        self.state = RequestState::Error;
        self.last_error = Some(message);
        true
    }

    /// Cancel the in-flight request and fence off its events.
    pub fn abort(&mut self) -> Result<Generation, StreamError> {
        if !self.busy() {
            return Err(StreamError::NotBusy(self.state));
        }
        self.state = RequestState::Aborted;
        self.valid = false;
        self.generation = self.generation.next();
        Ok(self.generation)
    }

    /// The watched subscription has fresh data.
    ///
    /// Only a completed request can be reopened; the latency of the
    /// follow-up is measured from `source`, the time the data was produced.
    pub fn live_update(&mut self, source: DateTime<Utc>) -> bool {
        if self.state != RequestState::Ready {
            return false;
        }
        self.state = RequestState::Streaming;
        self.started_at = Some(source);
        true
    }

    /// Forget the current request entirely.
    pub fn reset(&mut self) -> Generation {
        self.state = RequestState::Idle;
        self.valid = false;
        self.generation = self.generation.next();
        self.started_at = None;
        self.last_record_at = None;
        self.last_error = None;
        self.generation
    }
}
