//! Provider contract.
//!
//! A provider is the routing/data engine behind a stream. It accepts a
//! request and answers asynchronously through an event channel: zero or
//! more `Record`s bracketed by `Processing` and exactly one terminal
//! `Finished` or `Error`. Watched requests may later emit `LiveUpdate`
//! followed by corrected records.
//!
//! Every event carries the generation of the request it answers, so the
//! stream can discard events that arrive after the request was superseded.

use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use url::Url;

use crate::domain::{DomainError, RailTime, StationId};

use super::lifecycle::Generation;

/// Errors a provider can raise synchronously when a request is issued.
///
/// Failures that happen while producing results travel as
/// [`ProviderEvent::Error`] instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Provider cannot serve requests right now
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Station is not known to the provider
    #[error("unknown station: {0}")]
    UnknownStation(StationId),

    /// A pushed record cannot be placed on any list
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] DomainError),
}

/// Handle identifying an issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle {
    id: u64,
    generation: Generation,
}

impl RequestHandle {
    pub fn new(id: u64, generation: Generation) -> Self {
        Self { id, generation }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Generation of the request this handle was issued for.
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// Progress information emitted when the provider starts producing.
///
/// The token is the URI of the page being fetched. When it carries a
/// `departureTime` query parameter, that time is surfaced to observers as
/// an indication of how far the search has progressed. It is never used
/// for ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressToken {
    uri: String,
    timestamp: Option<RailTime>,
}

impl ProgressToken {
    /// Build a token from a page URI.
    ///
    /// ```
    /// use rail_board::stream::ProgressToken;
    ///
    /// let token = ProgressToken::from_uri(
    ///     "https://graph.irail.be/sncb/connections?departureTime=2018-10-02T10:00:00.000Z",
    /// );
    /// assert_eq!(token.timestamp().unwrap().to_string(), "10:00");
    ///
    /// assert!(ProgressToken::from_uri("https://graph.irail.be/sncb/connections").timestamp().is_none());
    /// ```
    pub fn from_uri(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let timestamp = departure_time(&uri);
        Self { uri, timestamp }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn timestamp(&self) -> Option<RailTime> {
        self.timestamp
    }
}

/// Percent-decoded `departureTime` of an absolute URI.
fn departure_time(uri: &str) -> Option<RailTime> {
    let url = Url::parse(uri).ok()?;
    let (_, value) = url.query_pairs().find(|(key, _)| key == "departureTime")?;
    RailTime::parse_rfc3339(&value).ok()
}

/// One event emitted by a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent<T> {
    /// Provider started producing partial results.
    Processing(ProgressToken),
    /// One record of the answer.
    Record(T),
    /// Stream complete, with the provider's authoritative list.
    Finished(Vec<T>),
    /// Stream failed; fatal to the request.
    Error(String),
    /// A watched subscription received new data produced at this time.
    LiveUpdate(DateTime<Utc>),
}

impl<T> ProviderEvent<T> {
    /// Short event name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderEvent::Processing(_) => "processing",
            ProviderEvent::Record(_) => "record",
            ProviderEvent::Finished(_) => "finished",
            ProviderEvent::Error(_) => "error",
            ProviderEvent::LiveUpdate(_) => "liveUpdate",
        }
    }
}

/// An event tagged with the generation of the request it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<E> {
    pub generation: Generation,
    pub event: E,
}

impl<E> Tagged<E> {
    pub fn new(generation: Generation, event: E) -> Self {
        Self { generation, event }
    }
}

/// Receiving end of a provider's event channel.
pub type EventReceiver<T> = mpsc::UnboundedReceiver<Tagged<ProviderEvent<T>>>;

/// Sending end of a provider's event channel.
#[derive(Debug)]
pub struct EventSink<T> {
    tx: mpsc::UnboundedSender<Tagged<ProviderEvent<T>>>,
}

impl<T> Clone for EventSink<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSink<T> {
    /// Queue an event for delivery. Returns false once the stream is gone.
    pub fn emit(&self, generation: Generation, event: ProviderEvent<T>) -> bool {
        self.tx.send(Tagged::new(generation, event)).is_ok()
    }
}

/// Create a provider event channel.
pub fn event_channel<T>() -> (EventSink<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, rx)
}

/// Which way a continuation request extends the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Earlier,
    Later,
}

/// Request parameters that know how to build their own continuation.
pub trait RequestParams: Clone + Debug {
    /// Parameters for the page before or after `anchor`.
    ///
    /// `anchor` is the effective time of the first (earlier) or last
    /// (later) element of the current list. `window` bounds how far back an
    /// earlier page reaches.
    fn continued(&self, direction: Direction, anchor: RailTime, window: Duration) -> Self;
}

/// The routing/data engine behind a stream.
///
/// Implementations answer through an [`EventSink`] they were built with;
/// none of these methods block waiting for results.
pub trait Provider {
    type Params: RequestParams;
    /// Compared when a terminal payload is checked against the list.
    type Record: PartialEq;

    /// Issue a request whose events will be tagged with `generation`.
    fn request(
        &mut self,
        params: &Self::Params,
        generation: Generation,
    ) -> Result<RequestHandle, ProviderError>;

    /// Stop producing events for a request. Best effort: events already
    /// queued may still be delivered.
    fn abort(&mut self, handle: &RequestHandle);

    /// Keep a completed request subscribed to live corrections.
    fn watch(&mut self, handle: &RequestHandle);

    /// Stop live corrections for a request.
    fn unwatch(&mut self, handle: &RequestHandle);
}
