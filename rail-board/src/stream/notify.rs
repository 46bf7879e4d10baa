//! Notifications pushed to stream observers.
//!
//! Observers never get a handle on the list itself. They subscribe to a
//! broadcast channel of `StreamNotification`s and read the list back
//! through the stream's accessors (or a snapshot) when they see a delta.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::{Delay, RailTime};

use super::lifecycle::{Generation, RequestState};
use super::list::ListDelta;

/// Summary of a record whose delay or cancellation changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    /// Destination or arrival station of the record.
    pub headline: String,
    /// New effective time.
    pub time: RailTime,
    pub delay: Delay,
    pub canceled: bool,
}

impl UpdateSummary {
    /// One-line text for a toast, e.g. `Oostende 10:05 (+0H05)`.
    pub fn message(&self) -> String {
        if self.canceled {
            format!("{} {} cancelled", self.headline, self.time)
        } else if self.delay.is_on_time() {
            format!("{} {}", self.headline, self.time)
        } else {
            format!("{} {} ({})", self.headline, self.time, self.delay)
        }
    }
}

/// Everything an observer can be told about a stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum StreamNotification {
    /// Rows changed.
    Rows { delta: ListDelta },
    StateChanged { state: RequestState },
    BusyChanged { busy: bool },
    ValidChanged { valid: bool },
    /// Provider began producing; `timestamp` is informational only.
    Processing {
        uri: String,
        timestamp: Option<RailTime>,
    },
    /// A consolidated record changed delay or cancellation.
    Updated { summary: UpdateSummary },
    /// Request complete.
    Finished { latency_ms: i64, count: usize },
    /// Request failed; message is the provider's, verbatim.
    Error { message: String },
    /// A request was refused because one is already in flight.
    Rejected { state: RequestState },
    /// A record could not be placed and was dropped.
    RecordRejected { reason: String },
    /// A new request generation began.
    Started { generation: Generation },
}

/// Fan-out of notifications to any number of observers.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<StreamNotification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Push a notification to current subscribers.
    pub fn send(&self, notification: StreamNotification) {
        // No subscribers is fine: readers poll state directly.
        let _ = self.tx.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamNotification> {
        self.tx.subscribe()
    }
}
