//! Sorted stream consolidation.
//!
//! A [`ConsolidatedStream`] turns the incremental, possibly out-of-order
//! and duplicated output of a [`Provider`] into one ordered list that
//! observers can render, with a request lifecycle (`busy`, `valid`,
//! latency, error) alongside it.

mod consolidated;
mod driver;
mod error;
mod lifecycle;
mod list;
mod notify;
mod policy;
mod provider;

pub use consolidated::{ConsolidatedStream, Merge, Mode};
pub use driver::{Ingest, Shared, spawn_driver, supervise};
pub use error::StreamError;
pub use lifecycle::{Clock, Generation, ManualClock, RequestLifecycle, RequestState, SystemClock};
pub use list::{ListDelta, OrderedList};
pub use notify::{Notifier, StreamNotification, UpdateSummary};
pub use policy::{BoardMode, BoardPolicy, OrderingPolicy, RecordKeys, RoutePolicy};
pub use provider::{
    Direction, EventReceiver, EventSink, ProgressToken, Provider, ProviderError, ProviderEvent,
    RequestHandle, RequestParams, Tagged, event_channel,
};
