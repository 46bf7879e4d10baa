//! Background task feeding provider events into a stream.
//!
//! Providers push events onto an unbounded channel from wherever they run.
//! The driver is the single consumer: it takes the stream lock for each
//! event, so ingestion is serialized with every command issued through the
//! same lock.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::consolidated::ConsolidatedStream;
use super::lifecycle::Clock;
use super::policy::OrderingPolicy;
use super::provider::{EventReceiver, Provider, ProviderEvent, Tagged};

/// Something that consumes provider events one at a time.
pub trait Ingest {
    type Record;

    /// Apply one event. Returns whether it was applied.
    fn ingest(&mut self, tagged: Tagged<ProviderEvent<Self::Record>>) -> bool;
}

impl<P, O, C> Ingest for ConsolidatedStream<P, O, C>
where
    P: Provider,
    O: OrderingPolicy<Record = P::Record>,
    C: Clock,
{
    type Record = P::Record;

    fn ingest(&mut self, tagged: Tagged<ProviderEvent<P::Record>>) -> bool {
        ConsolidatedStream::ingest(self, tagged)
    }
}

/// A consumer shared between request handlers and its driver.
pub type Shared<S> = Arc<Mutex<S>>;

/// Spawn a task that ingests every event from `events` into `target`.
///
/// The task ends when all senders of the channel are dropped.
pub fn spawn_driver<S>(target: Shared<S>, mut events: EventReceiver<S::Record>) -> JoinHandle<()>
where
    S: Ingest + Send + 'static,
    S::Record: Send + 'static,
{
    tokio::spawn(async move {
        while let Some(tagged) = events.recv().await {
            let mut target = target.lock().await;
            target.ingest(tagged);
        }
        debug!("Provider event channel closed, driver exiting");
    })
}

/// Wait for a driver to end and log how it ended.
///
/// The returned handle completes once the driver has stopped, so callers
/// can poll it to tell whether a stream is still being fed.
pub fn supervise(name: &'static str, driver: JoinHandle<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match driver.await {
            Ok(()) => warn!(driver = name, "Driver stopped"),
            Err(e) if e.is_panic() => error!(driver = name, error = %e, "Driver panicked"),
            Err(e) => warn!(driver = name, error = %e, "Driver cancelled"),
        }
    })
}
