//! The sorted stream consolidation engine.
//!
//! `ConsolidatedStream` issues requests to a [`Provider`], consumes the
//! provider's tagged event stream through a single entry point
//! ([`ConsolidatedStream::ingest`]) and maintains one ordered,
//! deduplicated list of records plus the request lifecycle around it.
//!
//! All methods take `&mut self` for mutation, so a reader can never observe
//! the list half way through a splice. Deltas and state changes are pushed
//! to subscribers after each mutation has completed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::domain::{DomainError, RailTime};

use super::error::StreamError;
use super::lifecycle::{Clock, Generation, RequestLifecycle, RequestState, SystemClock};
use super::list::{ListDelta, OrderedList};
use super::notify::{Notifier, StreamNotification, UpdateSummary};
use super::policy::{OrderingPolicy, RecordKeys};
use super::provider::{
    Direction, ProgressToken, Provider, ProviderEvent, RequestHandle, RequestParams, Tagged,
};

/// How incoming records relate to the list already on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    /// Fresh query building the list from empty.
    #[default]
    ColdStart,
    /// Pagination or live correction merging into an authoritative list.
    Continuation,
}

/// Result of consolidating one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Inserted { index: usize },
    Replaced { from: usize, to: usize },
    Unchanged { index: usize },
}

#[derive(Clone, Copy)]
struct Observed {
    state: RequestState,
    busy: bool,
    valid: bool,
}

/// Ordered, deduplicated view over a provider's event stream.
pub struct ConsolidatedStream<P, O, C = SystemClock>
where
    P: Provider,
    O: OrderingPolicy<Record = P::Record>,
    C: Clock,
{
    provider: P,
    policy: O,
    clock: C,
    config: StreamConfig,
    list: OrderedList<P::Record>,
    lifecycle: RequestLifecycle,
    mode: Mode,
    params: Option<P::Params>,
    handle: Option<RequestHandle>,
    watched: Option<RequestHandle>,
    last_progress: Option<RailTime>,
    rejected_records: usize,
    /// Malformed records already reported during the current request.
    reported: Vec<P::Record>,
    stale_events: usize,
    notifier: Notifier,
}

impl<P, O, C> ConsolidatedStream<P, O, C>
where
    P: Provider,
    O: OrderingPolicy<Record = P::Record>,
    C: Clock,
{
    /// Create an idle stream over `provider`.
    pub fn new(provider: P, policy: O, clock: C, config: StreamConfig) -> Self {
        let notifier = Notifier::new(config.notification_capacity);
        Self {
            provider,
            policy,
            clock,
            config,
            list: OrderedList::new(),
            lifecycle: RequestLifecycle::new(),
            mode: Mode::ColdStart,
            params: None,
            handle: None,
            watched: None,
            last_progress: None,
            rejected_records: 0,
            reported: Vec::new(),
            stale_events: 0,
            notifier,
        }
    }

    /// Subscribe to deltas and state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamNotification> {
        self.notifier.subscribe()
    }

    pub fn count(&self) -> usize {
        self.list.len()
    }

    pub fn get(&self, index: usize) -> Option<&P::Record> {
        self.list.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &P::Record> {
        self.list.iter()
    }

    /// Keys the policy derived for the element at `index`.
    pub fn keys(&self, index: usize) -> Option<&RecordKeys> {
        self.list.keys(index)
    }

    pub fn state(&self) -> RequestState {
        self.lifecycle.state()
    }

    pub fn busy(&self) -> bool {
        self.lifecycle.busy()
    }

    pub fn valid(&self) -> bool {
        self.lifecycle.valid()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn generation(&self) -> Generation {
        self.lifecycle.generation()
    }

    pub fn last_latency_millis(&self) -> Option<i64> {
        self.lifecycle.last_latency_ms()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.lifecycle.last_error()
    }

    pub fn last_record_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle.last_record_at()
    }

    /// Timestamp carried by the latest progress token.
    pub fn last_progress(&self) -> Option<RailTime> {
        self.last_progress
    }

    /// Records dropped because their keys could not be derived.
    pub fn rejected_records(&self) -> usize {
        self.rejected_records
    }

    /// Events dropped because they belonged to a superseded request.
    pub fn stale_events(&self) -> usize {
        self.stale_events
    }

    /// Parameters of the current cold-start query.
    pub fn params(&self) -> Option<&P::Params> {
        self.params.as_ref()
    }

    /// Effective time of the first element.
    pub fn first_time(&self) -> Option<RailTime> {
        self.list.first_keys().map(|k| k.effective)
    }

    /// Effective time of the last element.
    pub fn last_time(&self) -> Option<RailTime> {
        self.list.last_keys().map(|k| k.effective)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn policy(&self) -> &O {
        &self.policy
    }

    /// Start a fresh query, discarding the current list.
    ///
    /// Rejected while another request is in flight; the running request is
    /// left untouched.
    pub fn start(&mut self, params: P::Params) -> Result<Generation, StreamError> {
        let before = self.observed();
        let generation = self.begin(false)?;

        self.mode = Mode::ColdStart;
        self.last_progress = None;
        if let Some(delta) = self.list.clear() {
            self.notifier.send(StreamNotification::Rows { delta });
        }
        self.params = Some(params.clone());

        info!(
            stream = self.policy.name(),
            generation = generation.get(),
            ?params,
            "Starting request"
        );
        let result = self.issue(&params, generation);
        self.publish_transition(before);
        result
    }

    /// Request the page before or after the current list.
    ///
    /// Only allowed once the stream is ready. The list is kept and new
    /// records are merged in.
    pub fn extend(&mut self, direction: Direction) -> Result<Generation, StreamError> {
        let state = self.lifecycle.state();
        if state.is_busy() {
            self.notifier.send(StreamNotification::Rejected { state });
            return Err(StreamError::ConcurrentRequestRejected(state));
        }
        if state != RequestState::Ready {
            return Err(StreamError::NotReady(state));
        }

        let anchor = match direction {
            Direction::Earlier => self.first_time(),
            Direction::Later => self.last_time(),
        }
        .ok_or(StreamError::NothingToExtend)?;
        let params = self
            .params
            .as_ref()
            .ok_or(StreamError::NothingToExtend)?
            .continued(direction, anchor, self.config.earlier_window());

        let before = self.observed();
        let generation = self.begin(true)?;
        self.mode = Mode::Continuation;

        info!(
            stream = self.policy.name(),
            generation = generation.get(),
            ?direction,
            %anchor,
            "Extending list"
        );
        let result = self.issue(&params, generation);
        self.publish_transition(before);
        result
    }

    /// Cancel the in-flight request.
    ///
    /// The displayed data is marked invalid since it no longer receives
    /// corrections. Events already queued for the old request are fenced
    /// off by the generation bump.
    pub fn abort(&mut self) -> Result<(), StreamError> {
        let before = self.observed();
        let generation = self.lifecycle.abort()?;

        if let Some(handle) = self.handle.take() {
            self.provider.abort(&handle);
        }
        self.unwatch();

        info!(
            stream = self.policy.name(),
            generation = generation.get(),
            "Request aborted"
        );
        self.publish_transition(before);
        Ok(())
    }

    /// Drop the list and forget the current request.
    pub fn clear(&mut self) {
        let before = self.observed();

        if let Some(handle) = self.handle.take() {
            if before.busy {
                self.provider.abort(&handle);
            }
        }
        self.unwatch();
        self.lifecycle.reset();
        self.mode = Mode::ColdStart;
        self.params = None;
        self.last_progress = None;
        self.reported.clear();

        if let Some(delta) = self.list.clear() {
            self.notifier.send(StreamNotification::Rows { delta });
        }
        debug!(stream = self.policy.name(), "Cleared");
        self.publish_transition(before);
    }

    /// Swap the ordering policy.
    ///
    /// The list is cleared first since its keys came from the old policy.
    /// Refused while a request is in flight.
    pub fn set_policy(&mut self, policy: O) -> Result<(), StreamError> {
        let state = self.lifecycle.state();
        if state.is_busy() {
            self.notifier.send(StreamNotification::Rejected { state });
            return Err(StreamError::ConcurrentRequestRejected(state));
        }
        self.clear();
        self.policy = policy;
        Ok(())
    }

    /// Apply one provider event.
    ///
    /// This is the only way events reach the stream. Events tagged with a
    /// superseded generation are dropped silently. Returns whether the
    /// event was applied.
    pub fn ingest(&mut self, tagged: Tagged<ProviderEvent<P::Record>>) -> bool {
        if !self.lifecycle.is_current(tagged.generation) {
            self.stale_events += 1;
            debug!(
                stream = self.policy.name(),
                event = tagged.event.kind(),
                event_generation = tagged.generation.get(),
                current_generation = self.lifecycle.generation().get(),
                "Dropping stale event"
            );
            return false;
        }

        let before = self.observed();
        let applied = match tagged.event {
            ProviderEvent::Processing(token) => self.on_processing(token),
            ProviderEvent::Record(record) => self.on_record(record),
            ProviderEvent::Finished(records) => self.on_finished(records),
            ProviderEvent::Error(message) => self.on_error(message),
            ProviderEvent::LiveUpdate(source) => self.on_live_update(source),
        };
        self.publish_transition(before);
        applied
    }

    fn on_processing(&mut self, token: ProgressToken) -> bool {
        if !self.lifecycle.processing() {
            debug!(stream = self.policy.name(), "Ignoring processing outside a request");
            return false;
        }
        self.last_progress = token.timestamp();
        self.notifier.send(StreamNotification::Processing {
            uri: token.uri().to_string(),
            timestamp: token.timestamp(),
        });
        true
    }

    fn on_record(&mut self, record: P::Record) -> bool {
        let now = self.clock.now();
        if !self.lifecycle.record(now) {
            debug!(stream = self.policy.name(), "Ignoring record outside a request");
            return false;
        }
        match self.policy.keys(&record) {
            Ok(keys) => {
                let merge = self.consolidate(record, keys);
                debug!(stream = self.policy.name(), ?merge, "Record consolidated");
                true
            }
            Err(e) => {
                self.reject(&e);
                self.reported.push(record);
                false
            }
        }
    }

    fn on_finished(&mut self, records: Vec<P::Record>) -> bool {
        if !self.lifecycle.busy() {
            debug!(stream = self.policy.name(), "Ignoring finished outside a request");
            return false;
        }

        match self.mode {
            Mode::ColdStart => {
                let mut keyed = Vec::with_capacity(records.len());
                for record in records {
                    if let Some(keys) = self.terminal_keys(&record) {
                        keyed.push((record, keys));
                    }
                }
                if let Some(delta) = self.list.replace_all(keyed) {
                    self.notifier.send(StreamNotification::Rows { delta });
                }
            }
            Mode::Continuation => {
                for record in records {
                    if let Some(keys) = self.terminal_keys(&record) {
                        self.consolidate(record, keys);
                    }
                }
            }
        }
        self.reported.clear();

        let now = self.clock.now();
        let Some(latency_ms) = self.lifecycle.finish(now) else {
            return false;
        };

        // Parsed by the benchmark tooling; keep the format stable.
        info!(target: "benchmark", "$,{},{}", self.policy.name(), latency_ms);
        info!(
            stream = self.policy.name(),
            count = self.list.len(),
            latency_ms,
            "Request finished"
        );
        self.notifier.send(StreamNotification::Finished {
            latency_ms,
            count: self.list.len(),
        });

        if self.config.watch_after_finish {
            if let Some(handle) = self.handle {
                if self.watched != Some(handle) {
                    self.unwatch();
                    self.provider.watch(&handle);
                    self.watched = Some(handle);
                }
            }
        }
        true
    }

    fn on_error(&mut self, message: String) -> bool {
        if !self.lifecycle.fail(message.clone()) {
            debug!(stream = self.policy.name(), "Ignoring error outside a request");
            return false;
        }
        self.handle = None;
        warn!(stream = self.policy.name(), error = %message, "Request failed");
        self.notifier.send(StreamNotification::Error { message });
        true
    }

    fn on_live_update(&mut self, source: DateTime<Utc>) -> bool {
        if !self.lifecycle.live_update(source) {
            debug!(
                stream = self.policy.name(),
                state = %self.lifecycle.state(),
                "Ignoring live update"
            );
            return false;
        }
        self.mode = Mode::Continuation;
        debug!(stream = self.policy.name(), %source, "Live update");
        true
    }

    /// Merge one record into the list.
    ///
    /// A record for an event already on the list replaces it when its delay
    /// or cancellation changed, and is ignored otherwise. A replace is a
    /// removal followed by an insertion at the position the new effective
    /// time calls for. Anything else is inserted in order.
    fn consolidate(&mut self, record: P::Record, keys: RecordKeys) -> Merge {
        let Some(index) = self.list.find_event(&keys) else {
            let delta = self.list.insert(record, keys);
            let index = match delta {
                ListDelta::RowsInserted { first, .. } => first,
                _ => 0,
            };
            self.notifier.send(StreamNotification::Rows { delta });
            return Merge::Inserted { index };
        };

        if self
            .list
            .keys(index)
            .is_some_and(|existing| existing.same_status(&keys))
        {
            return Merge::Unchanged { index };
        }

        let summary = UpdateSummary {
            headline: self.policy.headline(&record),
            time: keys.effective,
            delay: keys.delay,
            canceled: keys.canceled,
        };

        if let Some((_, removed)) = self.list.remove(index) {
            self.notifier.send(StreamNotification::Rows { delta: removed });
        }
        let inserted = self.list.insert(record, keys);
        self.notifier
            .send(StreamNotification::Rows { delta: inserted });
        let to = match inserted {
            ListDelta::RowsInserted { first, .. } => first,
            _ => index,
        };

        // Replacements during a cold start are the list settling, not news.
        if self.mode == Mode::Continuation {
            info!(
                stream = self.policy.name(),
                update = %summary.message(),
                "Record updated"
            );
            self.notifier.send(StreamNotification::Updated { summary });
        }
        Merge::Replaced { from: index, to }
    }

    fn reject(&mut self, error: &DomainError) {
        self.rejected_records += 1;
        warn!(stream = self.policy.name(), %error, "Rejecting malformed record");
        self.notifier.send(StreamNotification::RecordRejected {
            reason: error.to_string(),
        });
    }

    /// Keys for a record of a terminal payload.
    ///
    /// The payload repeats records that were already streamed, so a
    /// malformed one that was reported on arrival is not reported again.
    fn terminal_keys(&mut self, record: &P::Record) -> Option<RecordKeys> {
        match self.policy.keys(record) {
            Ok(keys) => Some(keys),
            Err(e) => {
                match self.reported.iter().position(|r| r == record) {
                    Some(seen) => {
                        self.reported.swap_remove(seen);
                        debug!(stream = self.policy.name(), error = %e, "Skipping reported record");
                    }
                    None => self.reject(&e),
                }
                None
            }
        }
    }

    fn begin(&mut self, continuation: bool) -> Result<Generation, StreamError> {
        let now = self.clock.now();
        match self.lifecycle.begin(now, continuation) {
            Ok(generation) => {
                self.unwatch();
                self.handle = None;
                self.reported.clear();
                self.notifier.send(StreamNotification::Started { generation });
                Ok(generation)
            }
            Err(e) => {
                if let StreamError::ConcurrentRequestRejected(state) = e {
                    self.notifier.send(StreamNotification::Rejected { state });
                }
                debug!(stream = self.policy.name(), error = %e, "Request rejected");
                Err(e)
            }
        }
    }

    fn issue(&mut self, params: &P::Params, generation: Generation) -> Result<Generation, StreamError> {
        match self.provider.request(params, generation) {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(generation)
            }
            Err(e) => {
                let message = e.to_string();
                self.lifecycle.fail(message.clone());
                warn!(stream = self.policy.name(), error = %message, "Provider refused request");
                self.notifier.send(StreamNotification::Error { message });
                Err(e.into())
            }
        }
    }

    fn unwatch(&mut self) {
        if let Some(handle) = self.watched.take() {
            self.provider.unwatch(&handle);
        }
    }

    fn observed(&self) -> Observed {
        Observed {
            state: self.lifecycle.state(),
            busy: self.lifecycle.busy(),
            valid: self.lifecycle.valid(),
        }
    }

    fn publish_transition(&self, before: Observed) {
        let after = self.observed();
        if after.state != before.state {
            self.notifier
                .send(StreamNotification::StateChanged { state: after.state });
        }
        if after.busy != before.busy {
            self.notifier
                .send(StreamNotification::BusyChanged { busy: after.busy });
        }
        if after.valid != before.valid {
            self.notifier
                .send(StreamNotification::ValidChanged { valid: after.valid });
        }
    }
}

impl<P, O, C> ConsolidatedStream<P, O, C>
where
    P: Provider,
    P::Record: Clone,
    O: OrderingPolicy<Record = P::Record>,
    C: Clock,
{
    /// Copy of the current list.
    pub fn snapshot(&self) -> Vec<P::Record> {
        self.list.snapshot()
    }
}

#[cfg(test)]
#[path = "consolidated_tests.rs"]
mod tests;
