//! Shared fan-out machinery behind [`Multiplexer`](crate::multiplexer::Multiplexer)
//! and [`LifecycleController`](crate::lifecycle::LifecycleController).
//!
//! A hub owns one broadcast sender of capacity one, so every consumer holds
//! at most the latest value it has not read yet. Upstreams are numbered by
//! generation; an [`Emitter`] only delivers while its generation is the
//! open one, which is how a cancelled upstream is cut off even if its task
//! is still winding down.
//!
//! A consumer's stream ends when the hub is closed, or, for hubs whose
//! upstream follows the consumer count, when the upstream it was attached to
//! fails. Ends are published on a `watch` channel next to the broadcast.

use crate::subscription::SubscriptionHandle;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Per-consumer queue depth.
const CONSUMER_CAPACITY: usize = 1;

/// A consumer identifier, unique within one hub.
pub type ConsumerId = u64;

/// Creates the upstream registration. Receives the emitter the upstream
/// pushes its values through.
pub type UpstreamFactory<T> = Arc<dyn Fn(Emitter<T>) -> SubscriptionHandle + Send + Sync>;

/// Reported by an upstream that can no longer deliver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// The upstream failed.
    #[error("Upstream failed: {0}")]
    Failed(String),

    /// The upstream ended.
    #[error("Upstream closed")]
    Closed,
}

/// What decides when the upstream runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpstreamPolicy {
    /// Runs while at least one consumer is attached.
    ConsumerCount,
    /// Runs between explicit start and stop calls.
    External,
}

/// Hub statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubStats {
    /// Number of attached consumers.
    pub consumer_count: usize,
    /// Whether an upstream generation is running.
    pub upstream_active: bool,
    /// Number of upstreams created so far.
    pub upstreams_created: u64,
}

/// Stream ends published to consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Ended {
    /// Failures that ended every consumer attached at the time.
    failures: u64,
    closed: bool,
}

struct Gate<T> {
    generation: u64,
    open: bool,
    last: Option<T>,
}

struct HubState {
    consumers: HashSet<ConsumerId>,
    next_consumer: ConsumerId,
    active: Option<u64>,
    upstream: Option<SubscriptionHandle>,
    upstreams_created: u64,
    last_failure: Option<UpstreamError>,
    closed: bool,
}

pub(crate) struct Hub<T> {
    name: String,
    policy: UpstreamPolicy,
    replay_last: bool,
    factory: UpstreamFactory<T>,
    sender: broadcast::Sender<T>,
    // Written only under `state`.
    ended: watch::Sender<Ended>,
    // Lock order: `state` before `gate`. Emitters take only `gate`.
    gate: Mutex<Gate<T>>,
    state: Mutex<HubState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> Hub<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        name: impl Into<String>,
        policy: UpstreamPolicy,
        replay_last: bool,
        factory: UpstreamFactory<T>,
    ) -> Arc<Self> {
        let (sender, _) = broadcast::channel(CONSUMER_CAPACITY);
        Arc::new(Self {
            name: name.into(),
            policy,
            replay_last,
            factory,
            sender,
            ended: watch::Sender::new(Ended::default()),
            gate: Mutex::new(Gate {
                generation: 0,
                open: false,
                last: None,
            }),
            state: Mutex::new(HubState {
                consumers: HashSet::new(),
                next_consumer: 0,
                active: None,
                upstream: None,
                upstreams_created: 0,
                last_failure: None,
                closed: false,
            }),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn stats(&self) -> HubStats {
        let state = lock(&self.state);
        HubStats {
            consumer_count: state.consumers.len(),
            upstream_active: state.active.is_some(),
            upstreams_created: state.upstreams_created,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        lock(&self.state).active.is_some()
    }

    pub(crate) fn last_value(&self) -> Option<T> {
        lock(&self.gate).last.clone()
    }

    pub(crate) fn last_failure(&self) -> Option<UpstreamError> {
        lock(&self.state).last_failure.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Attach a consumer. Under [`UpstreamPolicy::ConsumerCount`] this
    /// starts the upstream if none is running.
    ///
    /// A consumer attached to a closed hub has already ended.
    pub(crate) fn attach(self: &Arc<Self>) -> Consumer<T> {
        let (id, receiver, seed, ended, baseline, closed) = {
            let mut state = lock(&self.state);
            let id = state.next_consumer;
            state.next_consumer += 1;
            if !state.closed {
                state.consumers.insert(id);
            }

            let gate = lock(&self.gate);
            let receiver = self.sender.subscribe();
            let seed = if self.replay_last {
                gate.last.clone()
            } else {
                None
            };
            let ended = self.ended.subscribe();
            let baseline = ended.borrow().failures;
            (id, receiver, seed, ended, baseline, state.closed)
        };

        debug!(
            hub = %self.name,
            consumer = id,
            replay = seed.is_some(),
            closed,
            "Consumer attached"
        );

        if self.policy == UpstreamPolicy::ConsumerCount && !closed {
            self.start();
        }

        Consumer {
            id,
            seed,
            receiver,
            ended,
            baseline,
            hub: Arc::clone(self),
            detached: false,
        }
    }

    fn detach(&self, id: ConsumerId) {
        let upstream = {
            let mut state = lock(&self.state);
            if !state.consumers.remove(&id) {
                return;
            }
            debug!(
                hub = %self.name,
                consumer = id,
                remaining = state.consumers.len(),
                "Consumer detached"
            );
            if self.policy == UpstreamPolicy::ConsumerCount && state.consumers.is_empty() {
                self.teardown(&mut state, None)
            } else {
                None
            }
        };
        Self::cancel(upstream);
    }

    /// Start a fresh upstream generation.
    ///
    /// Returns `false` if one is already running, or if the policy needs
    /// consumers and there are none.
    pub(crate) fn start(self: &Arc<Self>) -> bool {
        let generation = {
            let mut state = lock(&self.state);
            if state.active.is_some() || state.closed {
                return false;
            }
            if self.policy == UpstreamPolicy::ConsumerCount && state.consumers.is_empty() {
                return false;
            }
            let mut gate = lock(&self.gate);
            gate.generation += 1;
            gate.open = true;
            state.active = Some(gate.generation);
            state.upstreams_created += 1;
            gate.generation
        };

        info!(hub = %self.name, generation, "Starting upstream");

        // The factory runs without the state lock so it may emit or fail
        // synchronously.
        let handle = (self.factory)(Emitter {
            hub: Arc::downgrade(self),
            generation,
        });

        let stale = {
            let mut state = lock(&self.state);
            if state.active == Some(generation) {
                state.upstream = Some(handle);
                None
            } else {
                Some(handle)
            }
        };
        if stale.is_some() {
            debug!(hub = %self.name, generation, "Upstream stopped while starting");
        }
        Self::cancel(stale);
        true
    }

    /// Stop the running upstream generation, if any.
    pub(crate) fn stop(&self) -> bool {
        self.stop_generation(None, None)
    }

    fn stop_generation(&self, only: Option<u64>, failure: Option<UpstreamError>) -> bool {
        let upstream = {
            let mut state = lock(&self.state);
            match (state.active, only) {
                (None, _) => return false,
                (Some(active), Some(expected)) if active != expected => return false,
                _ => {}
            }
            self.teardown(&mut state, failure)
        };
        Self::cancel(upstream);
        true
    }

    /// Close the hub for good: stop the upstream and end every consumer.
    ///
    /// Returns `false` if already closed.
    pub(crate) fn close(&self) -> bool {
        let upstream = {
            let mut state = lock(&self.state);
            if state.closed {
                return false;
            }
            state.closed = true;
            let upstream = self.teardown(&mut state, None);
            info!(hub = %self.name, consumers = state.consumers.len(), "Closing hub");
            state.consumers.clear();
            self.ended.send_modify(|ended| ended.closed = true);
            upstream
        };
        Self::cancel(upstream);
        true
    }

    fn teardown(
        &self,
        state: &mut HubState,
        failure: Option<UpstreamError>,
    ) -> Option<SubscriptionHandle> {
        let generation = state.active.take()?;
        lock(&self.gate).open = false;
        match failure {
            Some(error) => {
                warn!(hub = %self.name, generation, error = %error, "Upstream failed");
                state.last_failure = Some(error);
                // Consumer-count upstreams restart only on attach
                if self.policy == UpstreamPolicy::ConsumerCount {
                    debug!(
                        hub = %self.name,
                        generation,
                        consumers = state.consumers.len(),
                        "Ending consumer streams"
                    );
                    state.consumers.clear();
                    self.ended.send_modify(|ended| ended.failures += 1);
                }
            }
            None => info!(hub = %self.name, generation, "Stopping upstream"),
        }
        state.upstream.take()
    }

    fn cancel(upstream: Option<SubscriptionHandle>) {
        if let Some(mut upstream) = upstream {
            upstream.unsubscribe();
        }
    }

    fn emit(&self, generation: u64, value: T) -> bool {
        let mut gate = lock(&self.gate);
        if !gate.open || gate.generation != generation {
            trace!(hub = %self.name, generation, "Dropping value from stale upstream");
            return false;
        }
        gate.last = Some(value.clone());
        let receivers = self.sender.send(value).unwrap_or_default();
        trace!(hub = %self.name, generation, receivers, "Emitted value");
        true
    }
}

/// Handle an upstream uses to push values into its hub.
///
/// Bound to one upstream generation: once that generation is stopped,
/// further values are discarded.
pub struct Emitter<T> {
    hub: Weak<Hub<T>>,
    generation: u64,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            hub: Weak::clone(&self.hub),
            generation: self.generation,
        }
    }
}

impl<T> Emitter<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Upstream generation this emitter belongs to.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Push a value to every attached consumer.
    ///
    /// Returns `false` if this emitter's generation has been stopped.
    pub fn emit(&self, value: T) -> bool {
        match self.hub.upgrade() {
            Some(hub) => hub.emit(self.generation, value),
            None => false,
        }
    }

    /// Report that the upstream can no longer deliver. The hub stops this
    /// generation; it is never restarted from here.
    pub fn fail(&self, error: UpstreamError) {
        if let Some(hub) = self.hub.upgrade() {
            hub.stop_generation(Some(self.generation), Some(error));
        }
    }

    /// Check whether this emitter's generation is still the open one.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.hub.upgrade().is_some_and(|hub| {
            let gate = lock(&hub.gate);
            gate.open && gate.generation == self.generation
        })
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("generation", &self.generation)
            .finish()
    }
}

/// One downstream consumer.
///
/// Holds at most one pending value; a consumer that falls behind sees only
/// the latest. Detaches when dropped.
pub struct Consumer<T>
where
    T: Clone + Send + Sync + 'static,
{
    id: ConsumerId,
    seed: Option<T>,
    receiver: broadcast::Receiver<T>,
    ended: watch::Receiver<Ended>,
    baseline: u64,
    hub: Arc<Hub<T>>,
    detached: bool,
}

impl<T> Consumer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Consumer ID.
    #[must_use]
    pub fn id(&self) -> ConsumerId {
        self.id
    }

    /// Check whether this consumer's stream has ended.
    ///
    /// An ended consumer yields nothing more, not even a value that was
    /// pending. The cause is in the owner's `last_failure()`, or the owner
    /// was closed.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        let ended = *self.ended.borrow();
        ended.closed || ended.failures != self.baseline
    }

    /// Wait for the next value.
    ///
    /// Returns `None` once the stream has ended. Cancel safe.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            if self.is_ended() {
                return None;
            }
            if let Some(value) = self.seed.take() {
                return Some(value);
            }
            let received = tokio::select! {
                biased;
                received = self.receiver.recv() => received,
                changed = self.ended.changed() => match changed {
                    Ok(()) => continue,
                    Err(_) => return None,
                },
            };
            match received {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    trace!(hub = %self.hub.name(), consumer = self.id, skipped, "Conflated");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the pending value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        if self.is_ended() {
            return None;
        }
        if let Some(value) = self.seed.take() {
            return Some(value);
        }
        loop {
            match self.receiver.try_recv() {
                Ok(value) => return Some(value),
                Err(TryRecvError::Lagged(skipped)) => {
                    trace!(hub = %self.hub.name(), consumer = self.id, skipped, "Conflated");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Detach from the hub. No value is delivered to this consumer after
    /// this returns.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.detached {
            self.detached = true;
            self.hub.detach(self.id);
        }
    }
}

impl<T> Drop for Consumer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.detach();
    }
}

impl<T> fmt::Debug for Consumer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("hub", &self.hub.name())
            .field("id", &self.id)
            .field("pending_seed", &self.seed.is_some())
            .field("ended", &self.is_ended())
            .finish()
    }
}
