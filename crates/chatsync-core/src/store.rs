//! State container.
//!
//! The store owns the current [`Snapshot`] and is the only place a new one
//! is installed. Dispatches run one at a time: read current, reduce,
//! publish. Publishing never waits for observers.

use crate::action::Action;
use crate::config::EngineConfig;
use crate::hub::{Emitter, UpstreamError, UpstreamFactory};
use crate::lifecycle::LifecycleController;
use crate::multiplexer::Multiplexer;
use crate::reducer::{ReduceError, ReducerRegistry};
use crate::snapshot::Snapshot;
use crate::subscription::SubscriptionHandle;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A reducer rejected the action. Nothing was committed.
    #[error("Reducer defect: {0}")]
    Reduce(#[from] ReduceError),
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of committed dispatches.
    pub version: u64,
    /// Number of live snapshot streams.
    pub observers: usize,
}

/// The state container.
pub struct Store {
    registry: ReducerRegistry,
    config: EngineConfig,
    /// Serialises dispatches.
    writer: Mutex<()>,
    publisher: watch::Sender<Arc<Snapshot>>,
    version: AtomicU64,
}

impl Store {
    /// Create a store with the default reducers and configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a store with the default reducers for a configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let registry = ReducerRegistry::with_defaults(&config);
        Self::with_registry(registry, config)
    }

    /// Create a store with an explicit registry.
    #[must_use]
    pub fn with_registry(registry: ReducerRegistry, config: EngineConfig) -> Self {
        info!("Creating store with {:?}", registry);
        let (publisher, _) = watch::channel(Arc::new(Snapshot::new()));
        Self {
            registry,
            config,
            writer: Mutex::new(()),
            publisher,
            version: AtomicU64::new(0),
        }
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The latest committed snapshot.
    #[must_use]
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.publisher.borrow().clone()
    }

    /// Number of committed dispatches.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Get store statistics.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            version: self.version(),
            observers: self.publisher.receiver_count(),
        }
    }

    /// Apply an action and commit the result.
    ///
    /// Each dispatch observes the snapshot committed by the one before it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Reduce`] if the reducer rejects the action; the
    /// previously committed snapshot stays current.
    pub fn dispatch(&self, action: Action) -> Result<Arc<Snapshot>, StoreError> {
        let kind = action.kind();
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.current_snapshot();
        let next = match self.registry.apply(&previous, &action) {
            Ok(next) => Arc::new(next),
            Err(e) => {
                warn!(kind = %kind, error = %e, "Reducer defect, nothing committed");
                return Err(e.into());
            }
        };

        self.publisher.send_replace(Arc::clone(&next));
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(kind = %kind, version, "Committed snapshot");

        Ok(next)
    }

    /// Dispatch actions in order.
    ///
    /// Returns the last committed snapshot.
    ///
    /// # Errors
    ///
    /// Stops at the first action a reducer rejects; earlier actions stay
    /// committed.
    pub fn dispatch_all<I>(&self, actions: I) -> Result<Arc<Snapshot>, StoreError>
    where
        I: IntoIterator<Item = Action>,
    {
        let mut last = self.current_snapshot();
        for action in actions {
            last = self.dispatch(action)?;
        }
        Ok(last)
    }

    /// Observe committed snapshots from now on.
    ///
    /// The stream yields the current snapshot first.
    #[must_use]
    pub fn observe(&self) -> SnapshotStream {
        let mut receiver = self.publisher.subscribe();
        receiver.mark_changed();
        SnapshotStream { receiver }
    }

    /// A multiplexer over committed snapshots. The forwarding task runs
    /// while at least one consumer is attached.
    ///
    /// Consumers must attach from within a Tokio runtime.
    #[must_use]
    pub fn multiplexer(self: &Arc<Self>) -> Multiplexer<Arc<Snapshot>> {
        Multiplexer::with_factory("snapshots", self.snapshot_upstream())
    }

    /// A lifecycle controller over committed snapshots. The forwarding task
    /// runs while the controller is active.
    ///
    /// The controller must be activated from within a Tokio runtime.
    #[must_use]
    pub fn lifecycle_controller(self: &Arc<Self>) -> LifecycleController<Arc<Snapshot>> {
        LifecycleController::with_factory(
            "snapshots",
            self.snapshot_upstream(),
            self.config.replay_last_value,
        )
    }

    fn snapshot_upstream(self: &Arc<Self>) -> UpstreamFactory<Arc<Snapshot>> {
        let store = Arc::downgrade(self);
        Arc::new(move |emitter: Emitter<Arc<Snapshot>>| {
            let Some(store) = store.upgrade() else {
                emitter.fail(UpstreamError::Closed);
                return SubscriptionHandle::noop("snapshots");
            };
            let mut stream = store.observe();
            drop(store);

            let task = tokio::spawn(async move {
                loop {
                    match stream.next().await {
                        Some(snapshot) => {
                            if !emitter.emit(snapshot) {
                                return;
                            }
                        }
                        None => {
                            emitter.fail(UpstreamError::Closed);
                            return;
                        }
                    }
                }
            });
            SubscriptionHandle::from_task("snapshots", task)
        })
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream of committed snapshots.
///
/// Conflating: a reader that falls behind skips to the latest snapshot,
/// never out of order.
#[derive(Debug)]
pub struct SnapshotStream {
    receiver: watch::Receiver<Arc<Snapshot>>,
}

impl SnapshotStream {
    /// Wait for the next committed snapshot.
    ///
    /// Returns `None` once the store is dropped.
    pub async fn next(&mut self) -> Option<Arc<Snapshot>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Take the latest unseen snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Arc<Snapshot>> {
        match self.receiver.has_changed() {
            Ok(true) => Some(self.receiver.borrow_and_update().clone()),
            _ => None,
        }
    }

    /// Stop observing.
    pub fn unsubscribe(self) {}
}
