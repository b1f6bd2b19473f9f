//! Lifecycle-bound controller.
//!
//! Runs an upstream only while an external host says it is active (a screen
//! is visible, an app is in the foreground). Consumers stay attached across
//! cycles and are replayed the last value on attach. Closing the controller
//! when the host is destroyed ends every consumer's stream.
//!
//! ```text
//!            activate: new upstream
//!   Inactive ───────────────────────▶ Active
//!      ▲                                 │
//!      └─────────────────────────────────┘
//!        deactivate or upstream failure:
//!        cancel upstream, keep last value
//!
//!   Inactive | Active ── close ──▶ Closed
//!        cancel upstream, end consumer streams
//! ```

use crate::hub::{Consumer, Emitter, Hub, HubStats, UpstreamError, UpstreamFactory, UpstreamPolicy};
use crate::subscription::SubscriptionHandle;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// No upstream is running.
    Inactive,
    /// An upstream is running.
    Active,
    /// The host is gone. Nothing runs or restarts.
    Closed,
}

/// Edge-triggered lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// The host became active.
    Activate,
    /// The host became inactive.
    Deactivate,
    /// The host was destroyed.
    Destroy,
}

/// Anything that can be driven by lifecycle edges.
pub trait LifecycleObserver: Send + Sync {
    /// Handle the host becoming active.
    fn on_activate(&self);

    /// Handle the host becoming inactive.
    fn on_deactivate(&self);

    /// Handle the host being destroyed.
    fn on_destroy(&self);

    /// Dispatch a signal to the matching handler.
    fn on_signal(&self, signal: LifecycleSignal) {
        match signal {
            LifecycleSignal::Activate => self.on_activate(),
            LifecycleSignal::Deactivate => self.on_deactivate(),
            LifecycleSignal::Destroy => self.on_destroy(),
        }
    }
}

/// Binds an upstream's lifetime to an activation signal.
pub struct LifecycleController<T>
where
    T: Clone + Send + Sync + 'static,
{
    hub: Arc<Hub<T>>,
}

impl<T> Clone for LifecycleController<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
        }
    }
}

impl<T> LifecycleController<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an inactive controller.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Emitter<T>) -> SubscriptionHandle + Send + Sync + 'static,
    {
        Self::with_factory(name, Arc::new(factory), true)
    }

    /// Create an inactive controller from a shared factory.
    ///
    /// With `replay_last_value` off, consumers only see values emitted after
    /// they attach.
    #[must_use]
    pub fn with_factory(
        name: impl Into<String>,
        factory: UpstreamFactory<T>,
        replay_last_value: bool,
    ) -> Self {
        Self {
            hub: Hub::new(name, UpstreamPolicy::External, replay_last_value, factory),
        }
    }

    /// Controller name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.hub.name()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        if self.hub.is_closed() {
            LifecyclePhase::Closed
        } else if self.hub.is_active() {
            LifecyclePhase::Active
        } else {
            LifecyclePhase::Inactive
        }
    }

    /// Move to `Active`, creating a brand-new upstream.
    ///
    /// Returns `false` if already active or closed.
    pub fn activate(&self) -> bool {
        if self.hub.start() {
            info!(controller = %self.hub.name(), "Activated");
            return true;
        }
        if self.hub.is_closed() {
            warn!(controller = %self.hub.name(), "Activate after close");
        } else {
            warn!(controller = %self.hub.name(), "Activate while already active");
        }
        false
    }

    /// Move to `Inactive`, cancelling the upstream and keeping the last
    /// value for replay.
    ///
    /// Returns `false` if not active.
    pub fn deactivate(&self) -> bool {
        if self.hub.stop() {
            info!(controller = %self.hub.name(), "Deactivated");
            true
        } else {
            warn!(
                controller = %self.hub.name(),
                phase = ?self.phase(),
                "Deactivate while not active"
            );
            false
        }
    }

    /// Move to `Closed` for good: cancel any running upstream and end every
    /// consumer's stream. Later activations are refused and later consumers
    /// start out ended.
    ///
    /// Returns `false` if already closed.
    pub fn close(&self) -> bool {
        if self.hub.close() {
            info!(controller = %self.hub.name(), "Closed");
            true
        } else {
            warn!(controller = %self.hub.name(), "Close while already closed");
            false
        }
    }

    /// Attach a consumer. It first receives the last known value, if any,
    /// then every value emitted while active.
    #[must_use]
    pub fn attach(&self) -> Consumer<T> {
        self.hub.attach()
    }

    /// Last value emitted by any upstream generation.
    #[must_use]
    pub fn last_value(&self) -> Option<T> {
        self.hub.last_value()
    }

    /// Failure that ended the most recent failed generation.
    #[must_use]
    pub fn last_failure(&self) -> Option<UpstreamError> {
        self.hub.last_failure()
    }

    /// Get controller statistics.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        self.hub.stats()
    }
}

impl<T> LifecycleObserver for LifecycleController<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn on_activate(&self) {
        self.activate();
    }

    fn on_deactivate(&self) {
        self.deactivate();
    }

    fn on_destroy(&self) {
        self.close();
    }
}

impl<T> fmt::Debug for LifecycleController<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleController")
            .field("name", &self.hub.name())
            .field("phase", &self.phase())
            .field("stats", &self.hub.stats())
            .finish()
    }
}
