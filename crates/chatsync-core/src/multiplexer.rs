//! Broadcast multiplexer.
//!
//! Makes one upstream registration serve any number of consumers. The
//! upstream is created when the first consumer attaches and cancelled when
//! the last one detaches. An upstream failure ends the stream of every
//! consumer attached to it.

use crate::hub::{
    Consumer, Emitter, Hub, HubStats, UpstreamError, UpstreamFactory, UpstreamPolicy,
};
use crate::subscription::SubscriptionHandle;
use std::fmt;
use std::sync::Arc;

/// Fans one upstream out to many consumers.
///
/// Each consumer sees every value emitted after it attaches, conflated to
/// the latest when it reads slower than the upstream emits.
pub struct Multiplexer<T>
where
    T: Clone + Send + Sync + 'static,
{
    hub: Arc<Hub<T>>,
}

impl<T> Clone for Multiplexer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
        }
    }
}

impl<T> Multiplexer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a multiplexer. `on_first_subscribe` is not called until a
    /// consumer attaches.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, on_first_subscribe: F) -> Self
    where
        F: Fn(Emitter<T>) -> SubscriptionHandle + Send + Sync + 'static,
    {
        Self::with_factory(name, Arc::new(on_first_subscribe))
    }

    /// Create a multiplexer from a shared factory.
    #[must_use]
    pub fn with_factory(name: impl Into<String>, factory: UpstreamFactory<T>) -> Self {
        Self {
            hub: Hub::new(name, UpstreamPolicy::ConsumerCount, false, factory),
        }
    }

    /// Multiplexer name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.hub.name()
    }

    /// Attach a consumer, creating the upstream if none is running.
    ///
    /// After a failure the consumers attached at the time have ended, and
    /// the next attach creates a fresh upstream.
    #[must_use]
    pub fn attach(&self) -> Consumer<T> {
        self.hub.attach()
    }

    /// Get the number of attached consumers.
    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.hub.stats().consumer_count
    }

    /// Check whether the upstream is running.
    #[must_use]
    pub fn is_upstream_active(&self) -> bool {
        self.hub.is_active()
    }

    /// Failure that ended the most recent failed upstream.
    #[must_use]
    pub fn last_failure(&self) -> Option<UpstreamError> {
        self.hub.last_failure()
    }

    /// Get multiplexer statistics.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        self.hub.stats()
    }
}

impl<T> fmt::Debug for Multiplexer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiplexer")
            .field("name", &self.hub.name())
            .field("stats", &self.hub.stats())
            .finish()
    }
}
