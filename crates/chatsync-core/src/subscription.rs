//! Cancellable registration with an external event source.

use std::fmt;
use tokio::task::JoinHandle;
use tracing::trace;

type Cancel = Box<dyn FnOnce() + Send + 'static>;

/// Owns exactly one cancellation capability.
///
/// Cancelling more than once is a no-op. The handle cancels itself when
/// dropped.
pub struct SubscriptionHandle {
    name: &'static str,
    cancel: Option<Cancel>,
}

impl SubscriptionHandle {
    /// Create a handle that runs `cancel` on the first unsubscribe.
    #[must_use]
    pub fn from_fn<F>(name: &'static str, cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Create a handle that aborts a spawned task.
    #[must_use]
    pub fn from_task(name: &'static str, task: JoinHandle<()>) -> Self {
        Self::from_fn(name, move || task.abort())
    }

    /// Create a handle with nothing to cancel.
    #[must_use]
    pub fn noop(name: &'static str) -> Self {
        Self::from_fn(name, || {})
    }

    /// Name given at construction, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check whether the handle has not been cancelled yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Cancel the registration.
    ///
    /// Returns `true` if this call performed the cancellation.
    pub fn unsubscribe(&mut self) -> bool {
        match self.cancel.take() {
            Some(cancel) => {
                trace!(subscription = %self.name, "Unsubscribing");
                cancel();
                true
            }
            None => false,
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish()
    }
}
