//! Subscriber handles for the model.
//!
//! Every change watcher registered on a [`Model`](super::Model) gets a
//! [`SubscriberId`]. Callers get back an [`Unbind`] handle which removes
//! the watcher again.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Unique identifier for a change subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

type Teardown = Box<dyn FnOnce() + Send>;

/// Handle that removes a subscription when invoked.
///
/// Clones share the same underlying teardown, and the teardown runs at
/// most once no matter how many times or through which clone
/// [`unbind`](Self::unbind) is called. Dropping the handle does *not*
/// unsubscribe.
#[derive(Clone)]
pub struct Unbind {
    teardown: Arc<Mutex<Option<Teardown>>>,
}

impl Unbind {
    /// Wrap a teardown function.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Arc::new(Mutex::new(Some(Box::new(teardown)))),
        }
    }

    /// A handle with nothing to tear down.
    pub fn noop() -> Self {
        Self {
            teardown: Arc::new(Mutex::new(None)),
        }
    }

    /// Combine several handles into one.
    pub fn all(handles: Vec<Unbind>) -> Self {
        Self::new(move || {
            for handle in handles {
                handle.unbind();
            }
        })
    }

    /// Remove the subscription. Safe to call repeatedly.
    pub fn unbind(&self) {
        // Take the teardown out first so it runs without the lock held.
        let teardown = self.teardown.lock().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// Whether the teardown is still pending.
    pub fn is_bound(&self) -> bool {
        self.teardown.lock().is_some()
    }
}

impl fmt::Debug for Unbind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unbind")
            .field("bound", &self.is_bound())
            .finish()
    }
}
