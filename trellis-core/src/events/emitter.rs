//! Event emitter.
//!
//! Listeners are grouped by event name and run in registration order.
//! Every listener receives a *receiver* (the object the event is about)
//! plus the emitted arguments, so one emitter type serves both per-instance
//! and class-wide subscriptions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

/// Unique identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A listener callback: `(receiver, args)`.
pub type Listener<R> = Arc<dyn Fn(&R, &[Value]) + Send + Sync>;

struct Entry<R> {
    id: ListenerId,
    once: bool,
    listener: Listener<R>,
}

/// Ordered per-event listener registry.
pub struct Emitter<R> {
    listeners: RwLock<IndexMap<String, Vec<Entry<R>>>>,
}

impl<R> Emitter<R> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(IndexMap::new()),
        }
    }

    /// Register `listener` for `event`.
    pub fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&R, &[Value]) + Send + Sync + 'static,
    {
        self.register(event, Arc::new(listener), false)
    }

    /// Register `listener` for the next emission of `event` only.
    pub fn once<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&R, &[Value]) + Send + Sync + 'static,
    {
        self.register(event, Arc::new(listener), true)
    }

    /// Register an already shared listener.
    pub fn register(&self, event: &str, listener: Listener<R>, once: bool) -> ListenerId {
        let id = ListenerId::new();
        self.listeners
            .write()
            .entry(event.to_owned())
            .or_default()
            .push(Entry { id, once, listener });
        id
    }

    /// Remove one listener. Returns false when it was not registered.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(entries) = listeners.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    /// Remove every listener for `event`.
    pub fn off_event(&self, event: &str) {
        self.listeners.write().shift_remove(event);
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Invoke the listeners of `event` with `receiver` and `args`.
    ///
    /// Returns the number of listeners invoked. Listeners registered while
    /// the emission runs are not invoked by it.
    pub fn emit(&self, receiver: &R, event: &str, args: &[Value]) -> usize {
        let snapshot: Vec<Listener<R>> = {
            let mut listeners = self.listeners.write();
            let Some(entries) = listeners.get_mut(event) else {
                return 0;
            };
            let snapshot = entries.iter().map(|entry| Arc::clone(&entry.listener)).collect();
            entries.retain(|entry| !entry.once);
            snapshot
        };

        for listener in &snapshot {
            listener(receiver, args);
        }
        snapshot.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }
}

impl<R> Default for Emitter<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for Emitter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let counts: Vec<(&String, usize)> = listeners
            .iter()
            .map(|(event, entries)| (event, entries.len()))
            .collect();
        f.debug_struct("Emitter").field("listeners", &counts).finish()
    }
}

/// Event subscription capability.
///
/// Implemented identically by every type that exposes an [`Emitter`].
pub trait Events {
    /// Receiver passed to this emitter's listeners.
    type Receiver;

    fn emitter(&self) -> &Emitter<Self::Receiver>;

    fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&Self::Receiver, &[Value]) + Send + Sync + 'static,
    {
        self.emitter().on(event, listener)
    }

    fn once<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&Self::Receiver, &[Value]) + Send + Sync + 'static,
    {
        self.emitter().once(event, listener)
    }

    fn off(&self, event: &str, id: ListenerId) -> bool {
        self.emitter().off(event, id)
    }

    fn off_event(&self, event: &str) {
        self.emitter().off_event(event)
    }

    fn listener_count(&self, event: &str) -> usize {
        self.emitter().listener_count(event)
    }
}
