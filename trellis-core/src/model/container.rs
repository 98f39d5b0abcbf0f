//! Model Implementation
//!
//! A Model is a key/value container with change notification. It is the
//! state holder behind every view: one model for the view's own state and
//! one for the properties handed to it.
//!
//! # How Writes Propagate
//!
//! 1. A `set`/`set_many`/`unset` call first passes the model's
//!    [`WritePolicy`]. Writes a frozen or sealed model refuses are dropped.
//!
//! 2. Each admitted write is applied and diffed against the previous value
//!    of its top-level key. The resulting batch names the written path, its
//!    ancestors, and every nested path whose value differs.
//!
//! 3. Computed keys depending on any changed path are invalidated. Watched
//!    ones recompute immediately and join the batch if their value moved.
//!
//! 4. Each watcher runs once with the part of the batch it asked for.
//!
//! No lock is held while derive functions or watchers run, so both may
//! call back into the model.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::map::Entry;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::trace;

use super::change::{Change, Keys};
use super::computed::{Computed, Memo, MemoState, Schema};
use super::path;
use super::subscriber::{SubscriberId, Unbind};

/// Counter for generating unique model IDs.
static MODEL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique model ID.
fn next_model_id() -> u64 {
    MODEL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Callback invoked with the changes a watcher asked for.
pub type ChangeHandler = Arc<dyn Fn(&[Change]) + Send + Sync>;

/// Which writes a model accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePolicy {
    /// Every write is applied.
    Open,

    /// Only writes under the listed top-level keys are applied.
    Sealed(HashSet<String>),

    /// Every write is ignored.
    Frozen,
}

struct Watcher {
    id: SubscriberId,
    keys: Keys,
    handler: ChangeHandler,
}

struct ModelInner {
    id: u64,
    schema: Arc<Schema>,
    data: RwLock<Map<String, Value>>,
    memos: RwLock<HashMap<String, Memo>>,
    watchers: RwLock<Vec<Watcher>>,
    policy: RwLock<WritePolicy>,
}

/// A reactive key/value container.
///
/// Cloning a model yields another handle to the same container.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    /// Create a model over `data` whose computed keys come from `schema`.
    pub fn new(schema: Arc<Schema>, data: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                id: next_model_id(),
                schema,
                data: RwLock::new(data),
                memos: RwLock::new(HashMap::new()),
                watchers: RwLock::new(Vec::new()),
                policy: RwLock::new(WritePolicy::Open),
            }),
        }
    }

    /// Get the model's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    /// Whether two handles point at the same container.
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether `key` has a defined value. Computed keys are always defined.
    pub fn has(&self, key: &str) -> bool {
        self.inner.schema.is_computed(key) || path::resolve(&self.inner.data.read(), key).is_some()
    }

    /// Get the value at `key`, which may be a dotted path or a computed key.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(definition) = self.inner.schema.get(key) {
            return Some(self.evaluate(&definition));
        }
        path::resolve(&self.inner.data.read(), key).cloned()
    }

    /// Get several values at once, keyed by the requested key.
    pub fn get_many(&self, keys: impl Into<Keys>) -> IndexMap<String, Option<Value>> {
        keys.into()
            .into_iter()
            .map(|key| {
                let value = self.get(&key);
                (key, value)
            })
            .collect()
    }

    /// Set a single value and notify watchers.
    ///
    /// Returns the batch of changes the write produced.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Vec<Change> {
        self.write(vec![(key.to_owned(), Some(value.into()))])
    }

    /// Set several values as one batch.
    pub fn set_many(&self, values: Map<String, Value>) -> Vec<Change> {
        self.write(values.into_iter().map(|(key, value)| (key, Some(value))).collect())
    }

    /// Remove the value at `key`, leaving it undefined.
    pub fn unset(&self, key: &str) -> Vec<Change> {
        self.write(vec![(key.to_owned(), None)])
    }

    /// Watch `keys` for changes.
    ///
    /// The handler runs at most once per write, with the changes to the
    /// watched keys. Watching a computed key computes it right away so
    /// later changes can be reported against a known value.
    pub fn change<F>(&self, keys: impl Into<Keys>, handler: F) -> Unbind
    where
        F: Fn(&[Change]) + Send + Sync + 'static,
    {
        let keys = keys.into();
        for key in keys.iter() {
            if let Some(definition) = self.inner.schema.get(key) {
                self.evaluate(&definition);
            }
        }

        let id = SubscriberId::new();
        self.inner.watchers.write().push(Watcher {
            id,
            keys,
            handler: Arc::new(handler),
        });

        let model: Weak<ModelInner> = Arc::downgrade(&self.inner);
        Unbind::new(move || {
            if let Some(inner) = model.upgrade() {
                Model { inner }.unwatch(id);
            }
        })
    }

    /// Remove a watcher. Returns false when it was already gone.
    pub fn unwatch(&self, id: SubscriberId) -> bool {
        let mut watchers = self.inner.watchers.write();
        let before = watchers.len();
        watchers.retain(|watcher| watcher.id != id);
        watchers.len() != before
    }

    /// Remove every watcher.
    pub fn clear_watchers(&self) {
        self.inner.watchers.write().clear();
    }

    /// Get the number of watchers.
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.read().len()
    }

    /// Copy of the stored (non-computed) data.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.data.read().clone()
    }

    /// Accept writes only under the top-level keys present right now.
    pub fn seal(&self) {
        let keys = self.inner.data.read().keys().cloned().collect();
        *self.inner.policy.write() = WritePolicy::Sealed(keys);
    }

    /// Ignore every further write.
    pub fn freeze(&self) {
        *self.inner.policy.write() = WritePolicy::Frozen;
    }

    pub fn policy(&self) -> WritePolicy {
        self.inner.policy.read().clone()
    }

    /// Read a computed key, recomputing it if its cache is dirty.
    fn evaluate(&self, definition: &Computed) -> Value {
        if let Some(memo) = self.inner.memos.read().get(definition.key()) {
            if let (MemoState::Clean, Some(value)) = (memo.state, &memo.value) {
                return value.clone();
            }
        }

        let args: Vec<Option<Value>> = definition.deps().iter().map(|dep| self.get(dep)).collect();
        let value = definition.derive(&args);
        trace!(model = self.inner.id, key = definition.key(), "computed key evaluated");

        self.inner
            .memos
            .write()
            .insert(definition.key().to_owned(), Memo::clean(value.clone()));
        value
    }

    fn admit(&self, updates: Vec<(String, Option<Value>)>) -> Vec<(String, Option<Value>)> {
        let policy = self.inner.policy.read();
        let admitted: Vec<_> = match &*policy {
            WritePolicy::Open => updates,
            WritePolicy::Frozen => Vec::new(),
            WritePolicy::Sealed(allowed) => updates
                .into_iter()
                .filter(|(key, _)| allowed.contains(path::head(key)))
                .collect(),
        };
        drop(policy);

        admitted
            .into_iter()
            .filter(|(key, _)| {
                let computed = self.inner.schema.is_computed(key);
                if computed {
                    trace!(model = self.inner.id, key = key.as_str(), "write to computed key ignored");
                }
                !computed
            })
            .collect()
    }

    fn write(&self, updates: Vec<(String, Option<Value>)>) -> Vec<Change> {
        let requested = updates.len();
        let updates = self.admit(updates);
        if updates.len() < requested {
            trace!(
                model = self.inner.id,
                ignored = requested - updates.len(),
                "writes refused by policy"
            );
        }
        if updates.is_empty() {
            return Vec::new();
        }

        let mut raw = Vec::new();
        {
            let mut data = self.inner.data.write();
            for (key, value) in updates {
                let top = path::head(&key).to_owned();
                let previous = data.get(&top).cloned();
                match value {
                    Some(value) => path::assign(&mut data, &key, value),
                    None => {
                        path::remove(&mut data, &key);
                    }
                }
                path::diff(&top, previous.as_ref(), data.get(&top), &mut raw);
            }
        }

        let mut changes: IndexMap<String, Change> = IndexMap::new();
        for change in raw {
            match changes.entry(change.key.clone()) {
                Entry::Occupied(mut entry) => entry.get_mut().current = change.current,
                Entry::Vacant(entry) => {
                    entry.insert(change);
                }
            }
        }
        changes.retain(|_, change| change.previous != change.current);
        if changes.is_empty() {
            return Vec::new();
        }

        self.propagate(&mut changes);

        let changes: Vec<Change> = changes.into_values().collect();
        trace!(model = self.inner.id, changed = changes.len(), "model changed");
        self.notify(&changes);
        changes
    }

    /// Invalidate computed keys touched by `changes` and fold the watched
    /// ones that moved into the batch.
    fn propagate(&self, changes: &mut IndexMap<String, Change>) {
        let dirty = self.inner.schema.affected_by(|key| changes.contains_key(key));
        if dirty.is_empty() {
            return;
        }

        {
            let mut memos = self.inner.memos.write();
            for key in &dirty {
                if let Some(memo) = memos.get_mut(key) {
                    memo.state = MemoState::Dirty;
                }
            }
        }

        for key in dirty {
            if !self.is_watched(&key) {
                continue;
            }
            let Some(definition) = self.inner.schema.get(&key) else {
                continue;
            };
            let previous = self
                .inner
                .memos
                .read()
                .get(&key)
                .and_then(|memo| memo.value.clone());
            let current = Some(self.evaluate(&definition));
            if previous != current {
                changes.insert(
                    key.clone(),
                    Change {
                        key,
                        previous,
                        current,
                    },
                );
            }
        }
    }

    fn is_watched(&self, key: &str) -> bool {
        self.inner
            .watchers
            .read()
            .iter()
            .any(|watcher| watcher.keys.contains(key))
    }

    fn has_watcher(&self, id: SubscriberId) -> bool {
        self.inner.watchers.read().iter().any(|watcher| watcher.id == id)
    }

    fn notify(&self, changes: &[Change]) {
        let watchers: Vec<(SubscriberId, Keys, ChangeHandler)> = self
            .inner
            .watchers
            .read()
            .iter()
            .map(|watcher| (watcher.id, watcher.keys.clone(), Arc::clone(&watcher.handler)))
            .collect();

        for (id, keys, handler) in watchers {
            let relevant: Vec<Change> = changes
                .iter()
                .filter(|change| keys.contains(&change.key))
                .cloned()
                .collect();
            // An earlier handler in this batch may have unbound this one.
            if relevant.is_empty() || !self.has_watcher(id) {
                continue;
            }
            handler(&relevant);
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.inner.id)
            .field("data", &*self.inner.data.read())
            .field("watcher_count", &self.watcher_count())
            .field("policy", &self.policy())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
