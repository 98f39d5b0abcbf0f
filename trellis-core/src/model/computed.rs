//! Computed Keys
//!
//! A computed key is a derived value registered on a [`Schema`]. Every
//! model built from that schema exposes the key like any other, caching the
//! derived value per model.
//!
//! # How Computed Keys Work
//!
//! 1. On first read, the model runs the derive function over the current
//!    values of the declared dependencies and caches the result.
//!
//! 2. While the cache is clean, reads return the cached value.
//!
//! 3. When a write changes one of the dependency paths, the cached value is
//!    marked dirty, along with every computed key that depends on it.
//!
//! 4. Dirty keys that somebody is watching recompute right away so their
//!    watchers can be told. Unwatched keys stay dirty until the next read.
//!
//! Each write recomputes a given key at most once, however many of its
//! dependencies changed in that write.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use super::change::Keys;

/// Derive function of a computed key. Receives the dependency values in
/// declaration order.
pub type Derive = Arc<dyn Fn(&[Option<Value>]) -> Value + Send + Sync>;

/// Dirty state for a cached computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency changed since the value was cached.
    Dirty,
}

/// Cached value of one computed key inside one model.
#[derive(Debug, Clone)]
pub(crate) struct Memo {
    pub(crate) value: Option<Value>,
    pub(crate) state: MemoState,
}

impl Memo {
    pub(crate) fn clean(value: Value) -> Self {
        Self {
            value: Some(value),
            state: MemoState::Clean,
        }
    }
}

/// Definition of a computed key.
pub struct Computed {
    key: String,
    deps: Keys,
    derive: Derive,
}

impl Computed {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Dependency paths, possibly dotted.
    pub fn deps(&self) -> &Keys {
        &self.deps
    }

    /// Run the derive function.
    pub fn derive(&self, args: &[Option<Value>]) -> Value {
        (self.derive)(args)
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("key", &self.key)
            .field("deps", &self.deps)
            .finish()
    }
}

/// The set of computed keys shared by a family of models.
///
/// A schema plays the role of a model "constructor": every model created
/// from it sees its computed keys, including keys registered after the
/// model was created.
#[derive(Default)]
pub struct Schema {
    computed: RwLock<IndexMap<String, Arc<Computed>>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a computed key. Registering the same key again replaces the
    /// earlier definition.
    pub fn computed<F>(&self, key: impl Into<String>, deps: impl Into<Keys>, derive: F)
    where
        F: Fn(&[Option<Value>]) -> Value + Send + Sync + 'static,
    {
        let key = key.into();
        let definition = Computed {
            key: key.clone(),
            deps: deps.into(),
            derive: Arc::new(derive),
        };
        self.computed.write().insert(key, Arc::new(definition));
    }

    pub fn get(&self, key: &str) -> Option<Arc<Computed>> {
        self.computed.read().get(key).cloned()
    }

    pub fn is_computed(&self, key: &str) -> bool {
        self.computed.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.computed.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.computed.read().is_empty()
    }

    /// Computed keys invalidated by a write, in registration order.
    ///
    /// `changed` reports whether a path changed. A computed key is
    /// invalidated when one of its dependencies changed or is itself an
    /// invalidated computed key.
    pub fn affected_by(&self, changed: impl Fn(&str) -> bool) -> Vec<String> {
        let definitions = self.computed.read();
        let mut dirty: Vec<&str> = Vec::new();

        loop {
            let before = dirty.len();
            for (key, definition) in definitions.iter() {
                if dirty.contains(&key.as_str()) {
                    continue;
                }
                let invalidated = definition
                    .deps
                    .iter()
                    .any(|dep| changed(dep) || dirty.contains(&dep));
                if invalidated {
                    dirty.push(key);
                }
            }
            if dirty.len() == before {
                break;
            }
        }

        dirty.sort_by_key(|key| definitions.get_index_of(*key));
        dirty.into_iter().map(str::to_owned).collect()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("computed", &self.computed.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
