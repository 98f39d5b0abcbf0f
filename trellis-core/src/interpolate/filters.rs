//! Named value transforms used inside interpolation expressions.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

/// A filter maps one value to another.
pub type Filter = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// A registry of filters by name.
///
/// Cloning is cheap: the filter functions themselves are shared.
#[derive(Clone, Default)]
pub struct Filters {
    map: IndexMap<String, Filter>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `filter` under `name`, replacing any earlier one.
    pub fn insert<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.map.insert(name.into(), Arc::new(filter));
    }

    pub fn get(&self, name: &str) -> Option<&Filter> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
