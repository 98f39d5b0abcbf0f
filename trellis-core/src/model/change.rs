//! Change records and key sets.

use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;

/// A single key whose value changed during a write.
///
/// `None` stands for an absent (undefined) value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub key: String,
    pub previous: Option<Value>,
    pub current: Option<Value>,
}

/// An ordered, duplicate-free set of keys.
///
/// Most call sites pass one or two keys, so they stay inline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keys(SmallVec<[String; 2]>);

impl Keys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key unless it is already present.
    pub fn push(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !self.contains(&key) {
            self.0.push(key);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Keys {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut keys = Keys::new();
        for key in iter {
            keys.push(key);
        }
        keys
    }
}

impl IntoIterator for Keys {
    type Item = String;
    type IntoIter = smallvec::IntoIter<[String; 2]>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<&str> for Keys {
    fn from(key: &str) -> Self {
        std::iter::once(key).collect()
    }
}

impl From<String> for Keys {
    fn from(key: String) -> Self {
        std::iter::once(key).collect()
    }
}

impl From<&String> for Keys {
    fn from(key: &String) -> Self {
        std::iter::once(key.as_str()).collect()
    }
}

impl From<&[&str]> for Keys {
    fn from(keys: &[&str]) -> Self {
        keys.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for Keys {
    fn from(keys: [&str; N]) -> Self {
        keys.into_iter().collect()
    }
}

impl From<Vec<&str>> for Keys {
    fn from(keys: Vec<&str>) -> Self {
        keys.into_iter().collect()
    }
}

impl From<Vec<String>> for Keys {
    fn from(keys: Vec<String>) -> Self {
        keys.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_deduplicate_in_order() {
        let keys = Keys::from(["b", "a", "b", "c"]);
        assert_eq!(keys.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn single_key_conversion() {
        let keys = Keys::from("foo");
        assert!(keys.contains("foo"));
        assert!(!keys.contains("bar"));
    }
}
