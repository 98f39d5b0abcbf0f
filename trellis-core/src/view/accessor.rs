//! Accessors for declared properties.

use serde_json::Value;

use super::instance::View;

/// Read/write handle for one declared property of a view.
///
/// Writes go through the property model and are subject to the class's
/// [`PropsMode`](crate::config::PropsMode).
#[derive(Debug, Clone)]
pub struct PropAccessor<'a> {
    view: &'a View,
    name: String,
}

impl<'a> PropAccessor<'a> {
    pub(crate) fn new(view: &'a View, name: &str) -> Self {
        Self {
            view,
            name: name.to_owned(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value from the view's properties, ignoring state and owner.
    pub fn get(&self) -> Option<Value> {
        self.view.props().get(&self.name)
    }

    /// Write the property. Returns whether anything changed.
    pub fn set(&self, value: impl Into<Value>) -> bool {
        !self.view.props().set(&self.name, value).is_empty()
    }
}
