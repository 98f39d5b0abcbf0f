//! Construction options.

use serde_json::{Map, Value};

use super::instance::View;
use crate::error::{Result, ViewError};

/// Named options accepted by [`ViewClass::construct`](super::ViewClass::construct)
/// and [`ViewClass::create`](super::ViewClass::create).
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    /// Parent view used for lookups the view cannot answer itself.
    pub owner: Option<View>,
    /// Initial local state.
    pub state: Option<Value>,
    /// Markup used instead of the class template.
    pub template: Option<String>,
    /// Initial properties.
    pub props: Option<Value>,
    /// Initial properties when `props` is absent.
    pub data: Option<Value>,
}

impl ViewOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner: &View) -> Self {
        self.owner = Some(owner.clone());
        self
    }

    pub fn state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn props(mut self, props: Value) -> Self {
        self.props = Some(props);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Turn optional seed data into a map. Absent and `null` give an empty map.
pub(crate) fn into_map(what: &'static str, value: Option<Value>) -> Result<Map<String, Value>> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(ViewError::InvalidData {
            what,
            found: kind(&other).to_owned(),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
