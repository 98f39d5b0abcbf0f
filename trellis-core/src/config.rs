//! View class configuration.
//!
//! Behaviour that differs between flavours of the view layer is selected
//! per class instead of being baked in. A config can be built in code or
//! loaded from JSON:
//!
//! ```rust,ignore
//! let config = ViewConfig::from_json(r#"{ "lookup": "strict", "props": "sealed" }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What `lookup` does when no view in the owner chain has the key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupPolicy {
    /// Answer from the local state, which yields an undefined value.
    #[default]
    Lenient,

    /// Fail with `PropertyNotFound`.
    Strict,
}

/// When instances see filters registered on their class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterScope {
    /// Instances read the class registry on every render, so filters added
    /// later reach existing views.
    #[default]
    Shared,

    /// Each instance copies the class registry when it is constructed.
    Snapshot,
}

/// Write policy for a view's properties after construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropsMode {
    /// Every write is ignored.
    #[default]
    Frozen,

    /// Writes to keys present at construction are applied, new keys are
    /// ignored.
    Sealed,

    /// Every write is applied.
    Mutable,
}

/// Per-class configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub lookup: LookupPolicy,
    pub filters: FilterScope,
    pub props: PropsMode,

    /// Bind `{{ }}` expressions found in the element's text nodes when a
    /// view is constructed.
    pub text_bindings: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            lookup: LookupPolicy::default(),
            filters: FilterScope::default(),
            props: PropsMode::default(),
            text_bindings: true,
        }
    }
}

impl ViewConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    ///
    /// Malformed input surfaces as [`ViewError::Config`](crate::ViewError::Config).
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_lookup(mut self, lookup: LookupPolicy) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_filters(mut self, filters: FilterScope) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_props(mut self, props: PropsMode) -> Self {
        self.props = props;
        self
    }

    pub fn with_text_bindings(mut self, enabled: bool) -> Self {
        self.text_bindings = enabled;
        self
    }
}
