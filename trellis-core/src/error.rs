//! Error types for the view layer.

use thiserror::Error;

use crate::dom::{DomError, TemplateError};
use crate::view::ViewId;

/// Errors raised by view classes and view instances.
#[derive(Debug, Error)]
pub enum ViewError {
    /// No container in the owner chain has the key (strict lookup only).
    #[error("property not found: {key}")]
    PropertyNotFound { key: String },

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Dom(#[from] DomError),

    /// `mount(target, replace = true)` with a target that has no parent.
    #[error("cannot replace a mount target that has no parent")]
    DetachedTarget,

    #[error("view {0} has been destroyed")]
    Destroyed(ViewId),

    /// Seed data that is neither an object nor null.
    #[error("expected an object for {what}, got {found}")]
    InvalidData { what: &'static str, found: String },

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = ViewError> = std::result::Result<T, E>;
