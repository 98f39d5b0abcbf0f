//! Reactive Model
//!
//! This module implements the state container behind every view: a
//! key/value store with change notification and computed keys.
//!
//! # Concepts
//!
//! ## Models
//!
//! A [`Model`] holds JSON values under string keys. Keys may be dotted
//! paths (`names.first`) reaching into nested objects. Writes produce a
//! batch of [`Change`] records and every watcher sees each batch once.
//!
//! ## Schemas
//!
//! A [`Schema`] carries the computed keys shared by a family of models.
//! Each view class owns two schemas, one for view state and one for view
//! properties, so classes never see each other's computed keys.
//!
//! ## Computed keys
//!
//! A computed key derives its value from declared dependency paths. It is
//! cached per model and invalidated when a dependency changes.

mod change;
mod computed;
mod container;
mod path;
mod subscriber;

pub use change::{Change, Keys};
pub use computed::{Computed, Derive, MemoState, Schema};
pub use container::{ChangeHandler, Model, WritePolicy};
pub use subscriber::{SubscriberId, Unbind};
