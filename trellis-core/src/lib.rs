//! Trellis Core
//!
//! This crate provides the runtime for the Trellis view-controller layer.
//! It implements:
//!
//! - A view factory that turns a template into a reusable view class
//! - Reactive state containers with computed keys and change watchers
//! - Key resolution through state, properties and an owner chain
//! - Lifecycle events at class and instance level
//! - String interpolation with filters, bound to element text
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `model`: Key/value containers, computed keys and change batches
//! - `events`: Named event listeners with a receiver
//! - `dom`: A small element tree and the template parser that builds it
//! - `interpolate`: `{{ key | filter }}` templates
//! - `view`: View classes and view instances
//! - `config`: Per-class behaviour switches
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::{json, Value};
//! use trellis_core::{Events, Node, ViewClass, ViewOptions};
//!
//! // Create a view class from a template
//! let greeting = ViewClass::new("<p>Hello {{ fullName }}</p>");
//!
//! // Derive a value from two state keys
//! greeting.computed("fullName", ["first", "last"], |args| {
//!     let part = |v: &Option<Value>| v.as_ref().and_then(Value::as_str).unwrap_or("").to_owned();
//!     json!(format!("{} {}", part(&args[0]), part(&args[1])))
//! });
//!
//! // Listen to every instance
//! greeting.on("mount", |view, _| println!("mounted {}", view.id()));
//!
//! // Construct and mount
//! let view = greeting.create(ViewOptions::new().state(json!({ "first": "Ada", "last": "Lovelace" })))?;
//! view.mount(&Node::element("body"))?;
//!
//! // The bound text follows state
//! view.set("first", "Augusta");
//! assert_eq!(view.el().text_content(), "Hello Augusta Lovelace");
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod events;
pub mod interpolate;
pub mod model;
pub mod view;

pub use config::{FilterScope, LookupPolicy, PropsMode, ViewConfig};
pub use dom::{Domify, Node, Renderer, TemplateError};
pub use error::{Result, ViewError};
pub use events::{Emitter, Events, ListenerId};
pub use interpolate::Filters;
pub use model::{Change, Keys, Model, Unbind};
pub use view::{PropAccessor, View, ViewClass, ViewId, ViewOptions};
