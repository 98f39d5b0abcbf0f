//! Events
//!
//! Lifecycle notifications for views are delivered through an [`Emitter`].
//! Both view classes and view instances carry one and expose it through the
//! [`Events`] trait, so subscribing looks the same on either.

mod emitter;

pub use emitter::{Emitter, Events, Listener, ListenerId};
