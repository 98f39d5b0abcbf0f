//! DOM
//!
//! Views own exactly one element built from their template. This module
//! provides the element tree and the markup parser that builds it.
//!
//! Rendering goes through the [`Renderer`] trait so a view class can be
//! handed a different element builder. [`Domify`] is the default.

mod node;
mod parse;

pub use node::{DomError, Node, NodeKind};
pub use parse::{decode_entities, parse, Domify, Renderer, TemplateError};
