//! Views
//!
//! [`ViewClass`] is the factory output for one template; [`View`] is a
//! live instance of it. A view owns an element, a state model and a
//! property model, and can read through its owner chain.

mod accessor;
mod class;
mod instance;
mod options;

pub use accessor::PropAccessor;
pub use class::{ProcessHook, ViewClass, ViewClassBuilder};
pub use instance::{View, ViewId};
pub use options::ViewOptions;
