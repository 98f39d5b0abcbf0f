//! Interpolation
//!
//! String interpolation with named filters, used for text bindings.
//!
//! ```rust,ignore
//! let mut filters = Filters::new();
//! filters.insert("upper", |v| json!(display(v).to_uppercase()));
//!
//! let keys = props("Hello {{ name | upper }}");        // ["name"]
//! let text = render("Hello {{ name | upper }}", &values, &filters);
//! ```

mod filters;
mod template;

use indexmap::IndexMap;
use serde_json::Value;

pub use filters::{Filter, Filters};
pub use template::{display, Template};

/// Keys referenced by `template`, in first-occurrence order, without
/// duplicates.
pub fn props(template: &str) -> Vec<String> {
    Template::parse(template).keys().iter().map(str::to_owned).collect()
}

/// Compile and render `template` in one step.
pub fn render(template: &str, values: &IndexMap<String, Option<Value>>, filters: &Filters) -> String {
    Template::parse(template).render(values, filters)
}
