//! Interpolation templates.
//!
//! A template is literal text with `{{ key | filter | filter }}`
//! expressions. Keys may be dotted paths. An opening `{{` without a
//! matching `}}` is kept as literal text.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

use super::filters::Filters;
use crate::model::Keys;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Expr {
    key: String,
    filters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Expr(Expr),
}

/// A compiled interpolation template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
    keys: Keys,
}

impl Template {
    /// Compile `source`.
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut keys = Keys::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            let Some(close) = rest[open + 2..].find("}}") else {
                break;
            };
            let inner = &rest[open + 2..open + 2 + close];
            let mut parts = inner.split('|').map(str::trim);
            let key = parts.next().unwrap_or_default();

            if key.is_empty() {
                // `{{ }}` or `{{ | f }}` is not an expression.
                push_text(&mut segments, &rest[..open + 4 + close]);
            } else {
                push_text(&mut segments, &rest[..open]);
                keys.push(key);
                segments.push(Segment::Expr(Expr {
                    key: key.to_owned(),
                    filters: parts.filter(|f| !f.is_empty()).map(str::to_owned).collect(),
                }));
            }
            rest = &rest[open + 4 + close..];
        }
        push_text(&mut segments, rest);

        Self { segments, keys }
    }

    /// Keys referenced by the template, first occurrence first.
    pub fn keys(&self) -> &Keys {
        &self.keys
    }

    /// Whether the template contains no expressions.
    pub fn is_static(&self) -> bool {
        self.keys.is_empty()
    }

    /// Substitute `values` into the template.
    ///
    /// Missing keys evaluate to `null` before filters run, and `null`
    /// renders as nothing. Unknown filters leave the value unchanged.
    pub fn render(&self, values: &IndexMap<String, Option<Value>>, filters: &Filters) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Expr(expr) => {
                    let mut value = values.get(&expr.key).cloned().flatten().unwrap_or(Value::Null);
                    for name in &expr.filters {
                        match filters.get(name) {
                            Some(filter) => value = filter(&value),
                            None => warn!(filter = name.as_str(), "unknown interpolation filter"),
                        }
                    }
                    out.push_str(&display(&value));
                }
            }
        }
        out
    }
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Text(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Text(text.to_owned()));
    }
}

/// Text form of a value: strings raw, `null` empty, anything else as JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
