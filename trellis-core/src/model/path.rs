//! Dotted key paths.
//!
//! Keys such as `names.first` address values nested inside objects stored
//! in a model. Numeric segments index into arrays when reading.

use serde_json::{Map, Value};

use super::change::Change;

/// Top-level segment of a path.
pub fn head(path: &str) -> &str {
    path.split_once('.').map_or(path, |(head, _)| head)
}

/// Read the value at `path`.
pub fn resolve<'a>(data: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// A non-object value sitting where an intermediate object is required is
/// replaced by an empty object.
pub fn assign(data: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            data.insert(path.to_owned(), value);
        }
        Some((head, rest)) => {
            let slot = data
                .entry(head)
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                assign(inner, rest, value);
            }
        }
    }
}

/// Remove the value at `path`, returning it.
pub fn remove(data: &mut Map<String, Value>, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => data.remove(path),
        Some((head, rest)) => match data.get_mut(head)? {
            Value::Object(inner) => remove(inner, rest),
            _ => None,
        },
    }
}

/// Record every path under `path` whose value differs between `previous`
/// and `current`, starting with `path` itself. Objects are walked by key and
/// arrays by index, matching what [`resolve`] can address.
pub fn diff(path: &str, previous: Option<&Value>, current: Option<&Value>, out: &mut Vec<Change>) {
    if previous == current {
        return;
    }

    out.push(Change {
        key: path.to_owned(),
        previous: previous.cloned(),
        current: current.cloned(),
    });

    let mut segments: Vec<String> = Vec::new();
    for value in [previous, current].into_iter().flatten() {
        match value {
            Value::Object(map) => {
                for key in map.keys() {
                    if !segments.contains(key) {
                        segments.push(key.clone());
                    }
                }
            }
            Value::Array(items) => {
                for index in 0..items.len() {
                    let segment = index.to_string();
                    if !segments.contains(&segment) {
                        segments.push(segment);
                    }
                }
            }
            _ => {}
        }
    }

    for segment in segments {
        diff(
            &format!("{path}.{segment}"),
            previous.and_then(|value| child(value, &segment)),
            current.and_then(|value| child(value, &segment)),
            out,
        );
    }
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}
