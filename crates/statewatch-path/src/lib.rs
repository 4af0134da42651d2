//! Dotted-path utilities.
//!
//! This crate implements the pure helpers behind statewatch's path-addressed
//! state access: parsing and formatting dot-joined path strings, resolving a
//! path against a nested [`serde_json::Value`], and writing a value at a path
//! while creating intermediate containers as needed.
//!
//! # Example
//!
//! ```
//! use statewatch_path::{parse_path, format_path, resolve, write_at_path};
//!
//! // Parse a dotted path string into segments
//! let path = parse_path("foo.value");
//! assert_eq!(path, vec!["foo".to_string(), "value".to_string()]);
//!
//! // Format segments back to a dotted string
//! assert_eq!(format_path(&path), "foo.value");
//!
//! // Resolve a path against a document
//! let mut doc = serde_json::json!({"foo": {"value": 42}});
//! assert_eq!(resolve(&doc, &path), Some(&serde_json::json!(42)));
//!
//! // Write through a path, creating intermediates
//! write_at_path(&mut doc, &parse_path("bar.0"), serde_json::json!(7)).unwrap();
//! assert_eq!(doc, serde_json::json!({"foo": {"value": 42}, "bar": [7]}));
//! ```

use serde_json::Value;
use thiserror::Error;

/// A parsed dotted path: one string per segment.
pub type Path = Vec<String>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path")]
    EmptyPath,
    #[error("empty path segment")]
    EmptySegment,
    #[error("segment {0:?} is not a valid array index")]
    InvalidIndex(String),
}

/// Parse a dotted path string into segments.
///
/// Splitting is purely syntactic and never fails; use [`validate_path`] to
/// reject empty segments.
///
/// # Example
///
/// ```
/// use statewatch_path::parse_path;
///
/// assert_eq!(parse_path("foo"), vec!["foo"]);
/// assert_eq!(parse_path("foo.bar.0"), vec!["foo", "bar", "0"]);
/// assert_eq!(parse_path(""), vec![""]);
/// ```
pub fn parse_path(path: &str) -> Path {
    path.split('.').map(str::to_owned).collect()
}

/// Format segments into a dotted path string.
///
/// # Example
///
/// ```
/// use statewatch_path::format_path;
///
/// assert_eq!(format_path(&["foo".to_string(), "value".to_string()]), "foo.value");
/// assert_eq!(format_path(&[]), "");
/// ```
pub fn format_path(path: &[String]) -> String {
    path.join(".")
}

/// Validate parsed segments: rejects an empty path and empty segments.
///
/// # Errors
///
/// - [`PathError::EmptyPath`] for a zero-segment path
/// - [`PathError::EmptySegment`] if any segment is the empty string
///
/// # Example
///
/// ```
/// use statewatch_path::{parse_path, validate_path};
///
/// validate_path(&parse_path("foo.bar")).unwrap();
/// validate_path(&parse_path("foo..bar")).unwrap_err();
/// validate_path(&parse_path("")).unwrap_err();
/// ```
pub fn validate_path(path: &[String]) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::EmptyPath);
    }
    for segment in path {
        if segment.is_empty() {
            return Err(PathError::EmptySegment);
        }
    }
    Ok(())
}

/// Check if `prefix` is an ancestor of `path` or equal to it.
///
/// # Example
///
/// ```
/// use statewatch_path::is_prefix;
///
/// let foo = vec!["foo".to_string()];
/// let foo_value = vec!["foo".to_string(), "value".to_string()];
/// assert!(is_prefix(&foo, &foo_value));
/// assert!(is_prefix(&foo, &foo));
/// assert!(!is_prefix(&foo_value, &foo));
/// ```
pub fn is_prefix(prefix: &[String], path: &[String]) -> bool {
    if prefix.len() > path.len() {
        return false;
    }
    prefix.iter().zip(path).all(|(a, b)| a == b)
}

/// Check if `prefix` is a strict ancestor of `path`.
pub fn is_strict_prefix(prefix: &[String], path: &[String]) -> bool {
    prefix.len() < path.len() && is_prefix(prefix, path)
}

/// Resolve a path against a value.
///
/// Objects are descended by key, arrays by numeric segment. Returns `None`
/// when any intermediate segment is missing or mismatched; resolution never
/// errors.
///
/// # Example
///
/// ```
/// use statewatch_path::{parse_path, resolve};
/// use serde_json::json;
///
/// let doc = json!({"a": {"b": [10, 20]}});
/// assert_eq!(resolve(&doc, &parse_path("a.b.1")), Some(&json!(20)));
/// assert_eq!(resolve(&doc, &parse_path("a.missing.x")), None);
/// ```
pub fn resolve<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(arr) => {
                let idx: usize = segment.parse().ok()?;
                arr.get(idx)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve a path against a value, mutably.
pub fn resolve_mut<'a>(value: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(arr) => {
                let idx: usize = segment.parse().ok()?;
                arr.get_mut(idx)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate containers as needed.
///
/// A numeric next segment creates an array (padded with `Null` up to the
/// index), any other segment creates an object. A primitive sitting where a
/// container is needed is replaced by a fresh container. An empty path
/// replaces the root value.
///
/// # Errors
///
/// [`PathError::InvalidIndex`] when a non-numeric segment is applied to an
/// existing array.
///
/// # Example
///
/// ```
/// use statewatch_path::{parse_path, write_at_path};
/// use serde_json::json;
///
/// let mut doc = json!({});
/// write_at_path(&mut doc, &parse_path("a.b"), json!(1)).unwrap();
/// write_at_path(&mut doc, &parse_path("list.2"), json!("x")).unwrap();
/// assert_eq!(doc, json!({"a": {"b": 1}, "list": [null, null, "x"]}));
/// ```
pub fn write_at_path(root: &mut Value, path: &[String], value: Value) -> Result<(), PathError> {
    let Some((segment, rest)) = path.split_first() else {
        *root = value;
        return Ok(());
    };
    match root {
        Value::Object(map) => {
            let slot = map
                .entry(segment.clone())
                .or_insert_with(|| empty_container(rest.first()));
            if !rest.is_empty() && !is_container(slot) {
                *slot = empty_container(rest.first());
            }
            write_at_path(slot, rest, value)
        }
        Value::Array(arr) => {
            let idx: usize = segment
                .parse()
                .map_err(|_| PathError::InvalidIndex(segment.clone()))?;
            if idx >= arr.len() {
                arr.resize(idx + 1, Value::Null);
            }
            let slot = &mut arr[idx];
            if !rest.is_empty() && !is_container(slot) {
                *slot = empty_container(rest.first());
            }
            write_at_path(slot, rest, value)
        }
        _ => {
            *root = empty_container(Some(segment));
            write_at_path(root, path, value)
        }
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Picks the container kind for a segment about to be created: arrays for
/// numeric segments, objects otherwise.
fn empty_container(next_segment: Option<&String>) -> Value {
    match next_segment {
        Some(segment) if segment.parse::<usize>().is_ok() => Value::Array(Vec::new()),
        _ => Value::Object(serde_json::Map::new()),
    }
}
