//! Filter-path discovery for the renege command.
//!
//! The path compared against queued messages is not configured. It is found
//! by a depth-first walk of the command's filter value that stops at the
//! first leaf; the keys and indices leading to that leaf form the path. Only
//! the first leaf counts, so a filter with several leaves filters on one of
//! them only.

use std::fmt;

use qgate_types::Message;
use serde_json::Value;

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, ".{}", key),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// A located filter: the path to the first leaf and the leaf's value.
#[derive(Debug, Clone, PartialEq)]
pub struct RenegeFilter {
    pub path: Vec<PathSegment>,
    pub value: Value,
}

impl RenegeFilter {
    /// Locate the filter in `filter`. Returns `None` when the value holds no
    /// leaf below its root (a bare leaf, an empty object or array).
    pub fn locate(filter: &Value) -> Option<Self> {
        let mut path = Vec::new();
        let leaf = first_leaf(filter, &mut path)?;
        if path.is_empty() {
            return None;
        }
        Some(Self {
            path,
            value: leaf.clone(),
        })
    }

    /// Whether `message` carries the filter value at the filter path.
    pub fn matches(&self, message: &Message) -> bool {
        let Some((PathSegment::Key(first), rest)) = self.path.split_first() else {
            return false;
        };
        message
            .get(first)
            .and_then(|root| value_at(root, rest))
            .is_some_and(|found| *found == self.value)
    }

    pub fn describe_path(&self) -> String {
        self.path.iter().map(ToString::to_string).collect()
    }
}

fn first_leaf<'a>(value: &'a Value, path: &mut Vec<PathSegment>) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(PathSegment::Key(key.clone()));
                if let Some(leaf) = first_leaf(child, path) {
                    return Some(leaf);
                }
                path.pop();
            }
            None
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                if let Some(leaf) = first_leaf(child, path) {
                    return Some(leaf);
                }
                path.pop();
            }
            None
        }
        leaf => Some(leaf),
    }
}

fn value_at<'a>(mut value: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    for segment in path {
        value = match (segment, value) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(value)
}
