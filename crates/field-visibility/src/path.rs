use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Separator between the keys of a nested field path.
pub const SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("field path is empty")]
    Empty,
    #[error("field path '{path}' contains an empty segment")]
    EmptySegment { path: String },
}

/// A validated field path: a bare key (`firstName`) or a dot-delimited walk
/// through nested values (`author.firstName`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath(String);

impl FieldPath {
    pub fn parse(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if path.split(SEPARATOR).any(str::is_empty) {
            return Err(PathError::EmptySegment { path });
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_nested(&self) -> bool {
        self.0.contains(SEPARATOR)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.0
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl JsonSchema for FieldPath {
    fn schema_name() -> Cow<'static, str> {
        "FieldPath".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "string",
            "description": "Field key or dot-delimited path into nested values.",
            "pattern": r"^[^.]+(\.[^.]+)*$"
        })
    }
}

/// Reads the value addressed by `path` out of `tree`.
///
/// Returns `None` when any step of the walk is missing or lands on a value that
/// cannot be descended into; that is the "absent" outcome, distinct from a
/// present `null`. A bare key applied to a non-container is treated as already
/// resolved and returns the value itself.
pub fn resolve<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    if !path.contains(SEPARATOR) {
        return match tree {
            Value::Object(_) | Value::Array(_) => child(tree, path),
            Value::Null => None,
            scalar => Some(scalar),
        };
    }

    // A literal key containing the separator shadows the nested walk.
    if let Value::Object(map) = tree
        && let Some(value) = map.get(path)
    {
        return Some(value);
    }

    path.split(SEPARATOR)
        .try_fold(tree, |node, segment| child(node, segment))
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    if segment.is_empty() {
        return None;
    }
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => array_index(segment).and_then(|index| items.get(index)),
        _ => None,
    }
}

/// Canonical decimal index: ASCII digits only, no sign, no leading zero.
fn array_index(segment: &str) -> Option<usize> {
    let canonical = !segment.is_empty()
        && segment.bytes().all(|byte| byte.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));
    if canonical { segment.parse().ok() } else { None }
}

/// Writes `value` at `path`, creating intermediate objects as needed.
///
/// Intermediate scalars are replaced by objects. Array nodes accept in-range
/// numeric segments, or the index one past the end to append.
pub fn assign(tree: &mut Value, path: &FieldPath, value: Value) {
    let mut node = tree;
    for segment in path.segments() {
        node = child_mut(node, segment);
    }
    *node = value;
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = match &*node {
        Value::Array(items) => array_index(segment).filter(|index| *index <= items.len()),
        _ => None,
    };

    match (node, index) {
        (Value::Array(items), Some(index)) => {
            if index == items.len() {
                items.push(Value::Null);
            }
            &mut items[index]
        }
        (Value::Object(map), _) => map.entry(segment.to_string()).or_insert(Value::Null),
        (other, _) => {
            *other = Value::Object(Map::new());
            child_mut(other, segment)
        }
    }
}
