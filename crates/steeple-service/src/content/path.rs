//! Locator paths such as `services[0].times[1]` and their replay into JSON.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::error::{ContentError, ContentResult};

static PATH_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^.\[\]]+)|\[(\d+)\]").expect("valid path token regex"));

/// Largest array index a sheet row may address.
const MAX_INDEX: usize = 10_000;

/// One step of a locator path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
    Key(String),
    Index(usize),
}

impl PathToken {
    fn container(&self) -> Value {
        match self {
            Self::Key(_) => Value::Object(Map::new()),
            Self::Index(_) => Value::Array(Vec::new()),
        }
    }
}

impl std::fmt::Display for PathToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// ## Summary
/// Splits a locator path into keys and array indices.
///
/// Characters that fit neither form (stray dots, empty brackets) are skipped.
///
/// ## Errors
/// Returns `ContentError::InvalidPath` if no token is found or an index is
/// larger than the supported maximum.
pub fn tokenize_path(path: &str) -> ContentResult<Vec<PathToken>> {
    let mut tokens = Vec::new();

    for caps in PATH_TOKEN.captures_iter(path) {
        if let Some(key) = caps.get(1) {
            tokens.push(PathToken::Key(key.as_str().to_string()));
        } else if let Some(index) = caps.get(2) {
            let index = index
                .as_str()
                .parse::<usize>()
                .ok()
                .filter(|index| *index <= MAX_INDEX)
                .ok_or_else(|| ContentError::InvalidPath(path.to_string()))?;
            tokens.push(PathToken::Index(index));
        }
    }

    if tokens.is_empty() {
        return Err(ContentError::InvalidPath(path.to_string()));
    }

    Ok(tokens)
}

/// ## Summary
/// Writes `value` at `path` inside `root`, creating intermediate containers.
///
/// A missing or null slot becomes an array when the next token is an index
/// and an object otherwise. Existing non-null containers are reused, never
/// replaced. Writing past the end of an array pads it with nulls. The final
/// write overwrites whatever was there.
///
/// ## Errors
/// Returns `ContentError::InvalidPath` for a path without tokens and
/// `ContentError::PathConflict` when a key meets a non-object or an index
/// meets a non-array.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> ContentResult<()> {
    let tokens = tokenize_path(path)?;
    let conflict = |expected, token: &PathToken| ContentError::PathConflict {
        path: path.to_string(),
        expected,
        segment: token.to_string(),
    };

    let mut current = root;
    for (position, token) in tokens.iter().enumerate() {
        let next = tokens.get(position + 1);

        let slot = match token {
            PathToken::Key(key) => {
                let Value::Object(map) = current else {
                    return Err(conflict("object", token));
                };
                if next.is_none() {
                    map.insert(key.clone(), value);
                    return Ok(());
                }
                map.entry(key.clone()).or_insert(Value::Null)
            }
            PathToken::Index(index) => {
                let Value::Array(items) = current else {
                    return Err(conflict("array", token));
                };
                if items.len() <= *index {
                    items.resize(index + 1, Value::Null);
                }
                if next.is_none() {
                    items[*index] = value;
                    return Ok(());
                }
                &mut items[*index]
            }
        };

        if slot.is_null()
            && let Some(next) = next
        {
            *slot = next.container();
        }
        current = slot;
    }

    Ok(())
}

/// Reads the value at `path`, if every step exists.
#[must_use]
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let tokens = tokenize_path(path).ok()?;
    tokens.iter().try_fold(root, |current, token| match token {
        PathToken::Key(key) => current.get(key.as_str()),
        PathToken::Index(index) => current.get(*index),
    })
}
