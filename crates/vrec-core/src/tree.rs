//! # Value Tree Operations
//!
//! Read, write and remove values at a [`Path`] inside a `serde_json::Value`.
//!
//! `set` builds missing intermediate containers on the way down: an array
//! when the next segment is an index, an object otherwise. A scalar sitting
//! where a container is needed is replaced. Arrays grow with `null` padding
//! up to the written index, which is capped at [`MAX_ARRAY_INDEX`]; a write
//! beyond it fails before anything is modified.
//!
//! `unset` removes only the leaf. Emptied ancestors are left in place, and an
//! array element is replaced by `null` so later indices never shift.
//!
//! The wildcard path has no segments and therefore addresses the root here,
//! exactly like the root path.

use serde_json::{Map, Value};

use crate::error::MalformedPathError;
use crate::path::{Path, Segment, MAX_ARRAY_INDEX};

fn child<'a>(node: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(&segment.object_key()),
        Value::Array(items) => segment.array_index().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(&segment.object_key()),
        Value::Array(items) => segment.array_index().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// The value at `path`, or `None` when any step is missing.
pub fn get<'a>(tree: &'a Value, path: &Path) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(tree, |node, segment| child(node, segment))
}

/// Mutable access to the value at `path`, or `None` when any step is missing.
pub fn get_mut<'a>(tree: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    path.segments()
        .iter()
        .try_fold(tree, |node, segment| child_mut(node, segment))
}

/// Write `value` at `path`, creating intermediate containers as needed.
///
/// # Errors
///
/// Returns `MalformedPathError` if `path` addresses an array index above
/// [`MAX_ARRAY_INDEX`]. `tree` is left untouched.
pub fn set(tree: &mut Value, path: &Path, value: Value) -> Result<(), MalformedPathError> {
    path.check_index_range()?;
    let mut node = tree;
    for segment in path.segments() {
        node = slot(node, segment);
    }
    *node = value;
    Ok(())
}

/// The child slot for `segment`, converting `node` into a suitable
/// container first if it cannot hold that segment.
fn slot<'a>(node: &'a mut Value, segment: &Segment) -> &'a mut Value {
    let fits = match &*node {
        Value::Object(_) => true,
        Value::Array(_) => segment.array_index().is_some(),
        _ => false,
    };
    if !fits {
        *node = if segment.is_index() {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        };
    }

    match node {
        Value::Array(items) => {
            let index = segment.array_index().unwrap_or(items.len());
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        Value::Object(map) => map.entry(segment.object_key()).or_insert(Value::Null),
        other => other,
    }
}

/// Remove the value at `path`, returning it.
///
/// Removing the root path replaces the whole tree with `null`.
pub fn unset(tree: &mut Value, path: &Path) -> Option<Value> {
    let Some(parent_path) = path.parent() else {
        return Some(std::mem::replace(tree, Value::Null));
    };
    let leaf = path.last()?;
    match get_mut(tree, &parent_path)? {
        Value::Object(map) => map.shift_remove(&leaf.object_key()),
        Value::Array(items) => {
            let index = leaf.array_index()?;
            items
                .get_mut(index)
                .map(|slot| std::mem::replace(slot, Value::Null))
        }
        _ => None,
    }
}

/// A fresh tree holding `value` at `path` and nothing else. The root path
/// returns `value` unchanged.
///
/// # Errors
///
/// Same as [`set`].
pub fn wrap(path: &Path, value: Value) -> Result<Value, MalformedPathError> {
    if path.is_empty() {
        return Ok(value);
    }
    let mut out = Value::Object(Map::new());
    set(&mut out, path, value)?;
    Ok(out)
}

/// Fill every position that is missing in `target` from `source`,
/// recursively.
///
/// Existing values in `target` always win, including `null`. Objects merge
/// key by key and arrays merge index by index; a container in `source` is
/// only copied wholesale when `target` has nothing at that position.
pub fn defaults_deep(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(key) {
                    Some(existing) => defaults_deep(existing, source_value),
                    None => {
                        target_map.insert(key.clone(), source_value.clone());
                    }
                }
            }
        }
        (Value::Array(target_items), Value::Array(source_items)) => {
            for (i, source_value) in source_items.iter().enumerate() {
                match target_items.get_mut(i) {
                    Some(existing) => defaults_deep(existing, source_value),
                    None => target_items.push(source_value.clone()),
                }
            }
        }
        _ => {}
    }
}

/// A new object containing only the values of `source` found at `paths`,
/// each at its original location. Paths beyond [`MAX_ARRAY_INDEX`] cannot
/// be written and are skipped.
pub fn pick_deep<'p>(source: &Value, paths: impl IntoIterator<Item = &'p Path>) -> Value {
    let mut out = Value::Object(Map::new());
    for path in paths {
        if let Some(value) = get(source, path) {
            let _ = set(&mut out, path, value.clone());
        }
    }
    out
}
