//! # Error Visibility
//!
//! Helpers that decide which parts of an error tree a caller may see.
//!
//! - [`pick_errors`] copies the errors found at a list of paths (normally the
//!   outermost validated paths plus any pseudo paths) into a fresh tree.
//! - [`omit_touched`] drops every subtree of an externally supplied error
//!   tree that the user has since touched locally. A touched array element
//!   becomes `null` so the errors of later elements keep their indices.
//! - [`underlay_errors`] fills the gaps of one error tree from another.

use serde_json::{Map, Value};

use vrec_core::{tree, Path};

use crate::touch::{TouchNode, TouchTree};

/// A fresh error tree holding only the errors of `errors` located at
/// `paths`. Missing and `null` entries are skipped, as are the wildcard path
/// and paths whose array index is out of range.
pub fn pick_errors<'p>(errors: &Value, paths: impl IntoIterator<Item = &'p Path>) -> Value {
    let mut active = Value::Object(Map::new());
    for path in paths {
        if path.is_wildcard() {
            continue;
        }
        match tree::get(errors, path) {
            None | Some(Value::Null) => {}
            Some(error) => {
                let _ = tree::set(&mut active, path, error.clone());
            }
        }
    }
    active
}

/// A copy of `target` without the subtrees that `touched` marks.
pub fn omit_touched(target: &Value, touched: &TouchTree) -> Value {
    match touched.root() {
        None => target.clone(),
        Some(TouchNode::Marked(_)) => Value::Object(Map::new()),
        Some(node) => omit(target, node),
    }
}

fn omit(target: &Value, node: &TouchNode) -> Value {
    match target {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter_map(|(key, value)| {
                    let child = node.child(&key.as_str().into());
                    match child {
                        Some(TouchNode::Marked(_)) => None,
                        Some(child) => Some((key.clone(), omit(value, child))),
                        None => Some((key.clone(), value.clone())),
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, value)| match node.child(&i.into()) {
                    Some(TouchNode::Marked(_)) => Value::Null,
                    Some(child) => omit(value, child),
                    None => value.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Fill every gap in `active` from `base`, recursively. Missing entries and
/// `null` entries are gaps; `null` in an error tree only ever pads an array.
pub fn underlay_errors(active: &mut Value, base: &Value) {
    if active.is_null() {
        *active = base.clone();
        return;
    }
    match (active, base) {
        (Value::Object(active_map), Value::Object(base_map)) => {
            for (key, base_value) in base_map {
                match active_map.get_mut(key) {
                    Some(existing) => underlay_errors(existing, base_value),
                    None => {
                        active_map.insert(key.clone(), base_value.clone());
                    }
                }
            }
        }
        (Value::Array(active_items), Value::Array(base_items)) => {
            for (i, base_value) in base_items.iter().enumerate() {
                match active_items.get_mut(i) {
                    Some(existing) => underlay_errors(existing, base_value),
                    None => active_items.push(base_value.clone()),
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn test_pick_errors_at_paths() {
        let errors = json!({
            "username": "must be a string",
            "password": "is required",
            "address": {"city": "is required", "zip": "is required"}
        });
        let picked = pick_errors(&errors, &[p("username"), p("address.city"), p("nope")]);
        assert_eq!(
            picked,
            json!({"username": "must be a string", "address": {"city": "is required"}})
        );
    }

    #[test]
    fn test_pick_errors_takes_whole_subtree() {
        let errors = json!({"address": {"city": "bad", "zip": "bad"}});
        assert_eq!(pick_errors(&errors, &[p("address")]), errors);
    }

    #[test]
    fn test_pick_errors_skips_wildcard_and_null() {
        let errors = json!({"a": null, "b": "x"});
        let picked = pick_errors(&errors, &[Path::wildcard(), p("a")]);
        assert_eq!(picked, json!({}));
    }

    #[test]
    fn test_omit_touched_drops_marked_subtrees() {
        let external = json!({
            "username": "already taken",
            "address": {"city": "unknown", "zip": "invalid"}
        });
        let touched = TouchTree::new().merge(&[p("username"), p("address.zip")]);
        assert_eq!(
            omit_touched(&external, &touched),
            json!({"address": {"city": "unknown"}})
        );
    }

    #[test]
    fn test_omit_touched_array_element_keeps_indices() {
        let external = json!({"tags": ["bad", "worse", "worst"]});
        let touched = TouchTree::new().merge(&[p("tags[1]")]);
        assert_eq!(
            omit_touched(&external, &touched),
            json!({"tags": ["bad", null, "worst"]})
        );

        let touched = TouchTree::new().merge(&[p("tags.0")]);
        assert_eq!(
            omit_touched(&external, &touched),
            json!({"tags": [null, "worse", "worst"]})
        );
    }

    #[test]
    fn test_underlay_fills_missing_and_null_entries() {
        let mut active = json!({"tags": [null, "local"], "name": "required"});
        let base = json!({"tags": ["bad0", "bad1", "bad2"], "name": "taken", "email": "bad"});
        underlay_errors(&mut active, &base);
        assert_eq!(
            active,
            json!({
                "tags": ["bad0", "local", "bad2"],
                "name": "required",
                "email": "bad"
            })
        );
    }

    #[test]
    fn test_underlay_keeps_local_subtrees() {
        let mut active = json!({"address": {"city": "is required"}});
        underlay_errors(&mut active, &json!({"address": "unknown"}));
        assert_eq!(active, json!({"address": {"city": "is required"}}));
    }

    #[test]
    fn test_omit_touched_whole_record() {
        let touched = TouchTree::new().merge(&[Path::wildcard()]);
        assert_eq!(omit_touched(&json!({"a": "x"}), &touched), json!({}));
        assert_eq!(omit_touched(&json!({"a": "x"}), &TouchTree::new()), json!({"a": "x"}));
    }
}
