//! # Deep-Merge Reconciler
//!
//! Merges a default tree with an override tree into one snapshot. The touch
//! tree acts as an exemption mask: a marked node takes the override verbatim,
//! everything else is merged structurally.
//!
//! ## Rules (evaluated at every node, in order)
//!
//! 1. Exempted node, or no default here: the override, verbatim.
//! 2. No override here: the default, verbatim.
//! 3. Override is an object: recurse over the union of keys, default keys
//!    first, each with its own exemption child.
//! 4. Override is an array: recurse index by index over the longer of the
//!    two arrays. An override may grow an array; it never truncates one.
//! 5. Otherwise (scalar or `null` override): the override, verbatim.
//!
//! The order matters. An exemption beats a defined default, which beats the
//! type-directed merge.

use serde_json::{Map, Value};

use vrec_core::Segment;

use crate::touch::{TouchNode, TouchTree};

/// Reconcile one node. `None` means "undefined" on input and output.
pub fn reconcile(
    default: Option<&Value>,
    overrides: Option<&Value>,
    exemptions: Option<&TouchNode>,
) -> Option<Value> {
    let exempt = exemptions.is_some_and(TouchNode::is_marked);
    let Some(default) = default.filter(|_| !exempt) else {
        return overrides.cloned();
    };
    let Some(overrides) = overrides else {
        return Some(default.clone());
    };

    match overrides {
        Value::Object(map) => {
            let mut merged = Map::new();
            let default_keys: Vec<&String> = match default {
                Value::Object(default_map) => default_map.keys().collect(),
                _ => Vec::new(),
            };
            let extra_keys = map.keys().filter(|k| !default_keys.contains(k));
            let keys: Vec<&String> = default_keys.iter().copied().chain(extra_keys).collect();

            for key in keys {
                let segment = Segment::key(key.as_str());
                let value = reconcile(
                    child(default, &segment),
                    map.get(key),
                    exemptions.and_then(|node| node.child(&segment)),
                );
                if let Some(value) = value {
                    merged.insert(key.clone(), value);
                }
            }
            Some(Value::Object(merged))
        }
        Value::Array(items) => {
            let default_len = match default {
                Value::Array(default_items) => default_items.len(),
                _ => 0,
            };
            let merged = (0..items.len().max(default_len))
                .map(|i| {
                    let segment = Segment::Index(i);
                    reconcile(
                        child(default, &segment),
                        items.get(i),
                        exemptions.and_then(|node| node.child(&segment)),
                    )
                    .unwrap_or(Value::Null)
                })
                .collect();
            Some(Value::Array(merged))
        }
        scalar => Some(scalar.clone()),
    }
}

/// Reconcile whole records. An undefined result becomes `null`.
pub fn reconcile_record(default: &Value, overrides: &Value, exemptions: &TouchTree) -> Value {
    reconcile(Some(default), Some(overrides), exemptions.root()).unwrap_or(Value::Null)
}

fn child<'a>(node: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(&segment.object_key()),
        Value::Array(items) => segment.array_index().and_then(|i| items.get(i)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vrec_core::Path;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn touched(paths: &[&str]) -> TouchTree {
        let paths: Vec<Path> = paths.iter().map(|s| p(s)).collect();
        TouchTree::new().merge(&paths)
    }

    #[test]
    fn test_no_overrides_returns_defaults() {
        let default = json!({"user": {"name": "ann"}, "tags": ["a"]});
        assert_eq!(reconcile_record(&default, &json!({}), &TouchTree::new()), default);
    }

    #[test]
    fn test_overrides_win_at_leaves() {
        let default = json!({"user": {"name": "ann", "email": "a@x"}});
        let overrides = json!({"user": {"name": "bob"}});
        assert_eq!(
            reconcile_record(&default, &overrides, &TouchTree::new()),
            json!({"user": {"name": "bob", "email": "a@x"}})
        );
    }

    #[test]
    fn test_default_keys_come_first() {
        let default = json!({"b": 1, "c": 2});
        let overrides = json!({"a": 0, "c": 3});
        let merged = reconcile_record(&default, &overrides, &TouchTree::new());
        let keys: Vec<&String> = merged.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "c", "a"]);
    }

    #[test]
    fn test_exemption_takes_override_verbatim() {
        let default = json!({"address": {"city": "Paris", "zip": "75001"}});
        let overrides = json!({"address": {"city": "Lyon"}});
        assert_eq!(
            reconcile_record(&default, &overrides, &touched(&["address"])),
            json!({"address": {"city": "Lyon"}})
        );
    }

    #[test]
    fn test_exempted_but_unset_override_drops_key() {
        let default = json!({"a": 1, "b": 2});
        assert_eq!(
            reconcile_record(&default, &json!({}), &touched(&["a"])),
            json!({"b": 2})
        );
    }

    #[test]
    fn test_null_override_is_kept() {
        let default = json!({"username": "ann"});
        let overrides = json!({"username": null});
        assert_eq!(
            reconcile_record(&default, &overrides, &TouchTree::new()),
            json!({"username": null})
        );
    }

    #[test]
    fn test_override_grows_array() {
        let default = json!({"a": [1]});
        let overrides = json!({"a": [null, 2, 3]});
        assert_eq!(
            reconcile_record(&default, &overrides, &TouchTree::new()),
            json!({"a": [null, 2, 3]})
        );
    }

    #[test]
    fn test_short_override_never_truncates_array() {
        let default = json!({"a": [1, 2, 3]});
        let overrides = json!({"a": [9]});
        assert_eq!(
            reconcile_record(&default, &overrides, &TouchTree::new()),
            json!({"a": [9, 2, 3]})
        );
    }

    #[test]
    fn test_exempted_array_is_replaced() {
        let default = json!({"a": [1, 2, 3]});
        let overrides = json!({"a": [9]});
        assert_eq!(
            reconcile_record(&default, &overrides, &touched(&["a"])),
            json!({"a": [9]})
        );
    }

    #[test]
    fn test_array_element_exemption() {
        let default = json!({"friends": [{"name": "a", "age": 1}, {"name": "b", "age": 2}]});
        let overrides = json!({"friends": [{"name": "z"}]});
        assert_eq!(
            reconcile_record(&default, &overrides, &touched(&["friends[0]"])),
            json!({"friends": [{"name": "z"}, {"name": "b", "age": 2}]})
        );
    }

    #[test]
    fn test_undefined_default_takes_override() {
        let overrides = json!({"new": {"deep": true}});
        assert_eq!(
            reconcile_record(&json!({}), &overrides, &TouchTree::new()),
            overrides
        );
    }

    #[test]
    fn test_whole_record_exemption() {
        let default = json!({"a": 1});
        let overrides = json!({"b": 2});
        assert_eq!(
            reconcile_record(&default, &overrides, &touched(&["*"])),
            overrides
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use vrec_core::{tree, Path};

    /// Objects keyed by a small alphabet and short arrays, with scalar leaves.
    fn record() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,4}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 3, |inner| {
            prop_oneof![
                prop::collection::btree_map("[a-c]", inner.clone(), 0..3)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
                prop::collection::vec(inner, 0..3).prop_map(Value::Array),
            ]
        })
    }

    fn container() -> impl Strategy<Value = Value> {
        prop_oneof![
            prop::collection::btree_map("[a-c]", record(), 0..3)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
            prop::collection::vec(record(), 0..3).prop_map(Value::Array),
        ]
    }

    fn path() -> impl Strategy<Value = Path> {
        let segment = prop_oneof![
            "[a-c]".prop_map(Segment::Key),
            (0usize..3).prop_map(Segment::Index),
        ];
        prop::collection::vec(segment, 1..4).prop_map(Path::from_segments)
    }

    /// Every strict prefix of `path`, the root included.
    fn prefixes(path: &Path) -> Vec<Path> {
        (0..path.len())
            .map(|n| Path::from_segments(path.segments()[..n].to_vec()))
            .collect()
    }

    /// Whether the merge at `at` descends into the default the same way a
    /// plain lookup does: no override there, or an override container whose
    /// kind does not discard the default's children.
    fn descends_alike(default: &Value, overrides: &Value, at: &Path) -> bool {
        match (tree::get(overrides, at), tree::get(default, at)) {
            (None, _) => true,
            (Some(Value::Object(_)), found) => !matches!(found, Some(Value::Array(_))),
            (Some(Value::Array(_)), found) => !matches!(found, Some(Value::Object(_))),
            _ => false,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            max_global_rejects: 65536,
            ..ProptestConfig::default()
        })]

        /// A marked path reads back exactly as the override holds it.
        #[test]
        fn exemption_precedence(
            default in record(),
            mut overrides in record(),
            others in prop::collection::vec(path(), 0..4),
            p in path(),
            value in record(),
        ) {
            tree::set(&mut overrides, &p, value).unwrap();
            let exemptions = TouchTree::new().merge(&others).merge([&p]);
            let merged = reconcile_record(&default, &overrides, &exemptions);
            prop_assert_eq!(tree::get(&merged, &p), tree::get(&overrides, &p));
        }

        /// An unmarked path with no override reads back as the default.
        #[test]
        fn default_fallback(
            default in record(),
            overrides in container(),
            others in prop::collection::vec(path(), 0..4),
            p in path(),
        ) {
            prop_assume!(tree::get(&overrides, &p).is_none());
            prop_assume!(prefixes(&p)
                .iter()
                .all(|q| descends_alike(&default, &overrides, q)));
            let exemptions = TouchTree::new().merge(&others);
            prop_assume!(!exemptions.is_touched(&p));

            let merged = reconcile_record(&default, &overrides, &exemptions);
            prop_assert_eq!(tree::get(&merged, &p), tree::get(&default, &p));
        }

        /// Merging two arrays keeps the longer length.
        #[test]
        fn array_never_truncates(
            default in prop::collection::vec(record(), 0..4),
            overrides in prop::collection::vec(record(), 0..4),
        ) {
            let longest = default.len().max(overrides.len());
            let merged = reconcile_record(
                &Value::Array(default),
                &Value::Array(overrides),
                &TouchTree::new(),
            );
            prop_assert_eq!(merged.as_array().map(Vec::len), Some(longest));
        }
    }
}
