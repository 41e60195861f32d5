//! # Touch Tree
//!
//! A touch tree mirrors the part of a record that has been explicitly
//! changed (or, for the validated-paths tree, explicitly validated). It is a
//! trie over path segments whose leaves are markers.
//!
//! ## Invariants
//!
//! - A `Marked` node stands for its entire subtree. Nothing is ever stored
//!   beneath it, so marking below an already-marked ancestor is a no-op.
//! - Marking a node that currently has marked descendants replaces them with
//!   a single wildcard marker for that node (ancestor absorption). The
//!   narrower markers are gone; lookups beneath the node all report touched.
//! - `Branch` nodes are never empty after a removal: `unset` prunes the
//!   branches it empties.
//!
//! ```text
//! mark(a.b)   =>  a: { b: Marked(Path a.b) }
//! mark(a)     =>  a: Marked(Wildcard a)        (a.b absorbed)
//! mark(a.c)   =>  unchanged                    (a already covers a.c)
//! ```

use indexmap::IndexMap;
use serde_json::{Map, Value};

use vrec_core::{Path, Segment, WILDCARD};

/// What a marked node records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// The exact path that was touched.
    Path(Path),
    /// The node was touched as a whole after some of its descendants had
    /// been touched individually, or the whole record was touched.
    Wildcard(Path),
}

impl Marker {
    /// The path of the marked node.
    pub fn path(&self) -> &Path {
        match self {
            Marker::Path(p) | Marker::Wildcard(p) => p,
        }
    }

    /// Whether this marker absorbed finer-grained markers.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Marker::Wildcard(_))
    }
}

/// A node of a touch tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TouchNode {
    /// This node and everything below it counts as touched.
    Marked(Marker),
    /// Some descendants are touched; the node itself is not.
    Branch(IndexMap<Segment, TouchNode>),
}

impl TouchNode {
    /// Whether this node is a marker leaf (the whole subtree is touched).
    pub fn is_marked(&self) -> bool {
        matches!(self, TouchNode::Marked(_))
    }

    /// The child for `segment`. Index and numeric-key spellings of the same
    /// step find the same child. A marked node has no children.
    pub fn child(&self, segment: &Segment) -> Option<&TouchNode> {
        match self {
            TouchNode::Marked(_) => None,
            TouchNode::Branch(children) => existing_key(children, segment)
                .and_then(|key| children.get(&key)),
        }
    }

    /// Children in structural order: array indices ascending first, then
    /// field names in insertion order. A numeric key counts as an index.
    pub fn children(&self) -> Vec<(&Segment, &TouchNode)> {
        let TouchNode::Branch(children) = self else {
            return Vec::new();
        };
        let mut ordered: Vec<(&Segment, &TouchNode)> = children.iter().collect();
        ordered.sort_by_key(|(segment, _)| match segment.array_index() {
            Some(i) => (0, i),
            None => (1, 0),
        });
        ordered
    }

    fn to_value(&self) -> Value {
        match self {
            TouchNode::Marked(Marker::Path(p)) => Value::String(p.to_string()),
            TouchNode::Marked(Marker::Wildcard(_)) => Value::String(WILDCARD.to_string()),
            TouchNode::Branch(_) => Value::Object(
                self.children()
                    .into_iter()
                    .map(|(segment, node)| (segment.object_key(), node.to_value()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

/// The key under which `segment` is already stored, if any.
fn existing_key(children: &IndexMap<Segment, TouchNode>, segment: &Segment) -> Option<Segment> {
    if children.contains_key(segment) {
        return Some(segment.clone());
    }
    segment
        .alternate()
        .filter(|alt| children.contains_key(alt))
}

/// A fresh chain of branches down to a marker for `path`.
fn fresh(rest: &[Segment], marker: Marker) -> TouchNode {
    match rest.split_first() {
        None => TouchNode::Marked(marker),
        Some((head, tail)) => {
            let mut children = IndexMap::new();
            children.insert(head.clone(), fresh(tail, marker));
            TouchNode::Branch(children)
        }
    }
}

fn mark_node(node: &mut TouchNode, rest: &[Segment], path: &Path) -> bool {
    if node.is_marked() {
        return false;
    }
    let Some((head, tail)) = rest.split_first() else {
        *node = TouchNode::Marked(Marker::Wildcard(path.clone()));
        return true;
    };
    let TouchNode::Branch(children) = node else {
        return false;
    };
    match existing_key(children, head) {
        Some(key) => match children.get_mut(&key) {
            Some(child) => mark_node(child, tail, path),
            None => false,
        },
        None => {
            children.insert(head.clone(), fresh(tail, Marker::Path(path.clone())));
            true
        }
    }
}

fn unset_in(children: &mut IndexMap<Segment, TouchNode>, rest: &[Segment]) -> bool {
    let Some((head, tail)) = rest.split_first() else {
        return false;
    };
    let Some(key) = existing_key(children, head) else {
        return false;
    };
    if tail.is_empty() {
        return children.shift_remove(&key).is_some();
    }
    let removed = match children.get_mut(&key) {
        Some(TouchNode::Branch(grandchildren)) => unset_in(grandchildren, tail),
        _ => false,
    };
    if removed {
        if let Some(TouchNode::Branch(grandchildren)) = children.get(&key) {
            if grandchildren.is_empty() {
                children.shift_remove(&key);
            }
        }
    }
    removed
}

/// A set of touched paths with ancestor absorption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchTree {
    root: Option<TouchNode>,
}

impl TouchTree {
    /// An empty tree: nothing touched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing is touched.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The root node, if anything is touched.
    pub fn root(&self) -> Option<&TouchNode> {
        self.root.as_ref()
    }

    /// Record `path` as touched. Returns whether the tree changed.
    ///
    /// Marking beneath an already-marked ancestor, or re-marking a marked
    /// path, changes nothing. Marking a node with marked descendants absorbs
    /// them. The wildcard path marks the whole record.
    pub fn mark(&mut self, path: &Path) -> bool {
        let (segments, target) = if path.is_wildcard() {
            (&[][..], Path::root())
        } else {
            (path.segments(), path.clone())
        };
        if let Some(root) = self.root.as_mut() {
            return mark_node(root, segments, &target);
        }
        let marker = if path.is_wildcard() {
            Marker::Wildcard(target)
        } else {
            Marker::Path(target)
        };
        self.root = Some(fresh(segments, marker));
        true
    }

    /// A copy of this tree with every path in `paths` marked. Idempotent:
    /// merging paths that are already covered yields an equal tree.
    pub fn merge<'p>(&self, paths: impl IntoIterator<Item = &'p Path>) -> TouchTree {
        let mut out = self.clone();
        for path in paths {
            out.mark(path);
        }
        out
    }

    /// True if `path` or any strict ancestor of `path` is marked.
    pub fn is_touched(&self, path: &Path) -> bool {
        let Some(mut node) = self.root.as_ref() else {
            return false;
        };
        for segment in path.segments() {
            match node {
                TouchNode::Marked(_) => return true,
                TouchNode::Branch(_) => match node.child(segment) {
                    Some(child) => node = child,
                    None => return false,
                },
            }
        }
        node.is_marked()
    }

    /// True if anything at or beneath `path` is touched, or `path` lies
    /// under a marked ancestor.
    pub fn touches_within(&self, path: &Path) -> bool {
        self.node_at(path).is_some() || self.is_touched(path)
    }

    /// The node stored exactly at `path`. `None` when nothing is stored
    /// there, including when `path` sits beneath a marked ancestor.
    pub fn node_at(&self, path: &Path) -> Option<&TouchNode> {
        path.segments()
            .iter()
            .try_fold(self.root.as_ref()?, |node, segment| node.child(segment))
    }

    /// Forget the marker or subtree stored exactly at `path`, pruning
    /// branches left empty. Paths covered only by a marked ancestor cannot
    /// be narrowed and are left alone. Returns whether anything was removed.
    pub fn unset(&mut self, path: &Path) -> bool {
        if path.is_empty() {
            return self.root.take().is_some();
        }
        let removed = match self.root.as_mut() {
            Some(TouchNode::Branch(children)) => unset_in(children, path.segments()),
            _ => false,
        };
        if matches!(&self.root, Some(TouchNode::Branch(children)) if children.is_empty()) {
            self.root = None;
        }
        removed
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.root = None;
    }

    /// A copy of this tree relocated beneath `prefix`.
    pub fn nested_under(&self, prefix: &Path) -> TouchTree {
        let Some(root) = self.root.as_ref() else {
            return TouchTree::new();
        };
        let mut node = relocate(root, prefix);
        for segment in prefix.segments().iter().rev() {
            let mut children = IndexMap::new();
            children.insert(segment.clone(), node);
            node = TouchNode::Branch(children);
        }
        TouchTree { root: Some(node) }
    }

    /// The value-shaped rendering of this tree: marked leaves hold their
    /// path string, or `*` for wildcard markers.
    pub fn to_value(&self) -> Value {
        self.root
            .as_ref()
            .map_or_else(|| Value::Object(Map::new()), TouchNode::to_value)
    }
}

fn relocate(node: &TouchNode, prefix: &Path) -> TouchNode {
    match node {
        TouchNode::Marked(Marker::Path(p)) => TouchNode::Marked(Marker::Path(prefix.join(p))),
        TouchNode::Marked(Marker::Wildcard(p)) => {
            TouchNode::Marked(Marker::Wildcard(prefix.join(p)))
        }
        TouchNode::Branch(children) => TouchNode::Branch(
            children
                .iter()
                .map(|(segment, child)| (segment.clone(), relocate(child, prefix)))
                .collect(),
        ),
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
    fn test_mark_and_lookup() {
        let mut tree = TouchTree::new();
        assert!(tree.mark(&p("user.name")));
        assert!(tree.is_touched(&p("user.name")));
        assert!(tree.is_touched(&p("user.name.first")));
        assert!(!tree.is_touched(&p("user")));
        assert!(!tree.is_touched(&p("user.email")));
        assert!(tree.touches_within(&p("user")));
        assert!(!tree.touches_within(&p("address")));
    }

    #[test]
    fn test_marked_ancestor_cannot_be_narrowed() {
        let mut tree = TouchTree::new();
        tree.mark(&p("a"));
        let before = tree.clone();
        assert!(!tree.mark(&p("a.b")));
        assert_eq!(tree, before);
        assert!(tree.is_touched(&p("a.b.c")));
    }

    #[test]
    fn test_ancestor_absorbs_descendants() {
        let mut tree = TouchTree::new();
        tree.mark(&p("a.b"));
        tree.mark(&p("a.c[0]"));
        assert!(!tree.is_touched(&p("a.d")));

        assert!(tree.mark(&p("a")));
        assert!(tree.is_touched(&p("a.d")));
        assert!(tree.is_touched(&p("a.b.c")));
        match tree.node_at(&p("a")) {
            Some(TouchNode::Marked(marker)) => {
                assert!(marker.is_wildcard());
                assert_eq!(marker.path(), &p("a"));
            }
            other => panic!("expected a wildcard marker at a, got {other:?}"),
        }
    }

    #[test]
    fn test_index_and_numeric_key_share_a_node() {
        let mut tree = TouchTree::new();
        tree.mark(&p("items[2]"));
        assert!(tree.is_touched(&p("items.2")));
        assert!(!tree.mark(&p("items.2")));
    }

    #[test]
    fn test_numeric_key_children_sort_as_indices() {
        let tree = TouchTree::new().merge(&[p("a.name"), p("a.1"), p("a[0]")]);
        let root = tree.root().unwrap();
        let a = root.child(&Segment::Key("a".into())).unwrap();
        let order: Vec<Option<usize>> = a
            .children()
            .into_iter()
            .map(|(segment, _)| segment.array_index())
            .collect();
        assert_eq!(order, [Some(0), Some(1), None]);
    }

    #[test]
    fn test_wildcard_marks_everything() {
        let mut tree = TouchTree::new();
        tree.mark(&p("a.b"));
        tree.mark(&Path::wildcard());
        assert!(tree.is_touched(&p("anything.at.all")));
        assert!(tree.is_touched(&Path::root()));
    }

    #[test]
    fn test_merge_is_idempotent_and_leaves_original() {
        let base = TouchTree::new();
        let paths = [p("a"), p("b[1]")];
        let once = base.merge(&paths);
        let twice = once.merge(&paths);
        assert_eq!(once, twice);
        assert!(base.is_empty());
    }

    #[test]
    fn test_unset_prunes_empty_branches() {
        let mut tree = TouchTree::new();
        tree.mark(&p("a.b.c"));
        tree.mark(&p("x"));
        assert!(tree.unset(&p("a.b.c")));
        assert!(tree.node_at(&p("a")).is_none());
        assert!(!tree.touches_within(&p("a")));
        assert!(tree.unset(&p("x")));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_unset_under_marked_ancestor_is_noop() {
        let mut tree = TouchTree::new();
        tree.mark(&p("a"));
        assert!(!tree.unset(&p("a.b")));
        assert!(tree.is_touched(&p("a.b")));
    }

    #[test]
    fn test_unset_root_clears() {
        let mut tree = TouchTree::new();
        tree.mark(&p("a"));
        assert!(tree.unset(&Path::root()));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_nested_under() {
        let mut tree = TouchTree::new();
        tree.mark(&p("username"));
        let nested = tree.nested_under(&p("user.details"));
        assert!(nested.is_touched(&p("user.details.username")));
        assert!(!nested.is_touched(&p("username")));
        assert_eq!(
            nested.to_value(),
            json!({"user": {"details": {"username": "user.details.username"}}})
        );
    }

    #[test]
    fn test_to_value_renders_wildcards() {
        let mut tree = TouchTree::new();
        tree.mark(&p("a.b"));
        tree.mark(&p("a"));
        tree.mark(&p("c[1]"));
        assert_eq!(tree.to_value(), json!({"a": "*", "c": {"1": "c[1]"}}));
    }
}
