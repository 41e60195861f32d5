//! # Outermost-Path Extraction
//!
//! Reduces a touch tree to the list of paths actually marked. Traversal is
//! depth-first in structural order and stops at the first marker on every
//! branch, so no returned path is a descendant of another.
//!
//! The order is stable for a given tree. Downstream error picking inserts
//! errors in this order, so it is also the display order of visible errors.

use vrec_core::Path;

use crate::touch::{TouchNode, TouchTree};

/// The outermost marked paths of `tree`, in structural order.
pub fn extract_leaves(tree: &TouchTree) -> Vec<Path> {
    let mut out = Vec::new();
    if let Some(root) = tree.root() {
        collect(root, &mut out);
    }
    out
}

fn collect(node: &TouchNode, out: &mut Vec<Path>) {
    match node {
        TouchNode::Marked(marker) => out.push(marker.path().clone()),
        TouchNode::Branch(_) => {
            for (_, child) in node.children() {
                collect(child, out);
            }
        }
    }
}
