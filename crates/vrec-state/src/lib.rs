//! # vrec-state — Touch Tracking and Reconciliation
//!
//! Everything a record needs to remember about *which* parts of itself a
//! user has interacted with, and how that memory shapes the values and
//! errors it exposes.
//!
//! ## Components
//!
//! - **Touch Tree** (`touch.rs`): records touched paths. A marked node
//!   stands for its whole subtree; marking a node that already has marked
//!   descendants absorbs them under a wildcard marker.
//!
//! - **Outermost extraction** (`outermost.rs`): reduces a touch tree to the
//!   ordered list of marked paths with no marked ancestor.
//!
//! - **Reconciler** (`reconcile.rs`): deep-merges a default tree with an
//!   override tree, letting the touch tree exempt whole subtrees from the
//!   merge.
//!
//! - **Visibility** (`visibility.rs`): picks the errors a caller may see and
//!   drops externally supplied errors that local touches supersede.
//!
//! ## Crate Policy
//!
//! - Depends only on `vrec-core` internally.
//! - All operations are pure functions of their inputs, or mutate only the
//!   value they are called on. Nothing here logs or performs I/O.

pub mod outermost;
pub mod reconcile;
pub mod touch;
pub mod visibility;

pub use outermost::extract_leaves;
pub use reconcile::{reconcile, reconcile_record};
pub use touch::{Marker, TouchNode, TouchTree};
pub use visibility::{omit_touched, pick_errors, underlay_errors};
