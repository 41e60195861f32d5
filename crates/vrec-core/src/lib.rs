//! # vrec-core — Foundational Types for Validated Records
//!
//! This crate is the leaf of the vrec workspace. It defines how a location
//! inside a nested, dynamically-shaped record is named and how values are
//! read and written at such a location. Every other crate in the workspace
//! depends on `vrec-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One path representation.** `Path` is an ordered list of `Segment`s
//!    (field names and array indices). The string form `a.b[2].c` is only an
//!    input/output format: `Path::parse` and `Display` are exact inverses for
//!    canonical strings.
//!
//! 2. **`serde_json::Value` is the record.** Null, Bool, Number, String,
//!    Array and Object are the only shapes. "Undefined" is `Option::None`,
//!    never a sentinel value.
//!
//! 3. **Callers own the copy.** The tree operations in [`tree`] mutate the
//!    value they are handed. Code that needs the previous snapshot intact
//!    clones first (`Value::clone` is a full structural copy).
//!
//! ## Crate Policy
//!
//! - No dependencies on other `vrec-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod path;
pub mod tree;

// Re-export primary types for ergonomic imports.
pub use error::MalformedPathError;
pub use path::{Path, Segment, MAX_ARRAY_INDEX, WILDCARD};
pub use tree::{defaults_deep, get, get_mut, pick_deep, set, unset, wrap};
