//! # vrec-schema — Structural Schema Stage
//!
//! The first validation stage of a record cycle: check the reconciled
//! snapshot against a structural schema and turn every failure into data.
//!
//! ## Schema Check (`validate`)
//!
//! [`SchemaCheck`] is the seam the engine calls. [`JsonSchema`] implements it
//! with the `jsonschema` crate (Draft 2020-12), collecting every failure
//! rather than stopping at the first. Cross-schema `$ref`s resolve against
//! documents registered up front; nothing is fetched over the network.
//!
//! ## Messages (`message`)
//!
//! Failures are rendered as short messages that never repeat the field name
//! (`must be a string`, `is required`, `must contain at least 2 items`) and
//! are attached at the failing field's own path.
//!
//! ## Crate Policy
//!
//! - Depends only on `vrec-core` internally.
//! - A schema failure is never an `Err`. Only building a schema can fail.

pub mod message;
pub mod validate;

pub use validate::{error_tree, JsonSchema, SchemaBuildError, SchemaCheck, Violation};
