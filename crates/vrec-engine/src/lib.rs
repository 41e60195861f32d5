//! # vrec-engine — Validated Records
//!
//! Ties the lower crates together into a [`Record`]: a value assembled from
//! external input, declared defaults and local overrides, validated path by
//! path as a user interacts with it.
//!
//! ## Cycle
//!
//! Every validation runs one [`pipeline::Cycle`]:
//!
//! 1. Reconcile defaults and overrides, honoring touch exemptions.
//! 2. Check the scoped snapshot against the structural schema, if any.
//! 3. Fold the custom validator chain over `{values, errors}`.
//! 4. Commit the result.
//!
//! Which errors a caller sees is decided afterwards by
//! [`Record::active_errors`], from the validated paths.
//!
//! ## Crate Policy
//!
//! - Only caller mistakes are `Err`: malformed paths, bad configuration and
//!   validator contract violations. Validation failures are data.
//! - A failed operation commits nothing.
//! - Logging goes through `tracing`. The crate never installs a subscriber.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod strategy;
pub mod validator;

pub use config::{Only, RecordConfig};
pub use error::{ConfigError, ContractViolation, RecordError};
pub use pipeline::{CycleOutcome, TransitionRecord};
pub use record::{ChangeOptions, Record, RecordBuilder, ValidateOn};
pub use strategy::ValueStrategy;
pub use validator::{StageOutput, Validator, ValidatorContext};

pub use vrec_core::{MalformedPathError, Path};
pub use vrec_schema::{JsonSchema, SchemaCheck};
