//! # Engine Errors
//!
//! Only caller mistakes are errors here. Schema failures and validator
//! findings are data and live in the Error Tree.
//!
//! - Malformed path strings fail before any state is touched.
//! - A validator that hands back a wrongly shaped `{values, errors}` pair
//!   aborts its cycle; the previously committed state stays authoritative.

use thiserror::Error;

use vrec_core::MalformedPathError;
use vrec_schema::SchemaBuildError;

/// A custom validator returned output of the wrong shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validator {stage} violated its contract: {reason}")]
pub struct ContractViolation {
    /// Zero-based position of the offending validator in the chain.
    pub stage: usize,
    /// What was wrong with its output.
    pub reason: String,
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The YAML document could not be parsed into a configuration.
    #[error("invalid YAML configuration: {reason}")]
    Yaml {
        /// Parser message.
        reason: String,
    },

    /// The JSON document could not be parsed into a configuration.
    #[error("invalid JSON configuration: {reason}")]
    Json {
        /// Parser message.
        reason: String,
    },

    /// A field holds a value the engine cannot use.
    #[error("invalid configuration field '{field}': {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Umbrella error for record operations.
#[derive(Error, Debug)]
pub enum RecordError {
    /// A path argument could not be parsed.
    #[error(transparent)]
    MalformedPath(#[from] MalformedPathError),

    /// A validator broke the pipeline contract.
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    /// The record configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The structural schema could not be compiled.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaBuildError),
}
