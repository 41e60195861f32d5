//! # Custom Validators
//!
//! A validator is one stage of the chain that runs after the schema check.
//! It receives a read-only [`ValidatorContext`] and returns the
//! `{values, errors}` pair handed to the next stage. Validators run
//! synchronously, strictly in order.
//!
//! Any `Fn(&ValidatorContext) -> StageOutput + Send + Sync` is a validator.

use serde_json::Value;

use vrec_core::Path;

/// Everything a validator may look at.
///
/// `values` are the record's own overrides in scope (or the previous
/// stage's output), not the merged snapshot. The merged view with defaults
/// applied is `values_with_defaults`, which does not change along the chain.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorContext<'a> {
    /// Overrides in scope, as left by the previous stage.
    pub values: &'a Value,
    /// Error Tree as left by the previous stage.
    pub errors: &'a Value,
    /// Outermost touched paths.
    pub touched: &'a [Path],
    /// Outermost validated paths, including those requested by this call.
    pub validated: &'a [Path],
    /// Paths written by this call. Empty for a pure validate call.
    pub changing: &'a [Path],
    /// Whether everything is being validated.
    pub validate_all: bool,
    /// The reconciled snapshot in scope.
    pub values_with_defaults: &'a Value,
    /// The record's external input.
    pub input: &'a Value,
}

/// What a validator hands to the next stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    /// Values for the next stage; committed as the new overrides at the end.
    pub values: Value,
    /// Error Tree for the next stage; must be an object.
    pub errors: Value,
}

impl StageOutput {
    /// Forward the context's values and errors unchanged.
    pub fn pass(ctx: &ValidatorContext<'_>) -> Self {
        Self {
            values: ctx.values.clone(),
            errors: ctx.errors.clone(),
        }
    }
}

/// A stage in the custom validation chain.
pub trait Validator: Send + Sync {
    /// Produce the next `{values, errors}` pair.
    fn validate(&self, ctx: &ValidatorContext<'_>) -> StageOutput;
}

impl<F> Validator for F
where
    F: Fn(&ValidatorContext<'_>) -> StageOutput + Send + Sync,
{
    fn validate(&self, ctx: &ValidatorContext<'_>) -> StageOutput {
        self(ctx)
    }
}
