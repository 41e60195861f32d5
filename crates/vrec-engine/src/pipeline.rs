//! # Validation Cycle
//!
//! One validation cycle, encoded with the typestate pattern. Each stage is a
//! distinct type and each transition consumes the cycle, so stages cannot be
//! skipped or reordered.
//!
//! ```text
//! Merging ──schema_check()──▶ SchemaCheck ──run_validators()──▶ CustomValidation ──settle()──▶ Settled
//!                                                  │
//!                                                  └── ContractViolation (cycle discarded)
//! ```
//!
//! A cycle owns the `{values, errors}` pair as it moves through the stages
//! and records every transition. Nothing is committed to the record until
//! the caller takes the settled output.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};

use vrec_core::Path;
use vrec_schema::{error_tree, SchemaCheck};

use crate::error::ContractViolation;
use crate::validator::{Validator, ValidatorContext};

// ─── Stage Types ─────────────────────────────────────────────────────

/// Stage: snapshot reconciled, nothing checked yet.
#[derive(Debug, Clone, Copy)]
pub struct Merging;

/// Stage: structural schema applied.
#[derive(Debug, Clone, Copy)]
pub struct SchemaCheckStage;

/// Stage: custom validator chain applied.
#[derive(Debug, Clone, Copy)]
pub struct CustomValidation;

/// Stage: final output ready to commit (terminal).
#[derive(Debug, Clone, Copy)]
pub struct Settled;

mod private {
    pub trait Sealed {}
    impl Sealed for super::Merging {}
    impl Sealed for super::SchemaCheckStage {}
    impl Sealed for super::CustomValidation {}
    impl Sealed for super::Settled {}
}

/// Marker trait for cycle stages. Sealed.
pub trait CycleStage: private::Sealed + std::fmt::Debug {
    /// Stage name used in the transition log.
    fn name() -> &'static str;
}

impl CycleStage for Merging {
    fn name() -> &'static str {
        "MERGING"
    }
}
impl CycleStage for SchemaCheckStage {
    fn name() -> &'static str {
        "SCHEMA_CHECK"
    }
}
impl CycleStage for CustomValidation {
    fn name() -> &'static str {
        "CUSTOM_VALIDATION"
    }
}
impl CycleStage for Settled {
    fn name() -> &'static str {
        "SETTLED"
    }
}

// ─── Transition Record ───────────────────────────────────────────────

/// One stage transition of a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Stage before the transition.
    pub from_stage: &'static str,
    /// Stage after the transition.
    pub to_stage: &'static str,
    /// What the transition did.
    pub detail: String,
}

// ─── Cycle Inputs ────────────────────────────────────────────────────

/// Read-only facts a cycle is run against.
#[derive(Debug, Clone)]
pub struct CycleFacts<'r> {
    /// Outermost touched paths.
    pub touched: Vec<Path>,
    /// Outermost validated paths.
    pub validated: Vec<Path>,
    /// Paths written by the triggering call.
    pub changing: Vec<Path>,
    /// Whether everything is being validated.
    pub validate_all: bool,
    /// Reconciled snapshot in scope.
    pub values_with_defaults: Value,
    /// External input of the record.
    pub input: &'r Value,
}

// ─── The Cycle ───────────────────────────────────────────────────────

/// A validation cycle in stage `S`.
#[derive(Debug)]
pub struct Cycle<'r, S: CycleStage> {
    facts: CycleFacts<'r>,
    values: Value,
    errors: Value,
    transition_log: Vec<TransitionRecord>,
    _stage: PhantomData<S>,
}

impl<'r, S: CycleStage> Cycle<'r, S> {
    /// Current stage name.
    pub fn stage_name(&self) -> &'static str {
        S::name()
    }

    /// Values as of this stage.
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Error Tree as of this stage.
    pub fn errors(&self) -> &Value {
        &self.errors
    }

    /// Transitions so far.
    pub fn transition_log(&self) -> &[TransitionRecord] {
        &self.transition_log
    }

    fn transition_to<T: CycleStage>(mut self, detail: String) -> Cycle<'r, T> {
        tracing::debug!(from = S::name(), to = T::name(), %detail, "validation cycle transition");
        self.transition_log.push(TransitionRecord {
            from_stage: S::name(),
            to_stage: T::name(),
            detail,
        });
        Cycle {
            facts: self.facts,
            values: self.values,
            errors: self.errors,
            transition_log: self.transition_log,
            _stage: PhantomData,
        }
    }
}

impl<'r> Cycle<'r, Merging> {
    /// Start a cycle over the record's in-scope overrides.
    pub fn begin(values: Value, facts: CycleFacts<'r>) -> Self {
        Self {
            facts,
            values,
            errors: Value::Object(Map::new()),
            transition_log: Vec::new(),
            _stage: PhantomData,
        }
    }

    /// Check the reconciled snapshot against `schema`, collecting every
    /// failure into a fresh Error Tree. Without a schema the Error Tree
    /// starts empty.
    pub fn schema_check(mut self, schema: Option<&dyn SchemaCheck>) -> Cycle<'r, SchemaCheckStage> {
        let (errors, detail) = match schema {
            Some(schema) => {
                let violations = schema.check(&self.facts.values_with_defaults);
                let detail = format!("{} schema violation(s)", violations.len());
                (error_tree(&violations), detail)
            }
            None => (Value::Object(Map::new()), "no schema configured".to_string()),
        };
        self.errors = errors;
        self.transition_to(detail)
    }
}

impl<'r> Cycle<'r, SchemaCheckStage> {
    /// Fold the validator chain over the current `{values, errors}` pair.
    ///
    /// # Errors
    ///
    /// Returns [`ContractViolation`] if a validator returns a non-object
    /// Error Tree or values of a different shape than it was given. The
    /// cycle is consumed; nothing from it should be committed.
    pub fn run_validators(
        mut self,
        validators: &[Arc<dyn Validator>],
    ) -> Result<Cycle<'r, CustomValidation>, ContractViolation> {
        let mut values = std::mem::take(&mut self.values);
        let mut errors = std::mem::take(&mut self.errors);

        for (stage, validator) in validators.iter().enumerate() {
            let output = {
                let ctx = ValidatorContext {
                    values: &values,
                    errors: &errors,
                    touched: &self.facts.touched,
                    validated: &self.facts.validated,
                    changing: &self.facts.changing,
                    validate_all: self.facts.validate_all,
                    values_with_defaults: &self.facts.values_with_defaults,
                    input: self.facts.input,
                };
                validator.validate(&ctx)
            };
            if !output.errors.is_object() {
                return Err(violation(stage, format!(
                    "errors must be an object, got {}",
                    shape(&output.errors)
                )));
            }
            if shape(&output.values) != shape(&values) {
                return Err(violation(stage, format!(
                    "values changed shape from {} to {}",
                    shape(&values),
                    shape(&output.values)
                )));
            }
            values = output.values;
            errors = output.errors;
        }

        self.values = values;
        self.errors = errors;
        let detail = format!("{} validator(s) applied", validators.len());
        Ok(self.transition_to(detail))
    }
}

impl<'r> Cycle<'r, CustomValidation> {
    /// Finish the cycle.
    pub fn settle(self) -> Cycle<'r, Settled> {
        self.transition_to("ready to commit".to_string())
    }
}

/// The committed result of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// New overrides in scope.
    pub values: Value,
    /// New Error Tree.
    pub errors: Value,
    /// Every stage transition, in order.
    pub transitions: Vec<TransitionRecord>,
}

impl<'r> Cycle<'r, Settled> {
    /// Take the settled output.
    pub fn into_outcome(self) -> CycleOutcome {
        CycleOutcome {
            values: self.values,
            errors: self.errors,
            transitions: self.transition_log,
        }
    }
}

fn violation(stage: usize, reason: String) -> ContractViolation {
    tracing::warn!(stage, %reason, "validator contract violation, cycle aborted");
    ContractViolation { stage, reason }
}

fn shape(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "an object",
        Value::Array(_) => "an array",
        Value::Null => "null",
        _ => "a scalar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::StageOutput;
    use serde_json::json;
    use vrec_schema::JsonSchema;

    fn facts(input: &Value, snapshot: Value) -> CycleFacts<'_> {
        CycleFacts {
            touched: vec![Path::root().key("username")],
            validated: vec![Path::root().key("username")],
            changing: vec![Path::root().key("username")],
            validate_all: false,
            values_with_defaults: snapshot,
            input,
        }
    }

    fn arc<F>(f: F) -> Arc<dyn Validator>
    where
        F: Fn(&ValidatorContext<'_>) -> StageOutput + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    #[test]
    fn test_full_cycle_records_every_transition() {
        let input = json!({});
        let schema = JsonSchema::new(&json!({
            "type": "object",
            "properties": {"username": {"type": "string"}}
        }))
        .unwrap();
        let outcome = Cycle::begin(json!({"username": null}), facts(&input, json!({"username": null})))
            .schema_check(Some(&schema))
            .run_validators(&[])
            .unwrap()
            .settle()
            .into_outcome();

        assert_eq!(outcome.errors, json!({"username": "must be a string"}));
        assert_eq!(outcome.values, json!({"username": null}));
        let stages: Vec<(&str, &str)> = outcome
            .transitions
            .iter()
            .map(|t| (t.from_stage, t.to_stage))
            .collect();
        assert_eq!(
            stages,
            [
                ("MERGING", "SCHEMA_CHECK"),
                ("SCHEMA_CHECK", "CUSTOM_VALIDATION"),
                ("CUSTOM_VALIDATION", "SETTLED"),
            ]
        );
    }

    #[test]
    fn test_validators_see_previous_stage_output() {
        let input = json!({"props": true});
        let first = arc(|ctx| {
            let mut values = ctx.values.clone();
            values["username"] = json!("******");
            let mut errors = ctx.errors.clone();
            errors["username"] = json!("contains profanity");
            StageOutput { values, errors }
        });
        let second = arc(|ctx| {
            assert_eq!(ctx.values, &json!({"username": "******"}));
            assert_eq!(ctx.errors, &json!({"username": "contains profanity"}));
            assert_eq!(ctx.values_with_defaults, &json!({"username": "rudeWord"}));
            assert_eq!(ctx.input, &json!({"props": true}));
            StageOutput::pass(ctx)
        });

        let outcome = Cycle::begin(
            json!({"username": "rudeWord"}),
            facts(&input, json!({"username": "rudeWord"})),
        )
        .schema_check(None)
        .run_validators(&[first, second])
        .unwrap()
        .settle()
        .into_outcome();

        assert_eq!(outcome.values, json!({"username": "******"}));
        assert_eq!(outcome.errors, json!({"username": "contains profanity"}));
    }

    #[test]
    fn test_non_object_errors_violate_contract() {
        let input = json!({});
        let bad = arc(|ctx| StageOutput {
            values: ctx.values.clone(),
            errors: json!("oops"),
        });
        let err = Cycle::begin(json!({}), facts(&input, json!({})))
            .schema_check(None)
            .run_validators(&[arc(|ctx| StageOutput::pass(ctx)), bad])
            .unwrap_err();
        assert_eq!(err.stage, 1);
        assert!(err.reason.contains("errors must be an object"));
    }

    #[test]
    fn test_reshaped_values_violate_contract() {
        let input = json!({});
        let bad = arc(|ctx| StageOutput {
            values: json!([1, 2]),
            errors: ctx.errors.clone(),
        });
        let err = Cycle::begin(json!({}), facts(&input, json!({})))
            .schema_check(None)
            .run_validators(&[bad])
            .unwrap_err();
        assert_eq!(err.stage, 0);
        assert!(err.reason.contains("changed shape"));
    }
}
