//! # Record
//!
//! A validated record: external input and declared defaults, locally held
//! overrides, the touch and validated-paths trees, and the last Error Tree.
//!
//! ## State flow
//!
//! Every operation works on a copy of the current state and commits it only
//! once it has fully succeeded. Path strings are parsed before anything is
//! copied, and a validation cycle that ends in a contract violation leaves
//! the committed state exactly as it was.
//!
//! ## Defaults
//!
//! The default tree of each cycle is the external input with the declared
//! defaults filling whatever it lacks, minus the external-errors entry.
//! Input always wins over declared defaults; overrides win over both unless
//! an exemption says otherwise (see `vrec_state::reconcile`).

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use vrec_core::{tree, MalformedPathError, Path, WILDCARD};
use vrec_schema::SchemaCheck;
use vrec_state::{
    extract_leaves, omit_touched, pick_errors, reconcile_record, underlay_errors, TouchTree,
};

use crate::config::RecordConfig;
use crate::error::RecordError;
use crate::pipeline::{Cycle, CycleFacts, TransitionRecord};
use crate::strategy::ValueStrategy;
use crate::validator::{StageOutput, Validator, ValidatorContext};

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn parse_all<P: AsRef<str>>(paths: impl IntoIterator<Item = P>) -> Result<Vec<Path>, MalformedPathError> {
    paths.into_iter().map(|p| Path::parse(p.as_ref())).collect()
}

// ─── Change Options ──────────────────────────────────────────────────

/// Which paths a change validates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValidateOn {
    /// No validation (unless the record is validating everything).
    #[default]
    No,
    /// Validate exactly the changed paths.
    Changed,
    /// Validate these paths. `*` validates everything.
    Paths(Vec<String>),
}

type Callback<'a> = Box<dyn FnOnce(&Record) + 'a>;

/// Options for the change operations.
#[derive(Default)]
pub struct ChangeOptions<'a> {
    /// Validation to run after the write.
    pub validate: ValidateOn,
    /// For `change_from_args`: use this value instead of extracting one.
    pub value: Option<Value>,
    /// For `change_from_args`: use this strategy instead of the record's.
    pub strategy: Option<ValueStrategy>,
    callback: Option<Callback<'a>>,
}

impl<'a> ChangeOptions<'a> {
    /// No validation, no callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the changed paths.
    pub fn validate(mut self) -> Self {
        self.validate = ValidateOn::Changed;
        self
    }

    /// Validate the given paths.
    pub fn validate_paths<P: Into<String>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.validate = ValidateOn::Paths(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Use an explicit value in `change_from_args`.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Use a specific strategy in `change_from_args`.
    pub fn with_strategy(mut self, strategy: ValueStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Run `callback` with the record once the change has been committed.
    pub fn on_settled(mut self, callback: impl FnOnce(&Record) + 'a) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for ChangeOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeOptions")
            .field("validate", &self.validate)
            .field("value", &self.value)
            .field("strategy", &self.strategy)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

// ─── Record State ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RecordState {
    values: Value,
    errors: Value,
    touched: TouchTree,
    validated: TouchTree,
    changing: Vec<Path>,
    validate_all: bool,
}

impl Default for RecordState {
    fn default() -> Self {
        Self {
            values: empty_object(),
            errors: empty_object(),
            touched: TouchTree::new(),
            validated: TouchTree::new(),
            changing: Vec::new(),
            validate_all: false,
        }
    }
}

impl RecordState {
    fn mark_validated(&mut self, paths: &[Path]) {
        for path in paths {
            if path.is_wildcard() {
                self.validate_all = true;
            } else {
                self.validated.mark(path);
            }
        }
    }
}

// ─── Builder ─────────────────────────────────────────────────────────

/// Assembles a [`Record`].
pub struct RecordBuilder {
    config: RecordConfig,
    schema: Option<Arc<dyn SchemaCheck>>,
    validators: Vec<Arc<dyn Validator>>,
    declared_defaults: Value,
    input: Value,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self {
            config: RecordConfig::default(),
            schema: None,
            validators: Vec::new(),
            declared_defaults: empty_object(),
            input: empty_object(),
        }
    }
}

impl RecordBuilder {
    /// Use `config` instead of the default configuration.
    pub fn config(mut self, config: RecordConfig) -> Self {
        self.config = config;
        self
    }

    /// Check snapshots against `schema` before the validator chain.
    pub fn schema(mut self, schema: impl SchemaCheck + 'static) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    /// Append a validator to the chain.
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Append a closure to the validator chain.
    pub fn validator_fn<F>(self, f: F) -> Self
    where
        F: Fn(&ValidatorContext<'_>) -> StageOutput + Send + Sync + 'static,
    {
        self.validator(f)
    }

    /// Static defaults that fill gaps in the external input.
    pub fn defaults(mut self, defaults: Value) -> Self {
        self.declared_defaults = defaults;
        self
    }

    /// Initial external input.
    pub fn input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    /// Finish the record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Config`] if the configuration is inconsistent.
    pub fn build(self) -> Result<Record, RecordError> {
        self.config.check()?;
        Ok(Record {
            config: self.config,
            schema: self.schema,
            validators: self.validators,
            declared_defaults: self.declared_defaults,
            input: self.input,
            state: RecordState::default(),
            last_transitions: Vec::new(),
        })
    }
}

// ─── The Record ──────────────────────────────────────────────────────

/// A record whose values and errors are reconciled and validated per path.
pub struct Record {
    config: RecordConfig,
    schema: Option<Arc<dyn SchemaCheck>>,
    validators: Vec<Arc<dyn Validator>>,
    declared_defaults: Value,
    input: Value,
    state: RecordState,
    last_transitions: Vec<TransitionRecord>,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("config", &self.config)
            .field("has_schema", &self.schema.is_some())
            .field("validators", &self.validators.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Record {
    /// Start building a record.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Write several values at once, then validate as `options` asks.
    ///
    /// Every written path is marked touched and becomes this call's
    /// changing set. While the record is validating everything, a full
    /// cycle runs even if `options` asks for no validation.
    ///
    /// # Errors
    ///
    /// [`RecordError::MalformedPath`] if any path fails to parse or writes
    /// past the largest array index, and [`RecordError::Contract`] if a
    /// validator breaks its contract. In every case nothing is committed and
    /// no callback runs.
    pub fn change<P: AsRef<str>>(
        &mut self,
        changes: impl IntoIterator<Item = (P, Value)>,
        options: ChangeOptions<'_>,
    ) -> Result<(), RecordError> {
        let changes = changes
            .into_iter()
            .map(|(p, v)| Ok((Path::parse(p.as_ref())?, v)))
            .collect::<Result<Vec<_>, MalformedPathError>>()?;
        let validate_paths = match &options.validate {
            ValidateOn::No => None,
            ValidateOn::Changed => Some(changes.iter().map(|(p, _)| p.clone()).collect()),
            ValidateOn::Paths(paths) => Some(parse_all(paths)?),
        };

        let mut next = self.state.clone();
        next.changing.clear();
        for (path, value) in changes {
            tracing::trace!(%path, "writing override");
            tree::set(&mut next.values, &path, value)?;
            next.touched.mark(&path);
            next.changing.push(path);
        }

        let run_cycle = match validate_paths {
            Some(paths) => {
                next.mark_validated(&paths);
                true
            }
            None => next.validate_all,
        };
        if run_cycle {
            next = self.run_cycle(next)?;
        }
        self.state = next;

        if let Some(callback) = options.callback {
            callback(self);
        }
        Ok(())
    }

    /// Write one value.
    pub fn change_value(
        &mut self,
        path: &str,
        value: Value,
        options: ChangeOptions<'_>,
    ) -> Result<(), RecordError> {
        self.change([(path, value)], options)
    }

    /// Write the value found in a callback's argument list.
    ///
    /// An explicit `options.value` wins; otherwise `options.strategy` (or
    /// the record's configured strategy) extracts the value from `args`.
    /// Nothing found means `null`.
    pub fn change_from_args(
        &mut self,
        path: &str,
        args: &[Value],
        mut options: ChangeOptions<'_>,
    ) -> Result<(), RecordError> {
        let value = match options.value.take() {
            Some(value) => value,
            None => options
                .strategy
                .as_ref()
                .unwrap_or(&self.config.strategy)
                .extract(args)
                .unwrap_or(Value::Null),
        };
        self.change_value(path, value, options)
    }

    // ── Validation ──────────────────────────────────────────────────

    /// Validate `paths` without writing anything. `*` validates everything
    /// and keeps doing so on every later change until cleared.
    pub fn validate<P: AsRef<str>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<(), RecordError> {
        self.validate_with(paths, |_| {})
    }

    /// [`Record::validate`], then run `callback` with the committed record.
    pub fn validate_with<P: AsRef<str>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
        callback: impl FnOnce(&Record),
    ) -> Result<(), RecordError> {
        let paths = parse_all(paths)?;
        let mut next = self.state.clone();
        next.changing.clear();
        next.mark_validated(&paths);
        self.state = self.run_cycle(next)?;
        callback(self);
        Ok(())
    }

    /// Validate everything.
    pub fn validate_all(&mut self) -> Result<(), RecordError> {
        self.validate([WILDCARD])
    }

    fn run_cycle(&mut self, mut next: RecordState) -> Result<RecordState, RecordError> {
        let snapshot = self.reconcile(&next);
        let facts = CycleFacts {
            touched: extract_leaves(&next.touched),
            validated: extract_leaves(&next.validated),
            changing: next.changing.clone(),
            validate_all: next.validate_all,
            values_with_defaults: self.config.view(&snapshot),
            input: &self.input,
        };
        let outcome = Cycle::begin(next.values.clone(), facts)
            .schema_check(self.schema.as_deref())
            .run_validators(&self.validators)?
            .settle()
            .into_outcome();

        tracing::debug!(
            validate_all = next.validate_all,
            changing = next.changing.len(),
            "validation cycle committed"
        );
        next.values = outcome.values;
        next.errors = outcome.errors;
        self.last_transitions = outcome.transitions;
        Ok(next)
    }

    // ── Clearing ────────────────────────────────────────────────────

    /// Forget every touched path and stop validating everything.
    pub fn clear_touched(&mut self) {
        self.state.touched.clear();
        self.state.validate_all = false;
    }

    /// Forget the given touched paths.
    pub fn clear_touched_paths<P: AsRef<str>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<(), RecordError> {
        for path in parse_all(paths)? {
            self.state.touched.unset(&path);
        }
        Ok(())
    }

    /// Forget every validated path and stop validating everything.
    pub fn clear_validated(&mut self) {
        self.state.validated.clear();
        self.state.validate_all = false;
    }

    /// Forget the given validated paths and stop validating everything.
    pub fn clear_validated_paths<P: AsRef<str>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<(), RecordError> {
        let paths = parse_all(paths)?;
        for path in &paths {
            self.state.validated.unset(path);
        }
        self.state.validate_all = false;
        Ok(())
    }

    /// Reset the record to its initial state: no overrides, no errors,
    /// nothing touched or validated.
    pub fn clear_all(&mut self) {
        self.state = RecordState::default();
    }

    /// Drop the overrides at `paths` and forget them as touched and
    /// validated.
    pub fn clear_all_paths<P: AsRef<str>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<(), RecordError> {
        let paths = parse_all(paths)?;
        let mut next = self.state.clone();
        for path in &paths {
            tree::unset(&mut next.values, path);
            next.touched.unset(path);
            next.validated.unset(path);
        }
        self.state = next;
        Ok(())
    }

    // ── Input ───────────────────────────────────────────────────────

    /// Replace the external input.
    pub fn set_input(&mut self, input: Value) {
        self.input = input;
    }

    /// The external input.
    pub fn input(&self) -> &Value {
        &self.input
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// The reconciled record.
    pub fn snapshot(&self) -> Value {
        self.reconcile(&self.state)
    }

    /// The reconciled record as validation sees it (scoped).
    pub fn values_with_defaults(&self) -> Value {
        self.config.view(&self.snapshot())
    }

    /// The errors a caller may currently see.
    ///
    /// When validating everything, the whole Error Tree; otherwise only the
    /// errors at outermost validated paths and pseudo values. Externally
    /// supplied errors fill in beneath, except where the path has been
    /// touched locally.
    pub fn active_errors(&self) -> Value {
        let external = tree::get(&self.input, &self.config.external_errors_path)
            .cloned()
            .unwrap_or_else(empty_object);
        let base = omit_touched(&external, &self.state.touched);

        let mut active = if self.state.validate_all {
            self.state.errors.clone()
        } else {
            let mut paths = extract_leaves(&self.state.validated);
            paths.extend(self.config.pseudo_values.iter().cloned());
            pick_errors(&self.state.errors, &paths)
        };
        underlay_errors(&mut active, &base);
        active
    }

    /// The full Error Tree of the last cycle, unfiltered.
    pub fn errors(&self) -> &Value {
        &self.state.errors
    }

    /// The overrides, relative to the validation scope.
    pub fn values(&self) -> &Value {
        &self.state.values
    }

    /// Outermost touched paths, relative to the validation scope.
    pub fn touched(&self) -> Vec<Path> {
        extract_leaves(&self.state.touched)
    }

    /// Outermost validated paths, relative to the validation scope.
    pub fn validated(&self) -> Vec<Path> {
        extract_leaves(&self.state.validated)
    }

    /// Paths written by the last change.
    pub fn changing(&self) -> &[Path] {
        &self.state.changing
    }

    /// Whether every change currently revalidates the whole record.
    pub fn is_validating_all(&self) -> bool {
        self.state.validate_all
    }

    /// Stage transitions of the last committed cycle.
    pub fn last_transitions(&self) -> &[TransitionRecord] {
        &self.last_transitions
    }

    /// The record configuration.
    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    fn defaults(&self) -> Value {
        let mut input = self.input.clone();
        tree::unset(&mut input, &self.config.external_errors_path);
        match input {
            Value::Null => self.declared_defaults.clone(),
            mut input => {
                tree::defaults_deep(&mut input, &self.declared_defaults);
                input
            }
        }
    }

    fn reconcile(&self, state: &RecordState) -> Value {
        reconcile_record(
            &self.defaults(),
            &self.config.wrap(state.values.clone()),
            &self.config.nest(&state.touched),
        )
    }
}
