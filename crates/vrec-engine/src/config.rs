//! # Record Configuration
//!
//! Loadable from YAML or JSON. Every path field is parsed while the document
//! is deserialized, so a malformed path is reported at load time.
//!
//! ```yaml
//! only: user.details          # or a list: [user, profile]
//! pseudo_values: [starSign]   # or a single path
//! external_errors_path: errors
//! ```
//!
//! ## Validation scope
//!
//! - No `only`: the whole record is validated.
//! - A single path: the record is validated *as seen from* that path.
//!   Overrides, errors and touch state are all relative to it, and are
//!   re-wrapped under it when reconciling against the defaults.
//! - A list of paths: nothing is re-rooted. The validated view is the record
//!   restricted to those paths.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use vrec_core::{tree, Path};
use vrec_state::TouchTree;

use crate::error::ConfigError;
use crate::strategy::ValueStrategy;

/// The part of the record subject to validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Only {
    /// Validate the record as seen from one path.
    Single(Path),
    /// Validate only these paths of the record.
    Many(Vec<Path>),
}

/// Per-record engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordConfig {
    /// Validation scope. `None` validates the whole record.
    pub only: Option<Only>,
    /// Paths that may carry errors although they are never part of the
    /// record (e.g. a derived field a validator reports on).
    #[serde(deserialize_with = "one_or_many")]
    pub pseudo_values: Vec<Path>,
    /// Where externally supplied errors live inside the record input.
    pub external_errors_path: Path,
    /// How `change_from_args` finds the new value among callback arguments.
    #[serde(skip)]
    pub strategy: ValueStrategy,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            only: None,
            pseudo_values: Vec::new(),
            external_errors_path: Path::root().key("errors"),
            strategy: ValueStrategy::default(),
        }
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Path>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Path),
        Many(Vec<Path>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) => vec![path],
        OneOrMany::Many(paths) => paths,
    })
}

impl RecordConfig {
    /// Parse and check a YAML configuration document.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(source).map_err(|e| ConfigError::Yaml {
            reason: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Parse and check a JSON configuration document.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source).map_err(|e| ConfigError::Json {
            reason: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Reject paths that parse but cannot serve their purpose.
    pub fn check(&self) -> Result<(), ConfigError> {
        let scope_paths: &[Path] = match &self.only {
            None => &[],
            Some(Only::Single(path)) => std::slice::from_ref(path),
            Some(Only::Many(paths)) => paths,
        };
        if scope_paths.iter().any(|p| p.is_wildcard() || p.is_root()) {
            return Err(ConfigError::InvalidField {
                field: "only",
                reason: "validation scope paths must name a field".to_string(),
            });
        }
        if self.pseudo_values.iter().any(Path::is_wildcard) {
            return Err(ConfigError::InvalidField {
                field: "pseudo_values",
                reason: "the wildcard cannot carry an error".to_string(),
            });
        }
        if self.external_errors_path.is_wildcard() || self.external_errors_path.is_root() {
            return Err(ConfigError::InvalidField {
                field: "external_errors_path",
                reason: "must name a field of the input".to_string(),
            });
        }

        let fields = scope_paths
            .iter()
            .map(|p| ("only", p))
            .chain(self.pseudo_values.iter().map(|p| ("pseudo_values", p)))
            .chain(std::iter::once(("external_errors_path", &self.external_errors_path)));
        for (field, path) in fields {
            path.check_index_range()
                .map_err(|e| ConfigError::InvalidField { field, reason: e.reason })?;
        }
        Ok(())
    }

    /// Builder-style scope setter.
    pub fn with_only(mut self, only: Only) -> Self {
        self.only = Some(only);
        self
    }

    /// Builder-style pseudo value setter.
    pub fn with_pseudo_values(mut self, paths: Vec<Path>) -> Self {
        self.pseudo_values = paths;
        self
    }

    /// Builder-style strategy setter.
    pub fn with_strategy(mut self, strategy: ValueStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The root that scope-relative state hangs under, for a singular scope.
    pub(crate) fn scope_root(&self) -> Option<&Path> {
        match &self.only {
            Some(Only::Single(path)) => Some(path),
            _ => None,
        }
    }

    /// Scope-relative `value` placed at its record location.
    pub(crate) fn wrap(&self, value: Value) -> Value {
        match self.scope_root() {
            // `check` keeps the scope root within the array index range.
            Some(root) => tree::wrap(root, value).unwrap_or_else(|_| Value::Object(Map::new())),
            None => value,
        }
    }

    /// Scope-relative touch state placed at its record location.
    pub(crate) fn nest(&self, touched: &TouchTree) -> TouchTree {
        match self.scope_root() {
            Some(root) => touched.nested_under(root),
            None => touched.clone(),
        }
    }

    /// The part of a whole-record `snapshot` that validation sees.
    pub(crate) fn view(&self, snapshot: &Value) -> Value {
        match &self.only {
            None => snapshot.clone(),
            Some(Only::Single(root)) => tree::get(snapshot, root)
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
            Some(Only::Many(paths)) => tree::pick_deep(snapshot, paths),
        }
    }
}
