//! # Schema Validation
//!
//! Structural validation of a record snapshot against a JSON Schema
//! (Draft 2020-12) with collect-all semantics.
//!
//! ## Failure model
//!
//! A failing document is not an error. Every failure becomes a
//! [`Violation`] carrying a canonical [`Path`] and a short message, and
//! [`error_tree`] folds a list of violations into an Error Tree. Only
//! compiling the schema itself can fail ([`SchemaBuildError`]).
//!
//! ## Schema Resolution
//!
//! Extra schema documents are registered by name (typically a filename such
//! as `address.schema.json`) and by their own `$id`. A `$ref` is resolved
//! by exact URI first, then by the last URI segment. Anything unresolved
//! becomes the permissive empty schema, so validation never performs I/O.

use std::collections::HashMap;
use std::fmt;

use jsonschema::{Retrieve, Uri, Validator};
use serde_json::{Map, Value};
use thiserror::Error;

use vrec_core::{tree, Path, Segment};

use crate::message;

/// A structural check over a whole record.
///
/// Implementations must collect every failure; they never stop at the
/// first one and never fail outright.
pub trait SchemaCheck: Send + Sync {
    /// All violations of `instance`, in the order they were found.
    fn check(&self, instance: &Value) -> Vec<Violation>;
}

/// One structural failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Location of the failing field inside the checked instance.
    pub path: Path,
    /// Short message without the field name, e.g. `must be a string`.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A schema could not be turned into a validator.
#[derive(Error, Debug)]
pub enum SchemaBuildError {
    /// The schema document could not be parsed.
    #[error("schema parse error: {reason}")]
    Parse {
        /// Parser message.
        reason: String,
    },

    /// The schema parsed but is not a valid JSON Schema.
    #[error("validator build error: {reason}")]
    Invalid {
        /// Compiler message.
        reason: String,
    },
}

/// Resolves `$ref` URIs against in-memory documents.
struct LocalSchemaRetriever {
    documents: HashMap<String, Value>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri = uri.as_str();
        if let Some(value) = self.documents.get(uri) {
            return Ok(value.clone());
        }
        let name = uri.rsplit('/').next().unwrap_or(uri);
        Ok(self
            .documents
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())))
    }
}

/// A compiled JSON Schema.
pub struct JsonSchema {
    validator: Validator,
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema").finish_non_exhaustive()
    }
}

impl JsonSchema {
    /// Compile `schema` with no extra documents.
    pub fn new(schema: &Value) -> Result<Self, SchemaBuildError> {
        Self::with_resources(schema, std::iter::empty())
    }

    /// Compile `schema`, registering `resources` (name, document) for
    /// cross-schema `$ref` resolution.
    pub fn with_resources(
        schema: &Value,
        resources: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<Self, SchemaBuildError> {
        let mut documents = HashMap::new();
        for (name, document) in resources {
            if let Some(id) = document.get("$id").and_then(Value::as_str) {
                documents.insert(id.to_string(), document.clone());
            }
            documents.insert(name, document);
        }

        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        opts.with_retriever(LocalSchemaRetriever { documents });
        let validator = opts.build(schema).map_err(|e| SchemaBuildError::Invalid {
            reason: e.to_string(),
        })?;
        Ok(Self { validator })
    }

    /// Compile a schema written as YAML.
    pub fn from_yaml_str(source: &str) -> Result<Self, SchemaBuildError> {
        let schema: Value = serde_yaml::from_str(source).map_err(|e| SchemaBuildError::Parse {
            reason: e.to_string(),
        })?;
        Self::new(&schema)
    }
}

impl SchemaCheck for JsonSchema {
    fn check(&self, instance: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        for error in self.validator.iter_errors(instance) {
            let at = pointer_to_path(instance, &error.instance_path.to_string());
            for (child, text) in message::render(&error) {
                let path = match child {
                    Some(key) => at.child(Segment::Key(key)),
                    None => at.clone(),
                };
                violations.push(Violation {
                    path,
                    message: text,
                });
            }
        }
        violations
    }
}

/// Convert a JSON Pointer into a [`Path`], using `instance` to tell array
/// indices from object keys.
fn pointer_to_path(instance: &Value, pointer: &str) -> Path {
    let mut path = Path::root();
    let mut node = Some(instance);
    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        let segment = match node {
            Some(Value::Array(_)) => match token.parse::<usize>() {
                Ok(i) => Segment::Index(i),
                Err(_) => Segment::Key(token),
            },
            _ => Segment::Key(token),
        };
        node = node.and_then(|n| tree::get(n, &Path::root().child(segment.clone())));
        path.push(segment);
    }
    path
}

/// Fold violations into an Error Tree (an object).
///
/// The first violation reported for a path wins. A violation is also
/// dropped when an ancestor path already holds a message, when it sits at
/// the root (which has no field to attach to), or when its array index is
/// too large to write.
pub fn error_tree(violations: &[Violation]) -> Value {
    let mut errors = Value::Object(Map::new());
    for violation in violations {
        if violation.path.is_root() || occupied(&errors, &violation.path) {
            continue;
        }
        let _ = tree::set(
            &mut errors,
            &violation.path,
            Value::String(violation.message.clone()),
        );
    }
    errors
}

fn occupied(errors: &Value, path: &Path) -> bool {
    let mut node = errors;
    for segment in path.segments() {
        let next = match node {
            Value::Object(map) => map.get(&segment.object_key()),
            Value::Array(items) => segment.array_index().and_then(|i| items.get(i)),
            Value::Null => return false,
            _ => return true,
        };
        match next {
            Some(next) => node = next,
            None => return false,
        }
    }
    !node.is_null()
}
