//! Short, field-name-free rendering of schema failures.
//!
//! A failure renders to one or more `(child, message)` pairs. `child` names a
//! property beneath the failing instance when the message belongs there
//! (`required`, `additionalProperties`); otherwise the message belongs to the
//! instance itself.

use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::ValidationError;
use serde_json::Value;

/// A rendered message and, if it belongs to a child property, that
/// property's name.
pub type Rendered = (Option<String>, String);

/// Render one schema failure.
pub fn render(error: &ValidationError<'_>) -> Vec<Rendered> {
    let here = |message: String| vec![(None, message)];
    match &error.kind {
        ValidationErrorKind::Type {
            kind: TypeKind::Single(ty),
            ..
        } => here(must_be(&ty.to_string())),
        ValidationErrorKind::Required { property, .. } => {
            let name = match property {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            vec![(Some(name), "is required".to_string())]
        }
        ValidationErrorKind::AdditionalProperties { unexpected, .. } => unexpected
            .iter()
            .map(|key| (Some(key.clone()), "is not allowed".to_string()))
            .collect(),
        ValidationErrorKind::MinItems { limit, .. } => {
            here(format!("must contain at least {limit} items"))
        }
        ValidationErrorKind::MaxItems { limit, .. } => {
            here(format!("must contain at most {limit} items"))
        }
        ValidationErrorKind::MinLength { limit, .. } => {
            here(format!("length must be at least {limit} characters long"))
        }
        ValidationErrorKind::MaxLength { limit, .. } => here(format!(
            "length must be less than or equal to {limit} characters long"
        )),
        ValidationErrorKind::Minimum { limit, .. } => {
            here(format!("must be greater than or equal to {limit}"))
        }
        ValidationErrorKind::Maximum { limit, .. } => {
            here(format!("must be less than or equal to {limit}"))
        }
        ValidationErrorKind::ExclusiveMinimum { limit, .. } => {
            here(format!("must be greater than {limit}"))
        }
        ValidationErrorKind::ExclusiveMaximum { limit, .. } => {
            here(format!("must be less than {limit}"))
        }
        ValidationErrorKind::Pattern { pattern, .. } => {
            here(format!("fails to match the required pattern: {pattern}"))
        }
        ValidationErrorKind::Enum { options, .. } => {
            here(format!("must be one of {options}"))
        }
        ValidationErrorKind::Format { format, .. } => {
            here(format!("must be a valid {format}"))
        }
        _ => here(strip_field_name(&error.to_string()).to_string()),
    }
}

/// `must be a string`, `must be an object`, `must be null`.
fn must_be(type_name: &str) -> String {
    match type_name {
        "null" => "must be null".to_string(),
        name if name.starts_with(['a', 'e', 'i', 'o', 'u']) => format!("must be an {name}"),
        name => format!("must be a {name}"),
    }
}

/// Drop a leading double-quoted field name from a library message.
///
/// `"username" is a required property` becomes `is a required property`.
/// Messages without a leading quoted token are returned unchanged.
pub fn strip_field_name(message: &str) -> &str {
    let Some(rest) = message.strip_prefix('"') else {
        return message;
    };
    match rest.find('"') {
        Some(end) => rest[end + 1..].trim_start(),
        None => message,
    }
}
