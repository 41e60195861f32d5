//! # Value Strategies
//!
//! Callbacks hand over new values in different argument positions: some
//! pass the value first, others pass an event first and the value second.
//! A [`ValueStrategy`] names which argument (or which part of it) is the new
//! value. Each record carries its own strategy in its configuration, and a
//! single change call may override it.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use vrec_core::{tree, Path};

type Extractor = Arc<dyn Fn(&[Value]) -> Option<Value> + Send + Sync>;

/// How to derive a new value from a callback's argument list.
#[derive(Clone, Default)]
pub enum ValueStrategy {
    /// The first argument is the value.
    FirstArgument,
    /// The second argument is the value (the first is usually an event).
    #[default]
    SecondArgument,
    /// The third argument is the value.
    ThirdArgument,
    /// The first argument is an event object; the value is its
    /// `target.value`.
    EventTargetValue,
    /// Caller-supplied extraction.
    Custom(Extractor),
}

impl ValueStrategy {
    /// Wrap a closure as a strategy.
    pub fn custom(f: impl Fn(&[Value]) -> Option<Value> + Send + Sync + 'static) -> Self {
        ValueStrategy::Custom(Arc::new(f))
    }

    /// The value this strategy finds in `args`, if any.
    pub fn extract(&self, args: &[Value]) -> Option<Value> {
        match self {
            ValueStrategy::FirstArgument => args.first().cloned(),
            ValueStrategy::SecondArgument => args.get(1).cloned(),
            ValueStrategy::ThirdArgument => args.get(2).cloned(),
            ValueStrategy::EventTargetValue => {
                let target_value = Path::root().key("target").key("value");
                args.first()
                    .and_then(|event| tree::get(event, &target_value))
                    .cloned()
            }
            ValueStrategy::Custom(f) => f(args),
        }
    }
}

impl fmt::Debug for ValueStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueStrategy::FirstArgument => f.write_str("FirstArgument"),
            ValueStrategy::SecondArgument => f.write_str("SecondArgument"),
            ValueStrategy::ThirdArgument => f.write_str("ThirdArgument"),
            ValueStrategy::EventTargetValue => f.write_str("EventTargetValue"),
            ValueStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
