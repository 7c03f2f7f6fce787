//! Capability predicates used by providers to declare supported parameterizations.

use std::fmt;

use crate::value::Value;

/// A per-parameter condition a provider attaches to a supported measure.
///
/// Predicates see the measure's effective value: the bound value, or the
/// declared default when nothing was bound.
///
/// # Examples
///
/// ```
/// use ir_eval::{ParamPredicate, Value};
///
/// assert!(ParamPredicate::Any.validate(None));
/// assert!(!ParamPredicate::Required.validate(None));
/// assert!(ParamPredicate::one_of(["log2"]).validate(Some(&Value::from("log2"))));
/// assert!(ParamPredicate::Absent.validate(None));
/// assert!(!ParamPredicate::Absent.validate(Some(&Value::Int(10))));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ParamPredicate {
    /// Accepts any value, or no value
    Any,
    /// Accepts any value, but one must be present
    Required,
    /// Accepts only the listed literal values
    OneOf(Vec<Value>),
    /// Accepts only the absence of a value
    Absent,
}

impl ParamPredicate {
    /// Creates a `OneOf` predicate from literal values.
    #[must_use]
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Returns true if the effective parameter value satisfies this predicate.
    #[must_use]
    pub fn validate(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Any => true,
            Self::Required => value.is_some(),
            Self::OneOf(values) => value.is_some_and(|v| values.contains(v)),
            Self::Absent => value.is_none(),
        }
    }
}

impl fmt::Display for ParamPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Required => f.write_str("<required>"),
            Self::OneOf(values) => {
                let rendered = values.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "{{{}}}", rendered.join("|"))
            }
            Self::Absent => f.write_str("<absent>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_of_rejects_absence_and_other_values() {
        let pred = ParamPredicate::one_of([1]);
        assert!(pred.validate(Some(&Value::Int(1))));
        assert!(!pred.validate(Some(&Value::Int(2))));
        assert!(!pred.validate(None));
    }

    #[test]
    fn required_accepts_any_present_value() {
        assert!(ParamPredicate::Required.validate(Some(&Value::from("x"))));
    }

    #[test]
    fn display() {
        assert_eq!(ParamPredicate::Any.to_string(), "*");
        assert_eq!(ParamPredicate::one_of(["log2", "exp-log2"]).to_string(), "{\"log2\"|\"exp-log2\"}");
    }
}
