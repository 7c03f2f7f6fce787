//! Declared parameter metadata for measure prototypes.

use crate::value::{ParamType, Value};

/// Declares one named parameter of a measure type.
///
/// A parameter without a default is either required or treated as absent
/// when not bound.
///
/// # Examples
///
/// ```
/// use ir_eval::{ParamInfo, ParamType, Value};
///
/// let dcg = ParamInfo::new(ParamType::Str)
///     .with_choices(["log2", "exp-log2"])
///     .with_default("log2")
///     .with_desc("DCG formulation");
///
/// assert!(dcg.validate(Some(&Value::from("exp-log2"))).is_ok());
/// assert!(dcg.validate(Some(&Value::from("log10"))).is_err());
/// assert!(dcg.validate(None).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    dtype: ParamType,
    required: bool,
    choices: Option<Vec<Value>>,
    default: Option<Value>,
    desc: &'static str,
}

impl ParamInfo {
    /// Creates an optional parameter of the given type with no default.
    #[must_use]
    pub const fn new(dtype: ParamType) -> Self {
        Self {
            dtype,
            required: false,
            choices: None,
            default: None,
            desc: "",
        }
    }

    /// Marks the parameter as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Restricts the parameter to a fixed set of values.
    #[must_use]
    pub fn with_choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the value used when the parameter is not bound.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the human-readable description.
    #[must_use]
    pub const fn with_desc(mut self, desc: &'static str) -> Self {
        self.desc = desc;
        self
    }

    /// Returns the declared type.
    #[must_use]
    pub const fn dtype(&self) -> ParamType {
        self.dtype
    }

    /// Returns true if the parameter must be bound.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the fixed set of legal values, if any.
    #[must_use]
    pub fn choices(&self) -> Option<&[Value]> {
        self.choices.as_deref()
    }

    /// Returns the default value, if declared.
    #[must_use]
    pub const fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns the description.
    #[must_use]
    pub const fn desc(&self) -> &'static str {
        self.desc
    }

    /// Checks a bound value (or its absence) against this declaration.
    ///
    /// # Errors
    ///
    /// Returns a reason string when the value is missing but required, has
    /// the wrong type, is a non-finite float, or is not among the declared
    /// choices.
    pub fn validate(&self, value: Option<&Value>) -> Result<(), String> {
        let Some(value) = value else {
            return if self.required {
                Err("required".to_string())
            } else {
                Ok(())
            };
        };
        if value.param_type() != self.dtype {
            return Err(format!(
                "expected {}, found {}",
                self.dtype,
                value.param_type()
            ));
        }
        if matches!(value, Value::Float(v) if !v.is_finite()) {
            return Err("must be finite".to_string());
        }
        if let Some(choices) = &self.choices {
            if !choices.contains(value) {
                let rendered = choices.iter().map(ToString::to_string).collect::<Vec<_>>();
                return Err(format!("must be one of [{}]", rendered.join(", ")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_param_rejects_absence() {
        let cutoff = ParamInfo::new(ParamType::Int).required();
        assert_eq!(cutoff.validate(None), Err("required".to_string()));
        assert!(cutoff.validate(Some(&Value::Int(10))).is_ok());
    }

    #[test]
    fn type_mismatch_is_reported() {
        let rel = ParamInfo::new(ParamType::Int).with_default(1);
        let err = rel.validate(Some(&Value::Float(1.5))).unwrap_err();
        assert_eq!(err, "expected int, found float");
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let recall = ParamInfo::new(ParamType::Float).required();
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(recall.validate(Some(&Value::Float(v))), Err("must be finite".to_string()));
        }
        assert!(recall.validate(Some(&Value::Float(0.25))).is_ok());
    }

    #[test]
    fn choices_are_enforced() {
        let dcg = ParamInfo::new(ParamType::Str).with_choices(["log2"]);
        let err = dcg.validate(Some(&Value::from("exp-log2"))).unwrap_err();
        assert!(err.contains("one of [\"log2\"]"));
    }

    #[test]
    fn accessors() {
        let info = ParamInfo::new(ParamType::Bool)
            .with_default(false)
            .with_desc("ignore unjudged documents");
        assert_eq!(info.dtype(), ParamType::Bool);
        assert!(!info.is_required());
        assert_eq!(info.default_value(), Some(&Value::Bool(false)));
        assert_eq!(info.desc(), "ignore unjudged documents");
        assert!(info.choices().is_none());
    }
}
