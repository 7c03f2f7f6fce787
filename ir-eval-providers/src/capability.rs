//! Supported-measure declarations and the cached availability flag.

use std::fmt;
use std::sync::OnceLock;

use ir_eval::{Measure, ParamPredicate};

/// A measure name plus per-parameter conditions a provider can compute.
///
/// Parameters without a predicate are unconstrained. Predicates see the
/// effective value, so `rel` on a measure that never bound it is checked
/// against its declared default.
///
/// # Examples
///
/// ```
/// use ir_eval::{measures, ParamPredicate};
/// use ir_eval_providers::SupportedMeasure;
///
/// let log2_only = SupportedMeasure::new("nDCG")
///     .with("cutoff", ParamPredicate::Any)
///     .with("dcg", ParamPredicate::one_of(["log2"]));
///
/// assert!(log2_only.matches(&measures::ndcg().at(10)));
/// assert!(!log2_only.matches(&measures::ndcg().dcg("exp-log2").at(10)));
/// assert!(!log2_only.matches(&measures::precision().at(10)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SupportedMeasure {
    name: &'static str,
    predicates: Vec<(&'static str, ParamPredicate)>,
}

impl SupportedMeasure {
    /// Declares support for a measure name with no parameter conditions.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            predicates: Vec::new(),
        }
    }

    /// Adds a condition on one parameter.
    #[must_use]
    pub fn with(mut self, param: &'static str, predicate: ParamPredicate) -> Self {
        self.predicates.push((param, predicate));
        self
    }

    /// Returns the measure name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the parameter conditions.
    #[must_use]
    pub fn predicates(&self) -> &[(&'static str, ParamPredicate)] {
        &self.predicates
    }

    /// Returns true if `measure` has this name and satisfies every condition.
    #[must_use]
    pub fn matches(&self, measure: &Measure) -> bool {
        measure.name() == self.name
            && self
                .predicates
                .iter()
                .all(|(param, predicate)| predicate.validate(measure.param(param)))
    }
}

impl fmt::Display for SupportedMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        if !self.predicates.is_empty() {
            let rendered: Vec<String> = self
                .predicates
                .iter()
                .map(|(param, predicate)| format!("{param}={predicate}"))
                .collect();
            write!(f, "({})", rendered.join(","))?;
        }
        Ok(())
    }
}

/// Whether a provider can run, checked on first use and then remembered.
#[derive(Debug, Default)]
pub struct Availability(OnceLock<bool>);

impl Availability {
    /// Creates an unchecked flag.
    #[must_use]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the cached answer, running `check` if this is the first call.
    pub fn get_or_check(&self, check: impl FnOnce() -> bool) -> bool {
        *self.0.get_or_init(check)
    }

    /// Returns the cached answer without checking.
    #[must_use]
    pub fn get(&self) -> Option<bool> {
        self.0.get().copied()
    }
}
