//! Parameterized measure prototypes and instances.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use crate::aggregate::{Aggregator, AggregatorKind};
use crate::constants::DEFAULT_AT_PARAM;
use crate::error::{ParseError, ValidationError};
use crate::frame::Frame;
use crate::param::ParamInfo;
use crate::registry::MeasureRegistry;
use crate::value::Value;

/// Closure computing `(query_id, value)` pairs from qrels and run frames.
pub type RuntimeFn = dyn Fn(&Frame, &Frame) -> Vec<(String, f64)> + Send + Sync;

/// Implementation attached to a measure defined at runtime.
#[derive(Clone)]
pub struct RuntimeHook {
    implementation: Arc<RuntimeFn>,
    run_inputs: Vec<String>,
    qrel_inputs: Vec<String>,
}

impl RuntimeHook {
    /// Creates a hook from a closure and the columns it reads.
    #[must_use]
    pub fn new(
        implementation: Arc<RuntimeFn>,
        run_inputs: Vec<String>,
        qrel_inputs: Vec<String>,
    ) -> Self {
        Self {
            implementation,
            run_inputs,
            qrel_inputs,
        }
    }

    /// Invokes the closure.
    #[must_use]
    pub fn call(&self, qrels: &Frame, run: &Frame) -> Vec<(String, f64)> {
        (self.implementation)(qrels, run)
    }

    /// Returns the run columns the closure reads.
    #[must_use]
    pub fn run_inputs(&self) -> &[String] {
        &self.run_inputs
    }

    /// Returns the qrels columns the closure reads.
    #[must_use]
    pub fn qrel_inputs(&self) -> &[String] {
        &self.qrel_inputs
    }
}

impl fmt::Debug for RuntimeHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHook")
            .field("run_inputs", &self.run_inputs)
            .field("qrel_inputs", &self.qrel_inputs)
            .finish_non_exhaustive()
    }
}

/// The immutable definition of a measure type.
///
/// Definitions are created once and shared by every instance derived from
/// them. Use [`MeasureDef::into_measure`] to obtain the unparameterized
/// prototype.
#[derive(Debug, Clone)]
pub struct MeasureDef {
    name: String,
    at_param: &'static str,
    params: Vec<(&'static str, ParamInfo)>,
    default_value: f64,
    aggregator: AggregatorKind,
    pretty_name: Option<String>,
    short_desc: Option<String>,
    runtime: Option<RuntimeHook>,
}

impl MeasureDef {
    /// Creates a definition with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            at_param: DEFAULT_AT_PARAM,
            params: Vec::new(),
            default_value: 0.0,
            aggregator: AggregatorKind::default(),
            pretty_name: None,
            short_desc: None,
            runtime: None,
        }
    }

    /// Declares a parameter. Declaration order fixes canonical rendering order.
    #[must_use]
    pub fn with_param(mut self, name: &'static str, info: ParamInfo) -> Self {
        self.params.retain(|(n, _)| *n != name);
        self.params.push((name, info));
        self
    }

    /// Sets which parameter `@` binds.
    #[must_use]
    pub const fn with_at_param(mut self, at_param: &'static str) -> Self {
        self.at_param = at_param;
        self
    }

    /// Sets the value synthesized for queries with no result.
    #[must_use]
    pub const fn with_default_value(mut self, value: f64) -> Self {
        self.default_value = value;
        self
    }

    /// Sets the aggregator.
    #[must_use]
    pub const fn with_aggregator(mut self, aggregator: AggregatorKind) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_pretty_name(mut self, pretty_name: impl Into<String>) -> Self {
        self.pretty_name = Some(pretty_name.into());
        self
    }

    /// Sets the one-line description.
    #[must_use]
    pub fn with_short_desc(mut self, short_desc: impl Into<String>) -> Self {
        self.short_desc = Some(short_desc.into());
        self
    }

    /// Attaches a runtime implementation.
    #[must_use]
    pub fn with_runtime(mut self, hook: RuntimeHook) -> Self {
        self.runtime = Some(hook);
        self
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter bound by `@`.
    #[must_use]
    pub const fn at_param(&self) -> &'static str {
        self.at_param
    }

    /// Returns the declared parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[(&'static str, ParamInfo)] {
        &self.params
    }

    /// Looks up a declared parameter.
    #[must_use]
    pub fn param_info(&self, name: &str) -> Option<&ParamInfo> {
        self.params.iter().find(|(n, _)| *n == name).map(|(_, info)| info)
    }

    /// Returns the display name, if set.
    #[must_use]
    pub fn pretty_name(&self) -> Option<&str> {
        self.pretty_name.as_deref()
    }

    /// Returns the description, if set.
    #[must_use]
    pub fn short_desc(&self) -> Option<&str> {
        self.short_desc.as_deref()
    }

    /// Returns the runtime implementation, if any.
    #[must_use]
    pub const fn runtime(&self) -> Option<&RuntimeHook> {
        self.runtime.as_ref()
    }

    /// Freezes the definition and returns its unparameterized prototype.
    #[must_use]
    pub fn into_measure(self) -> Measure {
        Measure::from_def(Arc::new(self))
    }
}

/// A measure type with zero or more bound parameters.
///
/// Identity is the canonical string: name, then non-default parameters in
/// declaration order, then `@value` for the at-parameter. Two instances
/// with the same canonical string compare equal and hash equally, even if
/// they were built independently.
///
/// # Examples
///
/// ```
/// use ir_eval::measures;
///
/// let p10 = measures::precision().at(10);
/// assert_eq!(p10.to_string(), "P@10");
///
/// let strict = measures::precision().rel(2).at(10);
/// assert_eq!(strict.to_string(), "P(rel=2)@10");
///
/// // Binding a parameter to its default does not change identity
/// assert_eq!(measures::precision().rel(1).at(10), p10);
///
/// // Round-trips through the parser
/// let parsed: ir_eval::Measure = "P(rel=2)@10".parse().unwrap();
/// assert_eq!(parsed, strict);
/// ```
#[derive(Clone)]
pub struct Measure {
    def: Arc<MeasureDef>,
    params: BTreeMap<String, Value>,
    canonical: String,
}

impl Measure {
    /// Creates the unparameterized prototype of a definition.
    #[must_use]
    pub fn from_def(def: Arc<MeasureDef>) -> Self {
        Self::with_bindings(def, BTreeMap::new())
    }

    fn with_bindings(def: Arc<MeasureDef>, params: BTreeMap<String, Value>) -> Self {
        let canonical = Self::render(&def, &params);
        Self {
            def,
            params,
            canonical,
        }
    }

    fn render(def: &MeasureDef, params: &BTreeMap<String, Value>) -> String {
        let mut rendered = Vec::new();
        for (name, info) in &def.params {
            if *name == def.at_param {
                continue;
            }
            if let Some(value) = params.get(*name) {
                if info.default_value() != Some(value) {
                    rendered.push(format!("{name}={value}"));
                }
            }
        }
        // Undeclared bindings fail validation but still need a stable identity
        for (name, value) in params {
            if name != def.at_param && def.param_info(name).is_none() {
                rendered.push(format!("{name}={value}"));
            }
        }

        let mut result = def.name.clone();
        if !rendered.is_empty() {
            result.push('(');
            result.push_str(&rendered.join(","));
            result.push(')');
        }
        if let Some(at) = params.get(def.at_param) {
            result.push('@');
            result.push_str(&at.to_string());
        }
        result
    }

    /// Returns a new instance with one parameter bound.
    ///
    /// Binding the same parameter again keeps the last value.
    #[must_use]
    pub fn with_param(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut params = self.params.clone();
        params.insert(name.into(), value.into());
        Self::with_bindings(Arc::clone(&self.def), params)
    }

    /// Returns a new instance with several parameters bound, later ones winning.
    #[must_use]
    pub fn with_params<I, K, V>(&self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut params = self.params.clone();
        for (name, value) in bindings {
            params.insert(name.into(), value.into());
        }
        Self::with_bindings(Arc::clone(&self.def), params)
    }

    /// Binds the at-parameter (`Measure@value`).
    #[must_use]
    pub fn at(&self, value: impl Into<Value>) -> Self {
        self.with_param(self.def.at_param, value)
    }

    /// Binds `cutoff`.
    #[must_use]
    pub fn cutoff(&self, cutoff: i64) -> Self {
        self.with_param("cutoff", cutoff)
    }

    /// Binds `rel`, the minimum relevance treated as relevant.
    #[must_use]
    pub fn rel(&self, rel: i64) -> Self {
        self.with_param("rel", rel)
    }

    /// Binds `judged_only`.
    #[must_use]
    pub fn judged_only(&self, judged_only: bool) -> Self {
        self.with_param("judged_only", judged_only)
    }

    /// Binds `dcg`, the DCG formulation.
    #[must_use]
    pub fn dcg(&self, dcg: &str) -> Self {
        self.with_param("dcg", dcg)
    }

    /// Binds `gains`, a custom relevance-to-gain mapping.
    #[must_use]
    pub fn gains(&self, gains: BTreeMap<i64, i64>) -> Self {
        self.with_param("gains", gains)
    }

    /// Binds `recall`.
    #[must_use]
    pub fn recall(&self, recall: f64) -> Self {
        self.with_param("recall", recall)
    }

    /// Returns the effective value of a parameter: bound, else declared default.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name).or_else(|| {
            self.def
                .param_info(name)
                .and_then(ParamInfo::default_value)
        })
    }

    /// Returns the effective integer value of a parameter.
    #[must_use]
    pub fn int_param(&self, name: &str) -> Option<i64> {
        self.param(name).and_then(Value::as_int)
    }

    /// Returns the effective float value of a numeric parameter.
    #[must_use]
    pub fn float_param(&self, name: &str) -> Option<f64> {
        self.param(name).and_then(Value::as_float)
    }

    /// Returns the effective boolean value of a parameter.
    #[must_use]
    pub fn bool_param(&self, name: &str) -> Option<bool> {
        self.param(name).and_then(Value::as_bool)
    }

    /// Returns the effective string value of a parameter.
    #[must_use]
    pub fn str_param(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(Value::as_str)
    }

    /// Returns only the explicitly bound parameters.
    pub fn bound_params(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Checks bound parameters against the definition.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if a bound parameter is not declared, a
    /// value has the wrong type or is not among the declared choices, or a
    /// required parameter is missing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let unknown: Vec<String> = self
            .params
            .keys()
            .filter(|k| self.def.param_info(k).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownParams {
                measure: self.canonical.clone(),
                params: unknown,
            });
        }

        for (name, info) in &self.def.params {
            let value = self.params.get(*name);
            if let Err(reason) = info.validate(value) {
                return Err(match value {
                    None => ValidationError::MissingParam {
                        measure: self.canonical.clone(),
                        param: (*name).to_string(),
                    },
                    Some(value) => ValidationError::InvalidParam {
                        measure: self.canonical.clone(),
                        param: (*name).to_string(),
                        value: value.to_string(),
                        reason,
                    },
                });
            }
        }
        Ok(())
    }

    /// Returns the measure type's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Returns the canonical string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Returns the shared definition.
    #[must_use]
    pub fn def(&self) -> &MeasureDef {
        &self.def
    }

    /// Returns the value synthesized when a query has no result.
    #[must_use]
    pub fn default_value(&self) -> f64 {
        self.def.default_value
    }

    /// Creates a fresh aggregator for this measure.
    #[must_use]
    pub fn aggregator(&self) -> Aggregator {
        self.def.aggregator.build()
    }

    /// Returns the runtime implementation, if this measure was defined at runtime.
    #[must_use]
    pub fn runtime(&self) -> Option<&RuntimeHook> {
        self.def.runtime()
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl fmt::Debug for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Measure({})", self.canonical)
    }
}

impl PartialEq for Measure {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Measure {}

impl Hash for Measure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for Measure {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Measure {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl FromStr for Measure {
    type Err = ParseError;

    /// Parses against the built-in catalogue.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MeasureRegistry::builtin().parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Measure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.canonical)
    }
}
