//! Name-to-prototype lookup and expression resolution.

use std::collections::BTreeMap;

use crate::error::{ParseError, ParseErrorKind, ValidationError};
use crate::measure::Measure;
use crate::measures;
use crate::parser::parse_expr;
use crate::value::Value;

/// Maps measure names and aliases to prototypes.
///
/// A registry is an ordinary value: build one with [`MeasureRegistry::builtin`]
/// and extend it with [`register`](Self::register) for measures defined by
/// the caller. Nothing is shared between registries.
///
/// # Examples
///
/// ```
/// use ir_eval::{measures, MeasureRegistry};
///
/// let registry = MeasureRegistry::builtin();
/// let m = registry.parse("P(rel=2)@10").unwrap();
/// assert_eq!(m, measures::precision().rel(2).at(10));
///
/// // `@` overrides an in-parens value of the at-parameter
/// let m = registry.parse("nDCG(dcg='exp-log2', cutoff=20)@10").unwrap();
/// assert_eq!(m, measures::ndcg().dcg("exp-log2").at(10));
///
/// // Aliases resolve to the same prototype
/// assert_eq!(registry.parse("MAP").unwrap(), measures::average_precision());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MeasureRegistry {
    by_name: BTreeMap<String, Measure>,
}

impl MeasureRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry containing the built-in catalogue and its aliases.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (measure, names) in measures::builtin() {
            for name in names {
                registry.register_alias(*name, measure.clone());
            }
        }
        registry
    }

    /// Registers a measure under its own name, returning any prototype it replaced.
    pub fn register(&mut self, measure: Measure) -> Option<Measure> {
        let name = measure.name().to_string();
        self.by_name.insert(name, measure)
    }

    /// Registers a measure under an additional name.
    ///
    /// The measure may carry bound parameters, as `NumRelRet` = `NumRet(rel=1)`.
    pub fn register_alias(&mut self, alias: impl Into<String>, measure: Measure) -> Option<Measure> {
        self.by_name.insert(alias.into(), measure)
    }

    /// Looks up a prototype by name or alias.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Measure> {
        self.by_name.get(name)
    }

    /// Returns true if a name or alias is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Returns registered names and aliases in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Returns the number of registered names and aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Parses a measure expression such as `nDCG(dcg="exp-log2")@10`.
    ///
    /// Integer literals are widened for float-typed parameters, so `IPrec@1`
    /// binds `recall=1.0`. Prototype expressions that omit a required
    /// parameter (for example a bare `P`) are accepted.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the expression is empty or malformed, names
    /// an unregistered measure, or binds an undeclared or ill-typed parameter.
    pub fn parse(&self, input: &str) -> Result<Measure, ParseError> {
        let expr = parse_expr(input)?;
        let Some(prototype) = self.by_name.get(&expr.name) else {
            return Err(ParseError {
                input: input.to_string(),
                kind: ParseErrorKind::NameNotFound { name: expr.name },
            });
        };

        let def = prototype.def();
        let coerce = |name: &str, value: Value| match def.param_info(name) {
            Some(info) => value.coerce_to(info.dtype()),
            None => value,
        };

        let mut bindings: Vec<(String, Value)> = expr
            .params
            .into_iter()
            .map(|(name, value)| {
                let value = coerce(&name, value);
                (name, value)
            })
            .collect();
        if let Some(at) = expr.at {
            let at_param = def.at_param();
            bindings.push((at_param.to_string(), coerce(at_param, at)));
        }

        let measure = prototype.with_params(bindings);
        match measure.validate() {
            Ok(()) | Err(ValidationError::MissingParam { .. }) => Ok(measure),
            Err(e) => Err(ParseError {
                input: input.to_string(),
                kind: ParseErrorKind::Invalid(e),
            }),
        }
    }

    /// Parses many expressions, reporting each failure without aborting the batch.
    #[must_use]
    pub fn parse_all<I, S>(&self, inputs: I) -> Vec<Result<Measure, ParseError>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        inputs
            .into_iter()
            .map(|input| self.parse(input.as_ref()))
            .collect()
    }
}
