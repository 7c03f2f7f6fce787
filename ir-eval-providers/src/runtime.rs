//! Measures defined at runtime from closures.
//!
//! [`RuntimeProvider::define`] and [`RuntimeProvider::define_by_query`]
//! return ordinary [`Measure`] values carrying their implementation. Nothing
//! is registered globally: the provider supports any measure that carries
//! one.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;

use ir_eval::{
    Frame, Measure, MeasureDef, Metric, ParamInfo, ParamType, QrelsConverter, RunConverter,
    RuntimeHook, ValidationError, Value,
};

use crate::{
    Availability, DefineOptions, Evaluator, Provider, ProviderError, RawMetrics, SupportedMeasure,
};

const QUERY_ID: &str = "query_id";

/// Supports measures created by [`define`](Self::define) and
/// [`define_by_query`](Self::define_by_query).
///
/// Before a measure's implementation runs, the run is sorted by query id
/// ascending then score descending, and truncated to the top `cutoff`
/// documents per query when the measure has one.
///
/// # Examples
///
/// ```
/// use ir_eval::{Frame, Qrel, QrelsConverter, RunConverter, ScoredDoc};
/// use ir_eval_providers::{DefineOptions, Evaluator, Provider, RuntimeProvider};
///
/// // Number of documents retrieved per query
/// let depth = RuntimeProvider::define_by_query(
///     "Depth",
///     |_qrels: &Frame, run: &Frame| run.len() as f64,
///     DefineOptions::default(),
/// );
///
/// let evaluator = RuntimeProvider::new()
///     .evaluator(vec![depth.at(2)], QrelsConverter::from(vec![Qrel::new("q1", "d1", 1)]))
///     .unwrap();
/// let run = RunConverter::from(vec![
///     ScoredDoc::new("q1", "d1", 0.9),
///     ScoredDoc::new("q1", "d2", 0.8),
///     ScoredDoc::new("q1", "d3", 0.7),
/// ]);
/// let rows: Vec<_> = evaluator.iter_calc(run).unwrap().collect();
/// assert_eq!(rows[0].value, 2.0);
/// ```
#[derive(Debug, Default)]
pub struct RuntimeProvider {
    availability: Availability,
}

impl RuntimeProvider {
    /// Creates the provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a measure from a closure that sees all queries at once.
    ///
    /// The closure receives the qrels and run frames and returns
    /// `(query_id, value)` pairs.
    #[must_use]
    pub fn define<F>(name: impl Into<String>, implementation: F, options: DefineOptions) -> Measure
    where
        F: Fn(&Frame, &Frame) -> Vec<(String, f64)> + Send + Sync + 'static,
    {
        let hook = RuntimeHook::new(
            Arc::new(implementation),
            options.run_inputs,
            options.qrel_inputs,
        );
        let mut def = MeasureDef::new(name).with_runtime(hook);
        if options.support_cutoff {
            def = def.with_param(
                "cutoff",
                ParamInfo::new(ParamType::Int).with_desc("ranking cutoff threshold"),
            );
        }
        if let Some(pretty_name) = options.pretty_name {
            def = def.with_pretty_name(pretty_name);
        }
        if let Some(short_desc) = options.short_desc {
            def = def.with_short_desc(short_desc);
        }
        def.into_measure()
    }

    /// Defines a measure from a closure called once per query in the run.
    ///
    /// The closure receives that query's qrels (possibly empty) and run
    /// rows and returns its value.
    #[must_use]
    pub fn define_by_query<F>(
        name: impl Into<String>,
        implementation: F,
        options: DefineOptions,
    ) -> Measure
    where
        F: Fn(&Frame, &Frame) -> f64 + Send + Sync + 'static,
    {
        let per_query = move |qrels: &Frame, run: &Frame| {
            let qrels_by_query = qrels.group_by(QUERY_ID);
            let no_qrels = Frame::new(qrels.columns().iter().cloned());
            run.group_by(QUERY_ID)
                .into_iter()
                .map(|(query_id, run)| {
                    let qrels = qrels_by_query.get(&query_id).unwrap_or(&no_qrels);
                    let value = implementation(qrels, &run);
                    (query_id, value)
                })
                .collect()
        };
        Self::define(name, per_query, options)
    }
}

fn hooked(measure: &Measure) -> Result<&RuntimeHook, ProviderError> {
    measure
        .runtime()
        .ok_or_else(|| ProviderError::unsupported([measure.to_string()], Vec::new()))
}

fn require(
    frame: &Frame,
    columns: &[String],
    measure: &Measure,
    input: &'static str,
) -> Result<(), ProviderError> {
    match columns.iter().find(|c| !frame.has_column(c)) {
        Some(column) => Err(ProviderError::missing_column(
            measure.to_string(),
            input,
            column.clone(),
        )),
        None => Ok(()),
    }
}

fn union(columns: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for column in columns {
        if !out.contains(&column) {
            out.push(column);
        }
    }
    out
}

impl Provider for RuntimeProvider {
    fn name(&self) -> &str {
        "runtime"
    }

    fn supported_measures(&self) -> &[SupportedMeasure] {
        &[]
    }

    fn availability(&self) -> &Availability {
        &self.availability
    }

    fn supports(&self, measure: &Measure) -> Result<bool, ValidationError> {
        measure.validate()?;
        Ok(measure.runtime().is_some())
    }

    fn build_evaluator(
        &self,
        measures: Vec<Measure>,
        mut qrels: QrelsConverter,
    ) -> Result<Box<dyn Evaluator>, ProviderError> {
        let qrels = qrels.as_table()?;
        for measure in &measures {
            require(&qrels, hooked(measure)?.qrel_inputs(), measure, "qrels")?;
        }
        let qrels = Rc::new(qrels.sorted_by(&[(QUERY_ID, false), ("doc_id", false)]));
        let query_ids: BTreeSet<String> = qrels
            .column(QUERY_ID)
            .map(|cells| cells.flatten().map(Value::to_plain_string).collect())
            .unwrap_or_default();
        Ok(Box::new(RuntimeEvaluator {
            measures,
            qrels,
            query_ids,
        }))
    }

    fn run_inputs(&self, measures: &[Measure]) -> Vec<String> {
        union(
            measures
                .iter()
                .filter_map(Measure::runtime)
                .flat_map(|hook| hook.run_inputs().iter().cloned()),
        )
    }

    fn qrel_inputs(&self, measures: &[Measure]) -> Vec<String> {
        union(
            measures
                .iter()
                .filter_map(Measure::runtime)
                .flat_map(|hook| hook.qrel_inputs().iter().cloned()),
        )
    }
}

struct RuntimeEvaluator {
    measures: Vec<Measure>,
    qrels: Rc<Frame>,
    query_ids: BTreeSet<String>,
}

impl Evaluator for RuntimeEvaluator {
    fn measures(&self) -> &[Measure] {
        &self.measures
    }

    fn query_ids(&self) -> &BTreeSet<String> {
        &self.query_ids
    }

    fn iter_raw(&self, mut run: RunConverter) -> Result<RawMetrics<'_>, ProviderError> {
        let run = run.as_table()?;
        let mut hooks = Vec::with_capacity(self.measures.len());
        for measure in &self.measures {
            let hook = hooked(measure)?;
            require(&run, hook.run_inputs(), measure, "run")?;
            hooks.push((measure, hook));
        }
        let run = run.sorted_by(&[(QUERY_ID, false), ("score", true)]);

        Ok(Box::new(hooks.into_iter().flat_map(move |(measure, hook)| {
            let truncated = match measure.int_param("cutoff") {
                Some(k) => {
                    Cow::Owned(run.head_per_group(QUERY_ID, usize::try_from(k).unwrap_or(0)))
                }
                None => Cow::Borrowed(&run),
            };
            hook.call(&self.qrels, &truncated)
                .into_iter()
                .map(|(query_id, value)| Metric::new(query_id, measure.clone(), value))
                .collect::<Vec<_>>()
        })))
    }
}
