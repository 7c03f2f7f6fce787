//! The programmatic evaluation surface.

use std::collections::BTreeMap;

use ir_eval::{Measure, Metric, QrelsConverter, RunConverter};

use crate::{
    DispatchPlan, Evaluator, FallbackProvider, JudgedProvider, NativeProvider, Provider,
    ProviderError, RuntimeProvider, TrecEvalProvider,
};

/// One entry of a measure request: a single measure or a group of them.
///
/// Requests are flattened in order before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeasureRequest {
    /// A single measure.
    Single(Measure),
    /// Several measures requested together.
    Group(Vec<Measure>),
}

impl From<Measure> for MeasureRequest {
    fn from(measure: Measure) -> Self {
        Self::Single(measure)
    }
}

impl From<&Measure> for MeasureRequest {
    fn from(measure: &Measure) -> Self {
        Self::Single(measure.clone())
    }
}

impl From<Vec<Measure>> for MeasureRequest {
    fn from(measures: Vec<Measure>) -> Self {
        Self::Group(measures)
    }
}

impl From<&[Measure]> for MeasureRequest {
    fn from(measures: &[Measure]) -> Self {
        Self::Group(measures.to_vec())
    }
}

fn flatten<I, R>(requests: I) -> Vec<Measure>
where
    I: IntoIterator<Item = R>,
    R: Into<MeasureRequest>,
{
    let mut measures = Vec::new();
    for request in requests {
        match request.into() {
            MeasureRequest::Single(measure) => measures.push(measure),
            MeasureRequest::Group(group) => measures.extend(group),
        }
    }
    measures
}

/// Per-query rows and their aggregate, from a single evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    /// Aggregate value per measure.
    pub aggregated: BTreeMap<Measure, f64>,
    /// Every per-query row, backfilled.
    pub per_query: Vec<Metric>,
}

/// Evaluates measures against qrels and runs through a priority-ordered
/// list of providers.
///
/// # Examples
///
/// ```
/// use ir_eval::{measures, Qrel, ScoredDoc};
/// use ir_eval_providers::Pipeline;
///
/// let qrels = vec![
///     Qrel::new("Q0", "D0", 0),
///     Qrel::new("Q0", "D1", 1),
///     Qrel::new("Q0", "D2", 1),
///     Qrel::new("Q0", "D3", 2),
///     Qrel::new("Q0", "D4", 0),
/// ];
/// let run = vec![
///     ScoredDoc::new("Q0", "D0", 0.8),
///     ScoredDoc::new("Q0", "D2", 0.7),
///     ScoredDoc::new("Q0", "D1", 0.3),
///     ScoredDoc::new("Q0", "D3", 0.4),
///     ScoredDoc::new("Q0", "D4", 0.1),
/// ];
///
/// let pipeline = Pipeline::default();
/// let p5 = measures::precision().rel(1).at(5);
/// let result = pipeline.calc_aggregate([&p5], qrels, run).unwrap();
/// assert!((result[&p5] - 0.6).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct Pipeline {
    fallback: FallbackProvider,
}

impl Pipeline {
    /// Creates a pipeline over `providers`, highest priority first.
    #[must_use]
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Self {
        Self {
            fallback: FallbackProvider::new(providers),
        }
    }

    /// Returns the underlying dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &FallbackProvider {
        &self.fallback
    }

    /// Returns whether some available provider can compute `measure`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Validation` if the measure is invalid.
    pub fn supports(&self, measure: &Measure) -> Result<bool, ProviderError> {
        Ok(self.fallback.supports(measure)?)
    }

    /// Returns which provider each requested measure would be sent to.
    ///
    /// # Errors
    ///
    /// Fails as [`FallbackProvider::plan`] does.
    pub fn plan<I, R>(&self, measures: I) -> Result<DispatchPlan, ProviderError>
    where
        I: IntoIterator<Item = R>,
        R: Into<MeasureRequest>,
    {
        self.fallback.plan(&flatten(measures))
    }

    /// Binds measures to qrels, for evaluating many runs against the same
    /// judgments.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unsupported` before any provider is invoked
    /// if a measure cannot be assigned, or any error a provider raises
    /// while reading the qrels.
    pub fn bind<I, R>(
        &self,
        measures: I,
        qrels: impl Into<QrelsConverter>,
    ) -> Result<Box<dyn Evaluator>, ProviderError>
    where
        I: IntoIterator<Item = R>,
        R: Into<MeasureRequest>,
    {
        self.fallback.evaluator(flatten(measures), qrels.into())
    }

    /// Computes one row per measure and query, including backfilled defaults,
    /// and collects them.
    ///
    /// The rows are gathered eagerly. For lazy iteration, [`bind`](Self::bind)
    /// the measures and call [`Evaluator::iter_calc`], which streams provider
    /// output and backfills once the providers are exhausted.
    ///
    /// # Errors
    ///
    /// Fails as [`bind`](Self::bind) does, or if a provider cannot read the run.
    pub fn iter_calc<I, R>(
        &self,
        measures: I,
        qrels: impl Into<QrelsConverter>,
        run: impl Into<RunConverter>,
    ) -> Result<Vec<Metric>, ProviderError>
    where
        I: IntoIterator<Item = R>,
        R: Into<MeasureRequest>,
    {
        let evaluator = self.bind(measures, qrels)?;
        let rows = evaluator.iter_calc(run.into())?.collect();
        Ok(rows)
    }

    /// Aggregates each measure over its per-query rows.
    ///
    /// # Errors
    ///
    /// Fails as [`iter_calc`](Self::iter_calc) does.
    pub fn calc_aggregate<I, R>(
        &self,
        measures: I,
        qrels: impl Into<QrelsConverter>,
        run: impl Into<RunConverter>,
    ) -> Result<BTreeMap<Measure, f64>, ProviderError>
    where
        I: IntoIterator<Item = R>,
        R: Into<MeasureRequest>,
    {
        self.bind(measures, qrels)?.calc_aggregate(run.into())
    }

    /// Computes the per-query rows and their aggregate in one pass.
    ///
    /// # Errors
    ///
    /// Fails as [`iter_calc`](Self::iter_calc) does.
    pub fn calc<I, R>(
        &self,
        measures: I,
        qrels: impl Into<QrelsConverter>,
        run: impl Into<RunConverter>,
    ) -> Result<Calculation, ProviderError>
    where
        I: IntoIterator<Item = R>,
        R: Into<MeasureRequest>,
    {
        let evaluator = self.bind(measures, qrels)?;
        let mut aggregators: BTreeMap<Measure, _> = evaluator
            .measures()
            .iter()
            .map(|m| (m.clone(), m.aggregator()))
            .collect();
        let mut per_query = Vec::new();
        for metric in evaluator.iter_calc(run.into())? {
            if let Some(aggregator) = aggregators.get_mut(&metric.measure) {
                aggregator.add(metric.value);
            }
            per_query.push(metric);
        }
        let aggregated = aggregators
            .into_iter()
            .map(|(measure, aggregator)| (measure, aggregator.result()))
            .collect();
        Ok(Calculation {
            aggregated,
            per_query,
        })
    }

    /// Returns the run columns the assigned providers read for `measures`.
    ///
    /// # Errors
    ///
    /// Fails as [`plan`](Self::plan) does.
    pub fn run_inputs<I, R>(&self, measures: I) -> Result<Vec<String>, ProviderError>
    where
        I: IntoIterator<Item = R>,
        R: Into<MeasureRequest>,
    {
        self.fallback
            .assigned_inputs(&flatten(measures), |p, m| p.run_inputs(m))
    }

    /// Returns the qrels columns the assigned providers read for `measures`.
    ///
    /// # Errors
    ///
    /// Fails as [`plan`](Self::plan) does.
    pub fn qrel_inputs<I, R>(&self, measures: I) -> Result<Vec<String>, ProviderError>
    where
        I: IntoIterator<Item = R>,
        R: Into<MeasureRequest>,
    {
        self.fallback
            .assigned_inputs(&flatten(measures), |p, m| p.qrel_inputs(m))
    }
}

impl Default for Pipeline {
    /// Native, judged, runtime, then `trec_eval` (located via
    /// `IR_EVAL_TREC_EVAL` or `PATH`).
    fn default() -> Self {
        Self::new(vec![
            Box::new(NativeProvider::new()),
            Box::new(JudgedProvider::new()),
            Box::new(RuntimeProvider::new()),
            Box::new(TrecEvalProvider::from_env()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefineOptions;
    use ir_eval::{Frame, Qrel, ScoredDoc, measures};

    fn pipeline() -> Pipeline {
        Pipeline::new(vec![
            Box::new(NativeProvider::new()),
            Box::new(JudgedProvider::new()),
            Box::new(RuntimeProvider::new()),
        ])
    }

    fn qrels() -> Vec<Qrel> {
        vec![
            Qrel::new("Q0", "D0", 0),
            Qrel::new("Q0", "D1", 1),
            Qrel::new("Q0", "D2", 1),
            Qrel::new("Q0", "D3", 2),
            Qrel::new("Q0", "D4", 0),
            Qrel::new("Q1", "D0", 1),
        ]
    }

    fn run() -> Vec<ScoredDoc> {
        vec![
            ScoredDoc::new("Q0", "D0", 0.8),
            ScoredDoc::new("Q0", "D2", 0.7),
            ScoredDoc::new("Q0", "D1", 0.3),
            ScoredDoc::new("Q0", "D3", 0.4),
            ScoredDoc::new("Q0", "D4", 0.1),
        ]
    }

    #[test]
    fn groups_are_flattened_in_order() {
        let p5 = measures::precision().at(5);
        let judged = measures::judged().at(5);
        let flat = flatten(vec![
            MeasureRequest::from(&p5),
            MeasureRequest::from(vec![judged.clone(), p5.clone()]),
        ]);
        assert_eq!(flat, vec![p5.clone(), judged, p5]);
    }

    #[test]
    fn plan_routes_by_priority() {
        let plan = pipeline()
            .plan([measures::precision().at(5), measures::judged().at(5)])
            .unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.provider_for(&measures::judged().at(5)), Some("judged"));
    }

    #[test]
    fn calc_returns_rows_and_aggregate() {
        let p5 = measures::precision().at(5);
        let judged = measures::judged().at(5);
        let calc = pipeline().calc([&p5, &judged], qrels(), run()).unwrap();

        assert_eq!(calc.per_query.len(), 4);
        assert!(calc.per_query.contains(&Metric::new("Q1", judged.clone(), 0.0)));
        assert!((calc.aggregated[&p5] - 0.3).abs() < 1e-9);
        assert!((calc.aggregated[&judged] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn aggregate_matches_calc() {
        let requested = vec![measures::precision().at(5), measures::average_precision()];
        let p = pipeline();
        let aggregated = p.calc_aggregate(requested.clone(), qrels(), run()).unwrap();
        let calc = p.calc(requested, qrels(), run()).unwrap();
        assert_eq!(aggregated, calc.aggregated);
    }

    #[test]
    fn bound_evaluator_is_reusable() {
        let p5 = measures::precision().at(5);
        let evaluator = pipeline().bind([&p5], qrels()).unwrap();
        let first = evaluator.calc_aggregate(run().into()).unwrap();
        let second = evaluator.calc_aggregate(RunConverter::from(Vec::new())).unwrap();
        assert!((first[&p5] - 0.3).abs() < 1e-9);
        assert_eq!(second[&p5], 0.0);
    }

    #[test]
    fn bound_rows_stream_lazily() {
        let p5 = measures::precision().at(5);
        let judged = measures::judged().at(5);
        let evaluator = pipeline().bind([&p5, &judged], qrels()).unwrap();

        let mut rows = evaluator.iter_calc(run().into()).unwrap();
        let first = rows.next().unwrap();
        assert_eq!(first.query_id, "Q0");
        assert_eq!(rows.count(), 3);

        let eager = pipeline().iter_calc([&p5, &judged], qrels(), run()).unwrap();
        assert_eq!(eager.len(), 4);
    }

    #[test]
    fn unsupported_measure_fails_before_evaluation() {
        let err = pipeline()
            .iter_calc([measures::err().at(10)], qrels(), run())
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("ERR@10"));
    }

    #[test]
    fn inputs_cover_runtime_columns() {
        let clicks = RuntimeProvider::define(
            "Clicks",
            |_q: &Frame, _r: &Frame| Vec::new(),
            DefineOptions::default().with_run_inputs(["query_id", "clicked"]),
        );
        let p = pipeline();
        assert_eq!(
            p.run_inputs([measures::precision().at(5), clicks]).unwrap(),
            ["query_id", "doc_id", "score", "clicked"]
        );
        assert_eq!(
            p.qrel_inputs([measures::precision().at(5)]).unwrap(),
            ["query_id", "doc_id", "relevance"]
        );
        assert!(p.run_inputs([measures::err().at(5)]).is_err());
    }
}
