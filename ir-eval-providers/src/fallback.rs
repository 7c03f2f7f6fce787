//! Priority-ordered dispatch across providers.
//!
//! A [`FallbackProvider`] walks its providers in order and gives each one
//! every still-unassigned measure it supports. Earlier providers always win,
//! even when a later one could compute the same measure. The qrels are
//! teed once per assigned provider, and results from several providers are
//! merged by a composite evaluator that tees each run the same way.

use std::collections::BTreeSet;
use std::fmt;

use ir_eval::{Measure, QrelsConverter, RunConverter, ValidationError};
use tracing::{debug, warn};

use crate::{
    Availability, Candidate, Evaluator, Provider, ProviderError, RawMetrics, SupportedMeasure,
};

/// Measures assigned to one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Position of the provider in the priority list
    pub index: usize,
    /// The provider's name
    pub provider: String,
    /// The measures it will compute, sorted
    pub measures: Vec<Measure>,
}

/// The outcome of partitioning a measure set across providers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchPlan {
    assignments: Vec<Assignment>,
}

impl DispatchPlan {
    /// Returns the assignments in provider priority order.
    #[must_use]
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Returns the name of the provider assigned to `measure`.
    #[must_use]
    pub fn provider_for(&self, measure: &Measure) -> Option<&str> {
        self.assignments
            .iter()
            .find(|a| a.measures.contains(measure))
            .map(|a| a.provider.as_str())
    }

    /// Returns the number of providers involved.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Returns true if no provider is involved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// A provider composed of other providers, in priority order.
///
/// # Examples
///
/// ```
/// use ir_eval::{measures, Qrel, QrelsConverter};
/// use ir_eval_providers::{FallbackProvider, JudgedProvider, NativeProvider, Provider};
///
/// let fallback = FallbackProvider::new(vec![
///     Box::new(NativeProvider::new()),
///     Box::new(JudgedProvider::new()),
/// ]);
///
/// let plan = fallback
///     .plan(&[measures::precision().at(5), measures::judged().at(5)])
///     .unwrap();
/// assert_eq!(plan.provider_for(&measures::precision().at(5)), Some("native"));
/// assert_eq!(plan.provider_for(&measures::judged().at(5)), Some("judged"));
///
/// let err = fallback.plan(&[measures::err().at(10)]).unwrap_err();
/// assert!(err.is_unsupported());
/// ```
pub struct FallbackProvider {
    providers: Vec<Box<dyn Provider>>,
    availability: Availability,
}

impl FallbackProvider {
    /// Creates a dispatcher over `providers`, highest priority first.
    #[must_use]
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Self {
        Self {
            providers,
            availability: Availability::new(),
        }
    }

    /// Returns the providers in priority order.
    #[must_use]
    pub fn providers(&self) -> &[Box<dyn Provider>] {
        &self.providers
    }

    /// Partitions `measures` across the available providers.
    ///
    /// Duplicate measures are assigned once. The result depends only on the
    /// provider order, their availability, and the measure set.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Validation` if a measure is invalid, or
    /// `ProviderError::Unsupported` naming every measure no available
    /// provider supports, along with unavailable providers that would.
    pub fn plan(&self, measures: &[Measure]) -> Result<DispatchPlan, ProviderError> {
        let mut remaining: BTreeSet<Measure> = measures.iter().cloned().collect();
        let mut assignments = Vec::new();
        let mut candidates = Vec::new();

        for (index, provider) in self.providers.iter().enumerate() {
            if remaining.is_empty() {
                break;
            }
            let mut subset = Vec::new();
            for measure in &remaining {
                if provider.supports(measure)? {
                    subset.push(measure.clone());
                }
            }
            if subset.is_empty() {
                continue;
            }
            if !provider.is_available() {
                warn!(
                    provider = provider.name(),
                    measures = %join(&subset),
                    "provider supports requested measures but is not available"
                );
                candidates.push(Candidate {
                    provider: provider.name().to_string(),
                    install: provider.install_instructions(),
                });
                continue;
            }
            for measure in &subset {
                remaining.remove(measure);
            }
            debug!(
                provider = provider.name(),
                measures = %join(&subset),
                "assigned measures"
            );
            assignments.push(Assignment {
                index,
                provider: provider.name().to_string(),
                measures: subset,
            });
        }

        if !remaining.is_empty() {
            return Err(ProviderError::unsupported(
                remaining.iter().map(ToString::to_string),
                candidates,
            ));
        }
        Ok(DispatchPlan { assignments })
    }

    /// Collects the columns each assigned provider reads for its share of
    /// `measures`, in plan order and without repeats.
    ///
    /// `columns` selects which inputs to ask for, typically
    /// [`Provider::run_inputs`] or [`Provider::qrel_inputs`].
    ///
    /// # Errors
    ///
    /// Fails as [`plan`](Self::plan) does.
    pub fn assigned_inputs<F>(
        &self,
        measures: &[Measure],
        columns: F,
    ) -> Result<Vec<String>, ProviderError>
    where
        F: Fn(&dyn Provider, &[Measure]) -> Vec<String>,
    {
        let plan = self.plan(measures)?;
        let mut out: Vec<String> = Vec::new();
        for assignment in plan.assignments() {
            let Some(provider) = self.providers.get(assignment.index) else {
                continue;
            };
            for column in columns(provider.as_ref(), &assignment.measures) {
                if !out.contains(&column) {
                    out.push(column);
                }
            }
        }
        Ok(out)
    }
}

fn join(measures: &[Measure]) -> String {
    measures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        "fallback"
    }

    fn supported_measures(&self) -> &[SupportedMeasure] {
        &[]
    }

    fn availability(&self) -> &Availability {
        &self.availability
    }

    fn supports(&self, measure: &Measure) -> Result<bool, ValidationError> {
        measure.validate()?;
        for provider in &self.providers {
            if provider.supports(measure)? && provider.is_available() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn build_evaluator(
        &self,
        measures: Vec<Measure>,
        mut qrels: QrelsConverter,
    ) -> Result<Box<dyn Evaluator>, ProviderError> {
        let plan = self.plan(&measures)?;
        if plan.is_empty() {
            let query_ids = qrels.query_ids()?;
            return Ok(Box::new(FallbackEvaluator::new(Vec::new(), query_ids, Vec::new())));
        }

        let views = qrels.tee(plan.len());
        let mut children = Vec::with_capacity(plan.len());
        for (assignment, view) in plan.assignments.into_iter().zip(views) {
            let Some(provider) = self.providers.get(assignment.index) else {
                continue;
            };
            children.push(provider.evaluator(assignment.measures, view)?);
        }

        if children.len() == 1 {
            if let Some(only) = children.pop() {
                return Ok(only);
            }
        }
        let query_ids = children
            .iter()
            .flat_map(|c| c.query_ids().iter().cloned())
            .collect();
        let mut ordered = Vec::new();
        for measure in measures {
            if !ordered.contains(&measure) {
                ordered.push(measure);
            }
        }
        Ok(Box::new(FallbackEvaluator::new(ordered, query_ids, children)))
    }

    fn run_inputs(&self, measures: &[Measure]) -> Vec<String> {
        self.assigned_inputs(measures, |p, m| p.run_inputs(m))
            .unwrap_or_else(|_| ir_eval::RUN_COLUMNS.iter().map(|c| (*c).to_string()).collect())
    }

    fn qrel_inputs(&self, measures: &[Measure]) -> Vec<String> {
        self.assigned_inputs(measures, |p, m| p.qrel_inputs(m))
            .unwrap_or_else(|_| ir_eval::QREL_COLUMNS.iter().map(|c| (*c).to_string()).collect())
    }
}

impl fmt::Debug for FallbackProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("FallbackProvider")
            .field("providers", &names)
            .finish_non_exhaustive()
    }
}

/// Merges the results of several evaluators over the same qrels.
pub struct FallbackEvaluator {
    measures: Vec<Measure>,
    query_ids: BTreeSet<String>,
    children: Vec<Box<dyn Evaluator>>,
}

impl FallbackEvaluator {
    /// Creates a composite over `children`.
    #[must_use]
    pub fn new(
        measures: Vec<Measure>,
        query_ids: BTreeSet<String>,
        children: Vec<Box<dyn Evaluator>>,
    ) -> Self {
        Self {
            measures,
            query_ids,
            children,
        }
    }

    /// Returns the number of child evaluators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns true if there are no child evaluators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Evaluator for FallbackEvaluator {
    fn measures(&self) -> &[Measure] {
        &self.measures
    }

    fn query_ids(&self) -> &BTreeSet<String> {
        &self.query_ids
    }

    fn iter_raw(&self, run: RunConverter) -> Result<RawMetrics<'_>, ProviderError> {
        let views = run.tee(self.children.len());
        let mut streams = Vec::with_capacity(self.children.len());
        for (child, view) in self.children.iter().zip(views) {
            streams.push(child.iter_calc(view)?);
        }
        Ok(Box::new(streams.into_iter().flatten()))
    }
}

impl fmt::Debug for FallbackEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackEvaluator")
            .field("measures", &self.measures)
            .field("query_ids", &self.query_ids.len())
            .field("children", &self.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JudgedProvider, NativeProvider};
    use ir_eval::{Qrel, ScoredDoc, measures};

    struct Offline {
        availability: Availability,
        supported: Vec<SupportedMeasure>,
    }

    impl Offline {
        fn new() -> Self {
            Self {
                availability: Availability::new(),
                supported: vec![SupportedMeasure::new("ERR")],
            }
        }
    }

    impl Provider for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn supported_measures(&self) -> &[SupportedMeasure] {
            &self.supported
        }

        fn availability(&self) -> &Availability {
            &self.availability
        }

        fn initialize(&self) -> Result<(), ProviderError> {
            Err(ProviderError::backend("offline", "not installed"))
        }

        fn install_instructions(&self) -> Option<String> {
            Some("install offline".to_string())
        }

        fn build_evaluator(
            &self,
            _measures: Vec<Measure>,
            _qrels: QrelsConverter,
        ) -> Result<Box<dyn Evaluator>, ProviderError> {
            Err(ProviderError::backend("offline", "unreachable"))
        }
    }

    /// Delegates to `NativeProvider` under another name.
    struct Mirror(NativeProvider);

    impl Provider for Mirror {
        fn name(&self) -> &str {
            "mirror"
        }

        fn supported_measures(&self) -> &[SupportedMeasure] {
            self.0.supported_measures()
        }

        fn availability(&self) -> &Availability {
            self.0.availability()
        }

        fn build_evaluator(
            &self,
            measures: Vec<Measure>,
            qrels: QrelsConverter,
        ) -> Result<Box<dyn Evaluator>, ProviderError> {
            self.0.build_evaluator(measures, qrels)
        }
    }

    fn fallback() -> FallbackProvider {
        FallbackProvider::new(vec![
            Box::new(Offline::new()),
            Box::new(NativeProvider::new()),
            Box::new(JudgedProvider::new()),
        ])
    }

    fn qrels() -> QrelsConverter {
        QrelsConverter::from(vec![
            Qrel::new("0", "D0", 0),
            Qrel::new("0", "D1", 1),
            Qrel::new("1", "D3", 2),
        ])
    }

    #[test]
    fn earlier_provider_wins() {
        let both = FallbackProvider::new(vec![
            Box::new(JudgedProvider::new()),
            Box::new(NativeProvider::new()),
        ]);
        let p5 = measures::precision().at(5);
        let plan = both.plan(&[p5.clone(), p5.clone()]).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.assignments()[0].measures, vec![p5.clone()]);
        assert_eq!(plan.provider_for(&p5), Some("native"));
    }

    #[test]
    fn priority_decides_between_capable_providers() {
        let p5 = measures::precision().at(5);
        let ap = measures::average_precision();

        let mirror_first = FallbackProvider::new(vec![
            Box::new(Mirror(NativeProvider::new())),
            Box::new(NativeProvider::new()),
        ]);
        let plan = mirror_first.plan(&[p5.clone(), ap.clone()]).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.provider_for(&p5), Some("mirror"));
        assert_eq!(plan.provider_for(&ap), Some("mirror"));

        let native_first = FallbackProvider::new(vec![
            Box::new(NativeProvider::new()),
            Box::new(Mirror(NativeProvider::new())),
        ]);
        let plan = native_first.plan(&[p5.clone(), ap.clone()]).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.provider_for(&p5), Some("native"));
        assert_eq!(plan.provider_for(&ap), Some("native"));
    }

    #[test]
    fn unavailable_candidates_are_reported() {
        let err = fallback()
            .plan(&[measures::err().at(10), measures::precision().at(5)])
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::Unsupported {
                measures: vec!["ERR@10".to_string()],
                candidates: vec![Candidate {
                    provider: "offline".to_string(),
                    install: Some("install offline".to_string()),
                }],
            }
        );
    }

    #[test]
    fn invalid_measures_fail_before_dispatch() {
        let err = fallback().plan(&[measures::precision()]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn supports_requires_availability() {
        let fallback = fallback();
        assert!(!fallback.supports(&measures::err().at(5)).unwrap());
        assert!(fallback.supports(&measures::judged().at(5)).unwrap());
    }

    #[test]
    fn single_assignment_is_not_wrapped() {
        let evaluator = fallback()
            .evaluator(vec![measures::precision().at(5)], qrels())
            .unwrap();
        assert_eq!(evaluator.measures(), &[measures::precision().at(5)]);
    }

    #[test]
    fn composite_merges_children() {
        let p1 = measures::precision().at(1);
        let judged = measures::judged().at(1);
        let evaluator = fallback()
            .evaluator(vec![judged.clone(), p1.clone()], qrels())
            .unwrap();
        let run = RunConverter::from(vec![
            ScoredDoc::new("0", "D1", 0.9),
            ScoredDoc::new("0", "D9", 0.1),
        ]);
        let rows: Vec<_> = evaluator.iter_calc(run).unwrap().collect();
        assert_eq!(rows.len(), 4);
        let value = |m: &Measure, q: &str| {
            rows.iter()
                .find(|r| &r.measure == m && r.query_id == q)
                .map(|r| r.value)
        };
        assert_eq!(value(&p1, "0"), Some(1.0));
        assert_eq!(value(&judged, "0"), Some(1.0));
        assert_eq!(value(&p1, "1"), Some(0.0));
        assert_eq!(value(&judged, "1"), Some(0.0));
    }

    #[test]
    fn empty_request_yields_nothing() {
        let evaluator = fallback().evaluator(Vec::new(), qrels()).unwrap();
        assert_eq!(evaluator.query_ids().len(), 2);
        let run = RunConverter::from(vec![ScoredDoc::new("0", "D1", 0.9)]);
        assert_eq!(evaluator.iter_calc(run).unwrap().count(), 0);
    }

    #[test]
    fn inputs_union_over_assignments() {
        let fallback = fallback();
        let columns = fallback.run_inputs(&[measures::precision().at(5), measures::judged().at(5)]);
        assert_eq!(columns, ["query_id", "doc_id", "score"]);
    }

    #[test]
    fn assigned_inputs_report_unplannable_requests() {
        let fallback = fallback();
        let err = fallback
            .assigned_inputs(&[measures::err().at(5)], |p, m| p.run_inputs(m))
            .unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(
            fallback.run_inputs(&[measures::err().at(5)]),
            ["query_id", "doc_id", "score"]
        );
    }
}
