//! Judgment rate.

use std::collections::BTreeSet;
use std::rc::Rc;

use ir_eval::{Measure, Metric, ParamPredicate, QrelsConverter, QrelsMap, RunConverter};

use crate::{Availability, Evaluator, Provider, ProviderError, RawMetrics, SupportedMeasure};

/// Computes `Judged@k`: the fraction of the top `k` documents that have any judgment.
///
/// The run is ordered by score descending, then document id ascending.
/// Every query in the run is scored, judged or not.
#[derive(Debug)]
pub struct JudgedProvider {
    availability: Availability,
    supported: Vec<SupportedMeasure>,
}

impl JudgedProvider {
    /// Creates the provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            availability: Availability::new(),
            supported: vec![SupportedMeasure::new("Judged").with("cutoff", ParamPredicate::Any)],
        }
    }
}

impl Default for JudgedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for JudgedProvider {
    fn name(&self) -> &str {
        "judged"
    }

    fn supported_measures(&self) -> &[SupportedMeasure] {
        &self.supported
    }

    fn availability(&self) -> &Availability {
        &self.availability
    }

    fn build_evaluator(
        &self,
        measures: Vec<Measure>,
        mut qrels: QrelsConverter,
    ) -> Result<Box<dyn Evaluator>, ProviderError> {
        let mut cutoffs = Vec::with_capacity(measures.len());
        for measure in &measures {
            match (measure.name(), measure.int_param("cutoff")) {
                ("Judged", Some(cutoff)) => {
                    cutoffs.push((usize::try_from(cutoff).unwrap_or(0), measure.clone()));
                }
                _ => {
                    return Err(ProviderError::unsupported([measure.to_string()], Vec::new()));
                }
            }
        }
        let qrels = qrels.as_mapping()?;
        let query_ids = qrels.keys().cloned().collect();
        Ok(Box::new(JudgedEvaluator {
            measures,
            cutoffs,
            qrels,
            query_ids,
        }))
    }
}

struct JudgedEvaluator {
    measures: Vec<Measure>,
    cutoffs: Vec<(usize, Measure)>,
    qrels: Rc<QrelsMap>,
    query_ids: BTreeSet<String>,
}

impl Evaluator for JudgedEvaluator {
    fn measures(&self) -> &[Measure] {
        &self.measures
    }

    fn query_ids(&self) -> &BTreeSet<String> {
        &self.query_ids
    }

    #[allow(clippy::cast_precision_loss)]
    fn iter_raw(&self, mut run: RunConverter) -> Result<RawMetrics<'_>, ProviderError> {
        let run = run.as_mapping()?;
        let mut rows = Vec::new();
        for (qid, docs) in run.iter() {
            let mut ranked: Vec<(&String, f64)> = docs.iter().map(|(d, s)| (d, *s)).collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            let judgments = self.qrels.get(qid);
            for (cutoff, measure) in &self.cutoffs {
                let value = if *cutoff == 0 {
                    0.0
                } else {
                    let judged = ranked
                        .iter()
                        .take(*cutoff)
                        .filter(|(doc, _)| judgments.is_some_and(|j| j.contains_key(*doc)))
                        .count();
                    judged as f64 / *cutoff as f64
                };
                rows.push(Metric::new(qid.clone(), measure.clone(), value));
            }
        }
        Ok(Box::new(rows.into_iter()))
    }
}
