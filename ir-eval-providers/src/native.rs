//! In-process reference implementations of the common trec_eval measures.
//!
//! Rankings follow trec_eval: documents are ordered by score descending,
//! with ties broken by document id descending. A document is relevant at
//! level `rel` when its grade is at least `rel`. Only queries present in
//! both the qrels and the run are scored.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use ir_eval::{Measure, Metric, ParamPredicate, QrelsConverter, QrelsMap, RunConverter};

use crate::{Availability, Evaluator, Provider, ProviderError, RawMetrics, SupportedMeasure};

/// Computes P, R, RR, AP, nDCG, Rprec, Success, NumQ, NumRet and NumRel.
///
/// nDCG supports the `log2` and `exp-log2` formulations without custom
/// gains; no measure supports `judged_only=true`.
#[derive(Debug)]
pub struct NativeProvider {
    availability: Availability,
    supported: Vec<SupportedMeasure>,
}

impl NativeProvider {
    /// Creates the provider.
    #[must_use]
    pub fn new() -> Self {
        let not_judged_only = || ParamPredicate::one_of([false]);
        let supported = vec![
            SupportedMeasure::new("P")
                .with("cutoff", ParamPredicate::Required)
                .with("judged_only", not_judged_only()),
            SupportedMeasure::new("R").with("cutoff", ParamPredicate::Required),
            SupportedMeasure::new("RR").with("judged_only", not_judged_only()),
            SupportedMeasure::new("AP").with("judged_only", not_judged_only()),
            SupportedMeasure::new("nDCG")
                .with("dcg", ParamPredicate::one_of(["log2", "exp-log2"]))
                .with("gains", ParamPredicate::Absent)
                .with("judged_only", not_judged_only()),
            SupportedMeasure::new("Rprec").with("judged_only", not_judged_only()),
            SupportedMeasure::new("Success").with("cutoff", ParamPredicate::Required),
            SupportedMeasure::new("NumQ"),
            SupportedMeasure::new("NumRet"),
            SupportedMeasure::new("NumRel"),
        ];
        Self {
            availability: Availability::new(),
            supported,
        }
    }
}

impl Default for NativeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for NativeProvider {
    fn name(&self) -> &str {
        "native"
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
        let unsupported: Vec<String> = measures
            .iter()
            .filter(|m| !self.supported.iter().any(|s| s.matches(m)))
            .map(ToString::to_string)
            .collect();
        if !unsupported.is_empty() {
            return Err(ProviderError::unsupported(unsupported, Vec::new()));
        }
        let qrels = qrels.as_mapping()?;
        let query_ids = qrels.keys().cloned().collect();
        Ok(Box::new(NativeEvaluator {
            measures,
            qrels,
            query_ids,
        }))
    }
}

struct NativeEvaluator {
    measures: Vec<Measure>,
    qrels: Rc<QrelsMap>,
    query_ids: BTreeSet<String>,
}

impl Evaluator for NativeEvaluator {
    fn measures(&self) -> &[Measure] {
        &self.measures
    }

    fn query_ids(&self) -> &BTreeSet<String> {
        &self.query_ids
    }

    fn iter_raw(&self, mut run: RunConverter) -> Result<RawMetrics<'_>, ProviderError> {
        let run = run.as_mapping()?;
        let queries: Vec<(String, Vec<(String, f64)>)> = run
            .iter()
            .filter(|(qid, _)| self.qrels.contains_key(*qid))
            .map(|(qid, docs)| {
                let docs = docs.iter().map(|(d, s)| (d.clone(), *s)).collect();
                (qid.clone(), docs)
            })
            .collect();

        Ok(Box::new(queries.into_iter().flat_map(move |(qid, docs)| {
            let judgments = self.qrels.get(&qid);
            let ranked = rank(docs, judgments);
            let judgments: Vec<i32> = judgments
                .map(|j| j.values().copied().collect())
                .unwrap_or_default();
            let query = Query {
                ranked,
                judgments,
            };
            self.measures
                .iter()
                .map(|m| Metric::new(qid.clone(), m.clone(), query.compute(m)))
                .collect::<Vec<_>>()
        })))
    }
}

/// Orders documents trec_eval style and looks up their grades.
fn rank(
    mut docs: Vec<(String, f64)>,
    judgments: Option<&BTreeMap<String, i32>>,
) -> Vec<Option<i32>> {
    docs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    docs.iter()
        .map(|(doc, _)| judgments.and_then(|j| j.get(doc)).copied())
        .collect()
}

/// One query's ranked grades and all of its judged grades.
struct Query {
    ranked: Vec<Option<i32>>,
    judgments: Vec<i32>,
}

fn is_relevant(grade: Option<i32>, rel: i64) -> bool {
    grade.is_some_and(|g| i64::from(g) >= rel)
}

fn depth(cutoff: Option<i64>) -> Option<usize> {
    cutoff.map(|k| usize::try_from(k).unwrap_or(0))
}

impl Query {
    fn compute(&self, measure: &Measure) -> f64 {
        let rel = measure.int_param("rel").unwrap_or(1);
        let cutoff = depth(measure.int_param("cutoff"));
        match measure.name() {
            "P" => self.precision(cutoff.unwrap_or(0), rel),
            "R" => self.recall(cutoff.unwrap_or(0), rel),
            "RR" => self.reciprocal_rank(cutoff, rel),
            "AP" => self.average_precision(cutoff, rel),
            "nDCG" => self.ndcg(cutoff, measure.str_param("dcg") == Some("exp-log2")),
            "Rprec" => self.rprec(rel),
            "Success" => self.success(cutoff.unwrap_or(0), rel),
            "NumQ" => 1.0,
            "NumRet" => self.num_ret(measure.int_param("rel")),
            "NumRel" => count(self.num_rel(rel)),
            _ => measure.default_value(),
        }
    }

    fn top(&self, cutoff: Option<usize>) -> &[Option<i32>] {
        match cutoff {
            Some(k) if k < self.ranked.len() => &self.ranked[..k],
            _ => &self.ranked,
        }
    }

    fn hits(&self, cutoff: Option<usize>, rel: i64) -> usize {
        self.top(cutoff).iter().filter(|g| is_relevant(**g, rel)).count()
    }

    fn num_rel(&self, rel: i64) -> usize {
        self.judgments.iter().filter(|g| i64::from(**g) >= rel).count()
    }

    fn precision(&self, cutoff: usize, rel: i64) -> f64 {
        if cutoff == 0 {
            return 0.0;
        }
        count(self.hits(Some(cutoff), rel)) / count(cutoff)
    }

    fn recall(&self, cutoff: usize, rel: i64) -> f64 {
        let relevant = self.num_rel(rel);
        if relevant == 0 {
            return 0.0;
        }
        count(self.hits(Some(cutoff), rel)) / count(relevant)
    }

    fn reciprocal_rank(&self, cutoff: Option<usize>, rel: i64) -> f64 {
        self.top(cutoff)
            .iter()
            .position(|g| is_relevant(*g, rel))
            .map_or(0.0, |idx| 1.0 / count(idx + 1))
    }

    fn average_precision(&self, cutoff: Option<usize>, rel: i64) -> f64 {
        let relevant = self.num_rel(rel);
        if relevant == 0 {
            return 0.0;
        }
        let mut hits = 0;
        let mut sum = 0.0;
        for (idx, grade) in self.top(cutoff).iter().enumerate() {
            if is_relevant(*grade, rel) {
                hits += 1;
                sum += count(hits) / count(idx + 1);
            }
        }
        sum / count(relevant)
    }

    fn ndcg(&self, cutoff: Option<usize>, exponential: bool) -> f64 {
        let gain = |grade: i32| {
            let grade = f64::from(grade.max(0));
            if exponential { grade.exp2() - 1.0 } else { grade }
        };
        let dcg: f64 = self
            .top(cutoff)
            .iter()
            .enumerate()
            .map(|(idx, g)| gain(g.unwrap_or(0)) / discount(idx))
            .sum();

        let mut ideal = self.judgments.clone();
        ideal.sort_unstable_by(|a, b| b.cmp(a));
        if let Some(k) = cutoff {
            ideal.truncate(k);
        }
        let idcg: f64 = ideal
            .iter()
            .enumerate()
            .map(|(idx, g)| gain(*g) / discount(idx))
            .sum();

        if idcg > 0.0 { dcg / idcg } else { 0.0 }
    }

    fn rprec(&self, rel: i64) -> f64 {
        let relevant = self.num_rel(rel);
        if relevant == 0 {
            return 0.0;
        }
        count(self.hits(Some(relevant), rel)) / count(relevant)
    }

    fn success(&self, cutoff: usize, rel: i64) -> f64 {
        if self.hits(Some(cutoff), rel) > 0 { 1.0 } else { 0.0 }
    }

    fn num_ret(&self, rel: Option<i64>) -> f64 {
        match rel {
            Some(rel) => count(self.hits(None, rel)),
            None => count(self.ranked.len()),
        }
    }
}

/// log2 discount for a zero-based rank.
fn discount(idx: usize) -> f64 {
    count(idx + 2).log2()
}

#[allow(clippy::cast_precision_loss)]
fn count(n: usize) -> f64 {
    n as f64
}
