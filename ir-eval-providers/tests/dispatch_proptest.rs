//! Property-based tests for dispatch and backfilling.
//!
//! These tests generate random qrels, runs and measure requests and check
//! the guarantees every evaluator makes regardless of which provider
//! computes a measure.

use std::collections::{BTreeMap, BTreeSet};

use ir_eval::{Measure, Qrel, QrelsConverter, RunConverter, ScoredDoc, measures};
use ir_eval_providers::{
    Evaluator, FallbackProvider, JudgedProvider, NativeProvider, Provider, RuntimeProvider,
};
use proptest::prelude::*;

// ============================================================================
// STRATEGY DEFINITIONS
// ============================================================================

fn query_id_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["q1", "q2", "q3", "q4"]).prop_map(str::to_string)
}

fn doc_id_strategy() -> impl Strategy<Value = String> {
    (0u8..12).prop_map(|n| format!("d{n}"))
}

fn qrels_strategy() -> impl Strategy<Value = Vec<Qrel>> {
    prop::collection::vec(
        (query_id_strategy(), doc_id_strategy(), 0i32..3),
        1..30,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(q, d, rel)| Qrel::new(q, d, rel))
            .collect()
    })
}

fn run_strategy() -> impl Strategy<Value = Vec<ScoredDoc>> {
    prop::collection::vec(
        (query_id_strategy(), doc_id_strategy(), -10.0f64..10.0),
        0..40,
    )
    .prop_map(|rows| {
        // Keep the first score for a repeated (query, doc) pair
        let mut seen = BTreeSet::new();
        rows.into_iter()
            .filter(|(q, d, _)| seen.insert((q.clone(), d.clone())))
            .map(|(q, d, s)| ScoredDoc::new(q, d, s))
            .collect()
    })
}

fn measure_pool() -> Vec<Measure> {
    vec![
        measures::precision().at(1),
        measures::precision().rel(2).at(5),
        measures::recall().at(10),
        measures::reciprocal_rank(),
        measures::average_precision(),
        measures::ndcg(),
        measures::ndcg().dcg("exp-log2").at(3),
        measures::rprec(),
        measures::success().at(5),
        measures::num_q(),
        measures::num_ret(),
        measures::num_rel(),
        measures::judged().at(3),
        measures::judged().at(10),
    ]
}

fn request_strategy() -> impl Strategy<Value = Vec<Measure>> {
    prop::sample::subsequence(measure_pool(), 1..8).prop_shuffle()
}

fn fallback() -> FallbackProvider {
    FallbackProvider::new(vec![
        Box::new(NativeProvider::new()),
        Box::new(JudgedProvider::new()),
        Box::new(RuntimeProvider::new()),
    ])
}

// ============================================================================
// DEFAULT COMPLETENESS
// ============================================================================

proptest! {
    /// Every (measure, judged query) pair gets exactly one row.
    #[test]
    fn one_row_per_measure_and_judged_query(
        qrels in qrels_strategy(),
        run in run_strategy(),
        requested in request_strategy(),
    ) {
        let judged: BTreeSet<String> = qrels.iter().map(|q| q.query_id.clone()).collect();
        let evaluator = fallback()
            .evaluator(requested.clone(), QrelsConverter::from(qrels))
            .unwrap();

        let mut counts: BTreeMap<(Measure, String), usize> = BTreeMap::new();
        for metric in evaluator.iter_calc(RunConverter::from(run)).unwrap() {
            *counts.entry((metric.measure, metric.query_id)).or_default() += 1;
        }

        for measure in &requested {
            for query_id in &judged {
                prop_assert_eq!(counts.get(&(measure.clone(), query_id.clone())), Some(&1));
            }
        }
    }
}

// ============================================================================
// DISPATCH DETERMINISM
// ============================================================================

proptest! {
    /// Repeated planning assigns each measure to the same provider.
    #[test]
    fn planning_is_deterministic(requested in request_strategy()) {
        let first = fallback().plan(&requested).unwrap();
        let second = fallback().plan(&requested).unwrap();
        prop_assert_eq!(&first, &second);

        for measure in &requested {
            let expected = if measure.name() == "Judged" { "judged" } else { "native" };
            prop_assert_eq!(first.provider_for(measure), Some(expected));
        }
    }

    /// Request order does not change the assignment.
    #[test]
    fn planning_ignores_request_order(requested in request_strategy()) {
        let mut reversed = requested.clone();
        reversed.reverse();
        prop_assert_eq!(fallback().plan(&requested).unwrap(), fallback().plan(&reversed).unwrap());
    }
}

// ============================================================================
// AGGREGATION CONSISTENCY
// ============================================================================

proptest! {
    /// The aggregate equals the measure's aggregator over the per-query rows.
    #[test]
    fn aggregate_matches_rows(
        qrels in qrels_strategy(),
        run in run_strategy(),
        requested in request_strategy(),
    ) {
        let evaluator = fallback()
            .evaluator(requested.clone(), QrelsConverter::from(qrels))
            .unwrap();
        let rows: Vec<_> = evaluator.iter_calc(RunConverter::from(run.clone())).unwrap().collect();
        let aggregated = evaluator.calc_aggregate(RunConverter::from(run)).unwrap();

        for measure in &requested {
            let mut aggregator = measure.aggregator();
            for row in rows.iter().filter(|r| &r.measure == measure) {
                aggregator.add(row.value);
            }
            let expected = aggregator.result();
            let actual = aggregated[measure];
            prop_assert!((expected - actual).abs() < 1e-9, "{measure}: {expected} != {actual}");
        }
    }
}
