//! The default-backfilling result stream.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ir_eval::{Measure, Metric};
use tracing::{debug, warn};

use crate::RawMetrics;

/// Results of [`Evaluator::iter_calc`](crate::Evaluator::iter_calc).
///
/// Raw results pass through unchanged, except that only the first row for
/// a (measure, query) pair is kept. Once they run out, one row with the
/// measure's default value follows for each (measure, judged query) pair
/// that never appeared, sorted by measure then query id.
pub struct MetricStream<'a> {
    raw: RawMetrics<'a>,
    measures: &'a [Measure],
    query_ids: &'a BTreeSet<String>,
    seen: BTreeMap<Measure, BTreeSet<String>>,
    defaults: Option<std::vec::IntoIter<Metric>>,
}

impl<'a> MetricStream<'a> {
    /// Wraps raw results for the given measures and judged queries.
    #[must_use]
    pub fn new(
        raw: RawMetrics<'a>,
        measures: &'a [Measure],
        query_ids: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            raw,
            measures,
            query_ids,
            seen: BTreeMap::new(),
            defaults: None,
        }
    }

    fn missing(&self) -> Vec<Metric> {
        let expected: BTreeSet<&Measure> = self.measures.iter().collect();
        let mut rows = Vec::new();
        for measure in expected {
            let seen = self.seen.get(measure);
            for query_id in self.query_ids {
                if !seen.is_some_and(|s| s.contains(query_id)) {
                    rows.push(Metric::new(
                        query_id.clone(),
                        measure.clone(),
                        measure.default_value(),
                    ));
                }
            }
        }
        if !rows.is_empty() {
            debug!(count = rows.len(), "backfilled default values");
        }
        rows
    }
}

impl Iterator for MetricStream<'_> {
    type Item = Metric;

    fn next(&mut self) -> Option<Metric> {
        if self.defaults.is_none() {
            for metric in self.raw.by_ref() {
                let first = self
                    .seen
                    .entry(metric.measure.clone())
                    .or_default()
                    .insert(metric.query_id.clone());
                if first {
                    return Some(metric);
                }
                warn!(
                    measure = %metric.measure,
                    query_id = %metric.query_id,
                    value = metric.value,
                    "dropping repeated result"
                );
            }
            self.defaults = Some(self.missing().into_iter());
        }
        self.defaults.as_mut().and_then(Iterator::next)
    }
}

impl fmt::Debug for MetricStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricStream")
            .field("measures", &self.measures)
            .field("query_ids", &self.query_ids.len())
            .field("backfilling", &self.defaults.is_some())
            .finish_non_exhaustive()
    }
}
