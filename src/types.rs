//! Judgment, run, and result records.

use std::fmt;

use crate::measure::Measure;

/// A relevance judgment for one (query, document) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Qrel {
    /// Query identifier
    pub query_id: String,
    /// Document identifier
    pub doc_id: String,
    /// Relevance grade; negative grades mark judged-but-unusable documents
    pub relevance: i32,
    /// Iteration or subtopic tag, the second column of a TREC qrels line
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub iteration: Option<String>,
}

impl Qrel {
    /// Creates a judgment without an iteration tag.
    #[must_use]
    pub fn new(query_id: impl Into<String>, doc_id: impl Into<String>, relevance: i32) -> Self {
        Self {
            query_id: query_id.into(),
            doc_id: doc_id.into(),
            relevance,
            iteration: None,
        }
    }

    /// Sets the iteration tag.
    #[must_use]
    pub fn with_iteration(mut self, iteration: impl Into<String>) -> Self {
        self.iteration = Some(iteration.into());
        self
    }
}

/// One scored document in a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoredDoc {
    /// Query identifier
    pub query_id: String,
    /// Document identifier
    pub doc_id: String,
    /// Retrieval score; higher ranks first
    pub score: f64,
}

impl ScoredDoc {
    /// Creates a scored document.
    #[must_use]
    pub fn new(query_id: impl Into<String>, doc_id: impl Into<String>, score: f64) -> Self {
        Self {
            query_id: query_id.into(),
            doc_id: doc_id.into(),
            score,
        }
    }
}

/// One computed value: a measure for a query.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Metric {
    /// Query identifier
    pub query_id: String,
    /// The measure that was computed
    pub measure: Measure,
    /// The computed value
    pub value: f64,
}

impl Metric {
    /// Creates a result row.
    #[must_use]
    pub fn new(query_id: impl Into<String>, measure: Measure, value: f64) -> Self {
        Self {
            query_id: query_id.into(),
            measure,
            value,
        }
    }
}

impl fmt::Display for Metric {
    /// Renders as a tab-separated `query_id measure value` row.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{:.4}", self.query_id, self.measure, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measures;

    #[test]
    fn metric_display() {
        let metric = Metric::new("q1", measures::precision().at(5), 0.6);
        assert_eq!(metric.to_string(), "q1\tP@5\t0.6000");
    }

    #[test]
    fn qrel_iteration() {
        let qrel = Qrel::new("q1", "d1", 2).with_iteration("0");
        assert_eq!(qrel.iteration.as_deref(), Some("0"));
        assert_eq!(Qrel::new("q1", "d1", 2).iteration, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn metric_serializes_measure_as_string() {
        let metric = Metric::new("q1", measures::precision().rel(2).at(5), 0.5);
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"query_id": "q1", "measure": "P(rel=2)@5", "value": 0.5})
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn records_round_trip_through_json() {
        let qrel = Qrel::new("q1", "d1", 2);
        let json = serde_json::to_string(&qrel).unwrap();
        assert_eq!(json, r#"{"query_id":"q1","doc_id":"d1","relevance":2}"#);
        assert_eq!(serde_json::from_str::<Qrel>(&json).unwrap(), qrel);
    }
}
