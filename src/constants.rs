//! Constants shared by the measure model and the input converters.

/// Parameter bound by the `Measure@value` shorthand unless a measure overrides it.
pub const DEFAULT_AT_PARAM: &str = "cutoff";

/// Query id reserved for summary rows in textual output.
pub const AGGREGATE_QUERY_ID: &str = "all";

/// Column names of a judgment record, in canonical order.
pub const QREL_COLUMNS: &[&str] = &["query_id", "doc_id", "relevance"];

/// Optional judgment column carrying the iteration/subtopic tag.
pub const QREL_ITERATION_COLUMN: &str = "iteration";

/// Column names of a scored-document record, in canonical order.
pub const RUN_COLUMNS: &[&str] = &["query_id", "doc_id", "score"];

/// Number of whitespace-delimited fields in a TREC qrels line.
pub const TREC_QRELS_FIELDS: usize = 4;

/// Number of whitespace-delimited fields in a TREC run line.
pub const TREC_RUN_FIELDS: usize = 6;

/// Tag written into the last column of generated TREC run files.
pub const TREC_RUN_TAG: &str = "run";

/// Cutoffs that trec_eval reports when a cutoff family is requested bare.
pub const TREC_STANDARD_CUTOFFS: &[i64] = &[5, 10, 15, 20, 30, 100, 200, 500, 1000];

/// Recall levels that trec_eval reports for `iprec_at_recall`.
pub const TREC_RECALL_LEVELS: &[f64] = &[0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Cutoffs that trec_eval reports for a bare `success` request.
pub const TREC_SUCCESS_CUTOFFS: &[i64] = &[1, 5, 10];
