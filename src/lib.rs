//! Measure identity and input normalization for IR evaluation.
//!
//! This crate holds the value side of an evaluation toolkit: what a
//! measure *is* and how qrels and runs are accepted. Computing measures is
//! left to providers (see the `ir-eval-providers` crate), which declare the
//! parameterizations they support with [`ParamPredicate`]s and read inputs
//! through [`QrelsConverter`] and [`RunConverter`].
//!
//! # Overview
//!
//! A [`Measure`] is a measure type plus bound parameters. Its identity is a
//! canonical string, so independently built instances that render the same
//! are interchangeable as map keys and for dispatch:
//!
//! ```text
//! Name[(param=value,...)][@at_value]
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use ir_eval::{measures, Measure, MeasureRegistry};
//!
//! // Build measures fluently
//! let p10 = measures::precision().rel(2).at(10);
//! assert_eq!(p10.to_string(), "P(rel=2)@10");
//!
//! // Or parse them
//! let parsed: Measure = "P(rel=2)@10".parse().unwrap();
//! assert_eq!(parsed, p10);
//!
//! // Registries are explicit values and can be extended
//! let registry = MeasureRegistry::builtin();
//! assert!(registry.parse("Nope@5").unwrap_err().is_name_not_found());
//! ```
//!
//! # Inputs
//!
//! Qrels and runs can be supplied as a mapping of mappings, a [`Frame`], or
//! a one-pass record stream (for example a lazily parsed TREC file):
//!
//! ```rust
//! use ir_eval::{parse_trec_run, RunConverter};
//!
//! let text = "0 Q0 D0 1 0.8 run\n0 Q0 D1 2 0.3 run\n";
//! let run = RunConverter::from_results(parse_trec_run(std::io::Cursor::new(text.to_string())));
//! let mut views = run.tee(2);
//! assert_eq!(views[0].as_mapping().unwrap()["0"].len(), 2);
//! assert_eq!(views[1].as_records().count(), 2);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod aggregate;
mod constants;
mod convert;
mod error;
mod frame;
mod measure;
pub mod measures;
mod param;
mod parser;
mod predicate;
pub mod prelude;
mod registry;
mod trec_io;
mod trec_names;
mod types;
mod value;

pub use aggregate::{Aggregator, AggregatorKind, MeanAgg, SumAgg};
pub use constants::{
    AGGREGATE_QUERY_ID, DEFAULT_AT_PARAM, QREL_COLUMNS, QREL_ITERATION_COLUMN, RUN_COLUMNS,
    TREC_QRELS_FIELDS, TREC_RECALL_LEVELS, TREC_RUN_FIELDS, TREC_RUN_TAG, TREC_STANDARD_CUTOFFS,
    TREC_SUCCESS_CUTOFFS,
};
pub use convert::{
    Converter, Mapping, QrelsConverter, QrelsMap, Record, Records, RunConverter, RunMap, Shape,
    TeeReader,
};
pub use error::{FormatError, ParseError, ParseErrorKind, ValidationError};
pub use frame::Frame;
pub use measure::{Measure, MeasureDef, RuntimeFn, RuntimeHook};
pub use param::ParamInfo;
pub use predicate::ParamPredicate;
pub use registry::MeasureRegistry;
pub use trec_io::{
    parse_trec_qrels, parse_trec_run, read_trec_qrels, read_trec_run, write_trec_qrels,
    write_trec_run, TrecQrels, TrecRun,
};
pub use trec_names::{official_measures, parse_trec_measure, TrecName};
pub use types::{Metric, Qrel, ScoredDoc};
pub use value::{ParamType, Value};
