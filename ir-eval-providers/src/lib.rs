//! Providers, dispatch, and default backfilling for IR evaluation.
//!
//! This crate computes the measures modeled by `ir_eval`. It includes:
//!
//! - **Trait interface**: [`Provider`] declares what it can compute and
//!   builds an [`Evaluator`] bound to one set of qrels
//! - **Dispatch**: [`FallbackProvider`] partitions a request across
//!   providers in priority order and merges their output
//! - **Backfilling**: [`MetricStream`] guarantees one row per measure and
//!   judged query, filling gaps with each measure's default value
//! - **Built-in providers**: [`NativeProvider`], [`JudgedProvider`],
//!   [`TrecEvalProvider`] and [`RuntimeProvider`]
//! - **Programmatic surface**: [`Pipeline`]
//!
//! # Quick Start
//!
//! ```rust
//! use ir_eval::{measures, Qrel, ScoredDoc};
//! use ir_eval_providers::Pipeline;
//!
//! let qrels = vec![
//!     Qrel::new("Q0", "D0", 0),
//!     Qrel::new("Q0", "D1", 1),
//!     Qrel::new("Q1", "D0", 1),
//! ];
//! let run = vec![
//!     ScoredDoc::new("Q0", "D0", 0.8),
//!     ScoredDoc::new("Q0", "D1", 0.3),
//! ];
//!
//! let pipeline = Pipeline::default();
//! let rows = pipeline
//!     .iter_calc([measures::judged().at(5), measures::reciprocal_rank()], qrels, run)
//!     .unwrap();
//!
//! // Q1 has no retrieved documents but still gets a row for each measure
//! assert_eq!(rows.len(), 4);
//! ```
//!
//! # Dispatch
//!
//! Each provider declares the parameterizations it supports as
//! [`SupportedMeasure`] patterns. The dispatcher walks its providers in
//! order and hands each available one every still-unassigned measure it
//! supports. Measures left over are reported together, along with any
//! unavailable provider that would have handled them:
//!
//! ```rust
//! use ir_eval::measures;
//! use ir_eval_providers::{FallbackProvider, JudgedProvider, NativeProvider};
//!
//! let fallback = FallbackProvider::new(vec![
//!     Box::new(NativeProvider::new()),
//!     Box::new(JudgedProvider::new()),
//! ]);
//! let err = fallback.plan(&[measures::bpref()]).unwrap_err();
//! assert!(err.to_string().starts_with("unsupported measures [Bpref]"));
//! ```
//!
//! # Bound Evaluators
//!
//! Binding normalizes the qrels once; the evaluator can then score any
//! number of runs:
//!
//! ```rust
//! use ir_eval::{measures, Qrel, RunConverter, ScoredDoc};
//! use ir_eval_providers::{Evaluator, Pipeline};
//!
//! let p1 = measures::precision().at(1);
//! let evaluator = Pipeline::default()
//!     .bind([&p1], vec![Qrel::new("q", "a", 1)])
//!     .unwrap();
//!
//! for (doc, expected) in [("a", 1.0), ("b", 0.0)] {
//!     let run = RunConverter::from(vec![ScoredDoc::new("q", doc, 1.0)]);
//!     assert_eq!(evaluator.calc_aggregate(run).unwrap()[&p1], expected);
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod backfill;
mod capability;
mod config;
mod error;
mod fallback;
mod judged;
mod native;
mod pipeline;
mod runtime;
mod trec_eval;
mod traits;

pub use backfill::MetricStream;
pub use capability::{Availability, SupportedMeasure};
pub use config::{DefineOptions, TREC_EVAL_ENV, TrecEvalConfig};
pub use error::{Candidate, ProviderError};
pub use fallback::{Assignment, DispatchPlan, FallbackEvaluator, FallbackProvider};
pub use judged::JudgedProvider;
pub use native::NativeProvider;
pub use pipeline::{Calculation, MeasureRequest, Pipeline};
pub use runtime::RuntimeProvider;
pub use trec_eval::TrecEvalProvider;
pub use traits::{Evaluator, Provider, RawMetrics};
