//! Convenient re-exports for glob imports.
//!
//! ```rust
//! use ir_eval::prelude::*;
//!
//! let m: Measure = "nDCG@10".parse().unwrap();
//! assert_eq!(m, measures::ndcg().at(10));
//! ```

pub use crate::measures;
pub use crate::{
    // Measure model
    Measure, MeasureDef, MeasureRegistry, ParamInfo, ParamPredicate, ParamType, Value,
    // Records and inputs
    Frame, Metric, Qrel, QrelsConverter, QrelsMap, RunConverter, RunMap, ScoredDoc,
    // Aggregation
    Aggregator, AggregatorKind,
    // Errors
    FormatError, ParseError, ParseErrorKind, ValidationError,
};
