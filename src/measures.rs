//! Built-in measure prototypes.
//!
//! Each function returns the unparameterized prototype of one measure type.
//! Definitions are built once per process and shared by every instance.
//!
//! ```
//! use ir_eval::measures;
//!
//! assert_eq!(measures::ndcg().at(10).dcg("exp-log2").to_string(), "nDCG(dcg=\"exp-log2\")@10");
//! assert_eq!(measures::iprec().at(0.2).to_string(), "IPrec@0.2");
//! assert_eq!(measures::num_rel_ret().to_string(), "NumRet(rel=1)");
//! ```

use std::sync::{Arc, LazyLock};

use crate::aggregate::AggregatorKind;
use crate::measure::{Measure, MeasureDef};
use crate::param::ParamInfo;
use crate::value::ParamType;

fn cutoff(required: bool) -> ParamInfo {
    let info = ParamInfo::new(ParamType::Int).with_desc("ranking cutoff threshold");
    if required { info.required() } else { info }
}

fn rel() -> ParamInfo {
    ParamInfo::new(ParamType::Int)
        .with_default(1)
        .with_desc("minimum relevance score to be considered relevant (inclusive)")
}

fn judged_only() -> ParamInfo {
    ParamInfo::new(ParamType::Bool)
        .with_default(false)
        .with_desc("ignore returned documents that do not have relevance judgments")
}

fn min_rel() -> ParamInfo {
    ParamInfo::new(ParamType::Int)
        .with_default(0)
        .with_desc("minimum relevance score")
}

fn max_rel() -> ParamInfo {
    ParamInfo::new(ParamType::Int)
        .required()
        .with_desc("maximum relevance score")
}

fn persistence(default: f64) -> ParamInfo {
    ParamInfo::new(ParamType::Float)
        .with_default(default)
        .with_desc("persistence")
}

fn target_gain() -> ParamInfo {
    ParamInfo::new(ParamType::Float)
        .with_default(1.0)
        .with_desc("total desired gain (normalized)")
}

fn alpha() -> ParamInfo {
    ParamInfo::new(ParamType::Float)
        .with_default(0.5)
        .with_desc("redundancy intolerance")
}

macro_rules! prototype {
    ($(#[$doc:meta])* $fn_name:ident, $static_name:ident, $def:expr) => {
        static $static_name: LazyLock<Arc<MeasureDef>> = LazyLock::new(|| Arc::new($def));

        $(#[$doc])*
        #[must_use]
        pub fn $fn_name() -> Measure {
            Measure::from_def(Arc::clone(&$static_name))
        }
    };
}

prototype!(
    /// `P`: precision at a cutoff.
    precision,
    PRECISION,
    MeasureDef::new("P")
        .with_param("cutoff", cutoff(true))
        .with_param("rel", rel())
        .with_param("judged_only", judged_only())
        .with_pretty_name("Precision at k")
        .with_short_desc("Percentage of documents in the top k that are relevant")
);

prototype!(
    /// `R`: recall at a cutoff.
    recall,
    RECALL,
    MeasureDef::new("R")
        .with_param("cutoff", cutoff(true))
        .with_param("rel", rel())
        .with_pretty_name("Recall at k")
);

prototype!(
    /// `RR`: reciprocal rank of the first relevant document.
    reciprocal_rank,
    RECIPROCAL_RANK,
    MeasureDef::new("RR")
        .with_param("cutoff", cutoff(false))
        .with_param("rel", rel())
        .with_param("judged_only", judged_only())
        .with_pretty_name("(Mean) Reciprocal Rank")
);

prototype!(
    /// `AP`: average precision.
    average_precision,
    AVERAGE_PRECISION,
    MeasureDef::new("AP")
        .with_param("cutoff", cutoff(false))
        .with_param("rel", rel())
        .with_param("judged_only", judged_only())
        .with_pretty_name("(Mean) Average Precision")
);

prototype!(
    /// `nDCG`: normalized discounted cumulative gain.
    ndcg,
    NDCG,
    MeasureDef::new("nDCG")
        .with_param("cutoff", cutoff(false))
        .with_param(
            "dcg",
            ParamInfo::new(ParamType::Str)
                .with_choices(["log2", "exp-log2"])
                .with_default("log2")
                .with_desc("DCG formulation"),
        )
        .with_param(
            "gains",
            ParamInfo::new(ParamType::Map).with_desc("custom gain mapping (int-to-int)"),
        )
        .with_param("judged_only", judged_only())
        .with_pretty_name("Normalised Discounted Cumulative Gain")
);

prototype!(
    /// `Rprec`: precision at R, the number of relevant documents.
    rprec,
    RPREC,
    MeasureDef::new("Rprec")
        .with_param("rel", rel())
        .with_param("judged_only", judged_only())
        .with_pretty_name("Precision at R")
);

prototype!(
    /// `Success`: 1 if a relevant document appears in the top k, else 0.
    success,
    SUCCESS,
    MeasureDef::new("Success")
        .with_param("cutoff", cutoff(true))
        .with_param("rel", rel())
);

prototype!(
    /// `Judged`: fraction of the top k that have any judgment.
    judged,
    JUDGED,
    MeasureDef::new("Judged").with_param("cutoff", cutoff(true))
);

prototype!(
    /// `Bpref`: binary preference.
    bpref,
    BPREF,
    MeasureDef::new("Bpref")
        .with_param("rel", rel())
        .with_pretty_name("Binary Preference")
);

prototype!(
    /// `IPrec`: interpolated precision at a recall level. `@` binds `recall`.
    iprec,
    IPREC,
    MeasureDef::new("IPrec")
        .with_param(
            "recall",
            ParamInfo::new(ParamType::Float)
                .required()
                .with_desc("recall threshold"),
        )
        .with_param("rel", rel())
        .with_param("judged_only", judged_only())
        .with_at_param("recall")
        .with_pretty_name("Interpolated Precision@recall")
);

prototype!(
    /// `ERR`: expected reciprocal rank.
    err,
    ERR,
    MeasureDef::new("ERR").with_param("cutoff", cutoff(false))
);

prototype!(
    /// `NumQ`: number of queries. Summed rather than averaged.
    num_q,
    NUM_Q,
    MeasureDef::new("NumQ").with_aggregator(AggregatorKind::Sum)
);

prototype!(
    /// `NumRet`: number of returned documents, optionally only those with relevance >= `rel`.
    num_ret,
    NUM_RET,
    MeasureDef::new("NumRet")
        .with_param(
            "rel",
            ParamInfo::new(ParamType::Int).with_desc(
                "minimum relevance score to be counted (inclusive), or all documents returned if absent",
            ),
        )
        .with_aggregator(AggregatorKind::Sum)
);

prototype!(
    /// `NumRel`: number of judged documents with relevance >= `rel`.
    num_rel,
    NUM_REL,
    MeasureDef::new("NumRel")
        .with_param("rel", rel().with_desc("minimum relevance score to be counted (inclusive)"))
        .with_aggregator(AggregatorKind::Sum)
        .with_pretty_name("Number of Relevant Documents")
);

prototype!(
    /// `SetP`: precision over the whole returned set.
    set_precision,
    SET_PRECISION,
    MeasureDef::new("SetP")
        .with_param("rel", rel())
        .with_param(
            "relative",
            ParamInfo::new(ParamType::Bool)
                .with_default(false)
                .with_desc("divide by the best SetP achievable at the returned set size"),
        )
        .with_param("judged_only", judged_only())
        .with_pretty_name("Set Precision")
        .with_short_desc("The precision among all returned documents")
);

prototype!(
    /// `SetR`: recall over the whole returned set.
    set_recall,
    SET_RECALL,
    MeasureDef::new("SetR")
        .with_param("rel", rel())
        .with_pretty_name("Set Recall")
);

prototype!(
    /// `SetF`: weighted harmonic mean of `SetP` and `SetR`.
    set_f,
    SET_F,
    MeasureDef::new("SetF")
        .with_param("rel", rel())
        .with_param(
            "beta",
            ParamInfo::new(ParamType::Float)
                .with_default(1.0)
                .with_desc("relative importance of R to P in the harmonic mean"),
        )
        .with_param("judged_only", judged_only())
        .with_pretty_name("Set F1")
);

prototype!(
    /// `SetAP`: unranked average precision, `SetP * SetR`.
    set_ap,
    SET_AP,
    MeasureDef::new("SetAP")
        .with_param("rel", rel())
        .with_param("judged_only", judged_only())
        .with_pretty_name("Set Average Precision")
);

prototype!(
    /// `infAP`: inferred AP. Pooled-but-unjudged documents carry relevance -1.
    inf_ap,
    INF_AP,
    MeasureDef::new("infAP").with_param("rel", rel())
);

prototype!(
    /// `RBP`: rank-biased precision. Graded when `rel` is unbound.
    rbp,
    RBP,
    MeasureDef::new("RBP")
        .with_param("cutoff", cutoff(false))
        .with_param("p", persistence(0.8))
        .with_param(
            "rel",
            ParamInfo::new(ParamType::Int).with_desc(
                "minimum relevance score to be considered relevant (inclusive), or graded if absent",
            ),
        )
        .with_pretty_name("Rank-Biased Precision")
);

prototype!(
    /// `NERR8`: nearly expected reciprocal rank with truncation at k.
    nerr8,
    NERR8,
    MeasureDef::new("NERR8")
        .with_param("cutoff", cutoff(true))
        .with_param("min_rel", min_rel())
        .with_param("max_rel", max_rel())
);

prototype!(
    /// `NERR9`: like `NERR8`, with a gain-based discount.
    nerr9,
    NERR9,
    MeasureDef::new("NERR9")
        .with_param("cutoff", cutoff(true))
        .with_param("min_rel", min_rel())
        .with_param("max_rel", max_rel())
);

prototype!(
    /// `NERR10`: nearly expected reciprocal rank with RBP patience.
    nerr10,
    NERR10,
    MeasureDef::new("NERR10")
        .with_param("p", persistence(0.9))
        .with_param("min_rel", min_rel())
        .with_param("max_rel", max_rel())
);

prototype!(
    /// `NERR11`: nearly expected reciprocal rank with an INST goal.
    nerr11,
    NERR11,
    MeasureDef::new("NERR11")
        .with_param("T", target_gain())
        .with_param("min_rel", min_rel())
        .with_param("max_rel", max_rel())
);

prototype!(
    /// `alpha_DCG`: intent-aware DCG.
    alpha_dcg,
    ALPHA_DCG,
    MeasureDef::new("alpha_DCG")
        .with_param("cutoff", cutoff(false))
        .with_param("rel", rel())
        .with_param("alpha", alpha())
        .with_param("judged_only", judged_only())
        .with_pretty_name("Alpha Discounted Cumulative Gain")
);

prototype!(
    /// `alpha_nDCG`: intent-aware nDCG.
    alpha_ndcg,
    ALPHA_NDCG,
    MeasureDef::new("alpha_nDCG")
        .with_param("cutoff", cutoff(false))
        .with_param("rel", rel())
        .with_param("alpha", alpha())
        .with_param("judged_only", judged_only())
        .with_pretty_name("Alpha Normalised Discounted Cumulative Gain")
);

prototype!(
    /// `SDCG`: nDCG scaled as if unlabeled fully-relevant documents exist.
    sdcg,
    SDCG,
    MeasureDef::new("SDCG")
        .with_param("cutoff", cutoff(true))
        .with_param(
            "dcg",
            ParamInfo::new(ParamType::Str)
                .with_choices(["log2"])
                .with_default("log2")
                .with_desc("DCG formulation"),
        )
        .with_param("min_rel", min_rel())
        .with_param("max_rel", max_rel())
);

prototype!(
    /// `INST`: adaptive weighted precision.
    inst,
    INST,
    MeasureDef::new("INST")
        .with_param("T", target_gain())
        .with_param("min_rel", min_rel())
        .with_param("max_rel", max_rel())
);

prototype!(
    /// `INSQ`: the predecessor of `INST`.
    insq,
    INSQ,
    MeasureDef::new("INSQ")
        .with_param("T", target_gain())
        .with_param("min_rel", min_rel())
        .with_param("max_rel", max_rel())
);

prototype!(
    /// `BPM`: Bejeweled player model.
    bpm,
    BPM,
    MeasureDef::new("BPM")
        .with_param("cutoff", cutoff(true))
        .with_param("T", target_gain())
        .with_param("min_rel", min_rel())
        .with_param("max_rel", max_rel())
        .with_pretty_name("Bejeweled Player Model")
);

prototype!(
    /// `Accuracy`: probability a relevant document ranks above a non-relevant one.
    accuracy,
    ACCURACY,
    MeasureDef::new("Accuracy")
        .with_param("cutoff", cutoff(false))
        .with_param("rel", rel())
);

prototype!(
    /// `Compat`: rank-biased overlap with an ideal ranking.
    compat,
    COMPAT,
    MeasureDef::new("Compat")
        .with_param("p", persistence(0.95))
        .with_param(
            "normalize",
            ParamInfo::new(ParamType::Bool)
                .with_default(true)
                .with_desc("apply normalization for finite ideal rankings"),
        )
        .with_pretty_name("Compatibility")
);

/// `NumRelRet`: shorthand for `NumRet(rel=1)`.
#[must_use]
pub fn num_rel_ret() -> Measure {
    num_ret().rel(1)
}

/// Returns every built-in prototype with its registered names, primary name first.
#[must_use]
pub fn builtin() -> Vec<(Measure, &'static [&'static str])> {
    let entries: [(Measure, &'static [&'static str]); 34] = [
        (precision(), &["P", "Precision"]),
        (recall(), &["R", "Recall"]),
        (reciprocal_rank(), &["RR", "MRR"]),
        (average_precision(), &["AP", "MAP"]),
        (ndcg(), &["nDCG", "NDCG"]),
        (rprec(), &["Rprec", "RPrec"]),
        (success(), &["Success"]),
        (judged(), &["Judged"]),
        (bpref(), &["Bpref", "BPref"]),
        (iprec(), &["IPrec"]),
        (err(), &["ERR"]),
        (num_q(), &["NumQ"]),
        (num_ret(), &["NumRet"]),
        (num_rel_ret(), &["NumRelRet"]),
        (num_rel(), &["NumRel"]),
        (set_precision(), &["SetP"]),
        (set_precision().with_param("relative", true), &["SetRelP"]),
        (set_recall(), &["SetR"]),
        (set_f(), &["SetF"]),
        (set_ap(), &["SetAP"]),
        (inf_ap(), &["infAP"]),
        (rbp(), &["RBP"]),
        (nerr8(), &["NERR8"]),
        (nerr9(), &["NERR9"]),
        (nerr10(), &["NERR10"]),
        (nerr11(), &["NERR11"]),
        (alpha_dcg(), &["alpha_DCG"]),
        (alpha_ndcg(), &["alpha_nDCG"]),
        (sdcg(), &["SDCG"]),
        (inst(), &["INST"]),
        (insq(), &["INSQ"]),
        (bpm(), &["BPM"]),
        (accuracy(), &["Accuracy"]),
        (compat(), &["Compat"]),
    ];
    Vec::from(entries)
}
