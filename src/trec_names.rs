//! Conversion between measures and trec_eval measure names.
//!
//! trec_eval names a measure family (`P`, `ndcg_cut`) and takes cutoffs as
//! a parameter list (`P.5,10`), then reports one row per cutoff (`P_5`,
//! `P_10`). [`parse_trec_measure`] accepts either spelling.

use std::fmt;

use crate::constants::{TREC_RECALL_LEVELS, TREC_STANDARD_CUTOFFS, TREC_SUCCESS_CUTOFFS};
use crate::error::{ParseError, ParseErrorKind};
use crate::measure::Measure;
use crate::measures;
use crate::value::Value;

type Family = (&'static str, fn() -> Measure, &'static [i64]);

// Longest names first so that `ndcg_cut_10` is not read as `ndcg` + `cut_10`.
const CUTOFF_FAMILIES: &[Family] = &[
    ("ndcg_cut", measures::ndcg, TREC_STANDARD_CUTOFFS),
    ("map_cut", measures::average_precision, TREC_STANDARD_CUTOFFS),
    ("success", measures::success, TREC_SUCCESS_CUTOFFS),
    ("recall", measures::recall, TREC_STANDARD_CUTOFFS),
    ("P", measures::precision, TREC_STANDARD_CUTOFFS),
];

const IPREC_FAMILY: &str = "iprec_at_recall";

fn simple(name: &str) -> Option<Measure> {
    let measure = match name {
        "map" => measures::average_precision(),
        "ndcg" => measures::ndcg(),
        "recip_rank" => measures::reciprocal_rank(),
        "Rprec" => measures::rprec(),
        "bpref" => measures::bpref(),
        "num_q" => measures::num_q(),
        "num_ret" => measures::num_ret(),
        "num_rel" => measures::num_rel(),
        "num_rel_ret" => measures::num_rel_ret(),
        "set_P" => measures::set_precision(),
        "set_recall" => measures::set_recall(),
        "infAP" => measures::inf_ap(),
        _ => return None,
    };
    Some(measure)
}

/// Returns the measures trec_eval computes for its `official` set.
#[must_use]
pub fn official_measures() -> Vec<Measure> {
    let mut result: Vec<Measure> = TREC_STANDARD_CUTOFFS
        .iter()
        .map(|k| measures::precision().at(*k))
        .collect();
    result.push(measures::rprec());
    result.push(measures::bpref());
    result.extend(TREC_RECALL_LEVELS.iter().map(|r| measures::iprec().at(*r)));
    result.extend([
        measures::average_precision(),
        measures::num_q(),
        measures::num_rel(),
        measures::num_rel_ret(),
        measures::num_ret(),
        measures::reciprocal_rank(),
    ]);
    result
}

/// Parses a trec_eval measure name into the measures it reports.
///
/// # Examples
///
/// ```
/// use ir_eval::{measures, parse_trec_measure};
///
/// let p = measures::precision();
/// assert_eq!(parse_trec_measure("P_5,10").unwrap(), vec![p.at(5), p.at(10)]);
/// assert_eq!(parse_trec_measure("P.5").unwrap(), vec![p.at(5)]);
/// assert_eq!(parse_trec_measure("P").unwrap().len(), 9);
/// assert_eq!(parse_trec_measure("ndcg_cut.10").unwrap(), vec![measures::ndcg().at(10)]);
/// assert_eq!(parse_trec_measure("map").unwrap(), vec![measures::average_precision()]);
/// ```
///
/// # Errors
///
/// Returns `ParseError` with kind `NameNotFound` for names trec_eval does
/// not define here, and `Syntax` for a malformed parameter list.
pub fn parse_trec_measure(name: &str) -> Result<Vec<Measure>, ParseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError {
            input: name.to_string(),
            kind: ParseErrorKind::Empty,
        });
    }
    if name == "official" {
        return Ok(official_measures());
    }
    if let Some(measure) = simple(name) {
        return Ok(vec![measure]);
    }

    for (family, prototype, defaults) in CUTOFF_FAMILIES {
        if name == *family {
            return Ok(defaults.iter().map(|k| prototype().at(*k)).collect());
        }
        if let Some(args) = strip_family(name, family) {
            return parse_args(name, args, |arg| arg.parse::<i64>().ok().map(Value::Int))
                .map(|values| values.into_iter().map(|k| prototype().at(k)).collect());
        }
    }

    if name == IPREC_FAMILY {
        return Ok(TREC_RECALL_LEVELS
            .iter()
            .map(|r| measures::iprec().at(*r))
            .collect());
    }
    if let Some(args) = strip_family(name, IPREC_FAMILY) {
        return parse_args(name, args, |arg| arg.parse::<f64>().ok().map(Value::Float))
            .map(|values| values.into_iter().map(|r| measures::iprec().at(r)).collect());
    }

    Err(ParseError {
        input: name.to_string(),
        kind: ParseErrorKind::NameNotFound {
            name: name.to_string(),
        },
    })
}

fn strip_family<'a>(name: &'a str, family: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(family)?;
    rest.strip_prefix('_').or_else(|| rest.strip_prefix('.'))
}

fn parse_args(
    name: &str,
    args: &str,
    parse: impl Fn(&str) -> Option<Value>,
) -> Result<Vec<Value>, ParseError> {
    let offset = name.len() - args.len();
    let mut values = Vec::new();
    let mut position = offset;
    for arg in args.split(',') {
        match parse(arg.trim()) {
            Some(value) => values.push(value),
            None => {
                return Err(ParseError {
                    input: name.to_string(),
                    kind: ParseErrorKind::Syntax {
                        position,
                        reason: format!("invalid trec_eval parameter '{arg}'"),
                    },
                });
            }
        }
        position += arg.len() + 1;
    }
    Ok(values)
}

/// The trec_eval spelling of one measure.
///
/// `family` and `param` form the `-m` request (`P.5`); `output` is the name
/// of the row trec_eval prints for it (`P_5`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrecName {
    family: &'static str,
    param: Option<String>,
    output: String,
    relevance_level: Option<i64>,
}

impl TrecName {
    fn new(family: &'static str, param: Option<String>, output: String, rel: Option<i64>) -> Self {
        Self {
            family,
            param,
            output,
            relevance_level: rel,
        }
    }

    fn plain(family: &'static str, rel: Option<i64>) -> Self {
        Self::new(family, None, family.to_string(), rel)
    }

    fn cut(family: &'static str, cutoff: i64, rel: Option<i64>) -> Self {
        Self::new(family, Some(cutoff.to_string()), format!("{family}_{cutoff}"), rel)
    }

    /// Returns the trec_eval spelling of a measure, if trec_eval can compute it.
    ///
    /// Measures trec_eval cannot express (`judged_only=true`, custom nDCG
    /// gains, `RR@k`, recall levels finer than 0.01) yield `None`.
    #[must_use]
    pub fn for_measure(measure: &Measure) -> Option<Self> {
        if measure.bool_param("judged_only") == Some(true) {
            return None;
        }
        let rel = measure.int_param("rel");
        let cutoff = measure.int_param("cutoff");
        let name = match (measure.name(), cutoff) {
            ("P", Some(k)) => Self::cut("P", k, rel),
            ("R", Some(k)) => Self::cut("recall", k, rel),
            ("Success", Some(k)) => Self::cut("success", k, rel),
            ("AP", None) => Self::plain("map", rel),
            ("AP", Some(k)) => Self::cut("map_cut", k, rel),
            ("RR", None) => Self::plain("recip_rank", rel),
            ("Rprec", None) => Self::plain("Rprec", rel),
            ("Bpref", None) => Self::plain("bpref", rel),
            ("nDCG", cutoff) => {
                if measure.str_param("dcg") != Some("log2") || measure.param("gains").is_some() {
                    return None;
                }
                match cutoff {
                    Some(k) => Self::cut("ndcg_cut", k, None),
                    None => Self::plain("ndcg", None),
                }
            }
            ("IPrec", None) => {
                // trec_eval reports levels with two decimals
                let recall = measure.float_param("recall")?;
                let rounded = (recall * 100.0).round() / 100.0;
                if !(0.0..=1.0).contains(&recall) || (rounded - recall).abs() > 1e-9 {
                    return None;
                }
                let level = format!("{recall:.2}");
                let output = format!("{IPREC_FAMILY}_{level}");
                Self::new(IPREC_FAMILY, Some(level), output, rel)
            }
            ("NumQ", None) => Self::plain("num_q", None),
            ("NumRet", None) => match rel {
                Some(r) => Self::plain("num_rel_ret", Some(r)),
                None => Self::plain("num_ret", None),
            },
            ("NumRel", None) => Self::plain("num_rel", rel),
            ("SetP", None) if measure.bool_param("relative") == Some(false) => {
                Self::plain("set_P", rel)
            }
            ("SetR", None) => Self::plain("set_recall", rel),
            ("infAP", None) => Self::plain("infAP", rel),
            _ => return None,
        };
        Some(name)
    }

    /// Returns the measure family, as passed to `-m` without parameters.
    #[must_use]
    pub const fn family(&self) -> &'static str {
        self.family
    }

    /// Returns the family parameter (a cutoff or recall level), if any.
    #[must_use]
    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    /// Returns the row name trec_eval prints for this measure.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the `-l` relevance level this measure needs, or `None` if any level works.
    #[must_use]
    pub const fn relevance_level(&self) -> Option<i64> {
        self.relevance_level
    }
}

impl fmt::Display for TrecName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "{}.{param}", self.family),
            None => f.write_str(self.family),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_families_in_both_spellings() {
        let ndcg = measures::ndcg();
        assert_eq!(parse_trec_measure("ndcg_cut_10").unwrap(), vec![ndcg.at(10)]);
        assert_eq!(
            parse_trec_measure("ndcg_cut.5,10").unwrap(),
            vec![ndcg.at(5), ndcg.at(10)]
        );
        assert_eq!(parse_trec_measure("ndcg_cut").unwrap().len(), 9);
        assert_eq!(parse_trec_measure("ndcg").unwrap(), vec![ndcg]);
    }

    #[test]
    fn official_set() {
        let official = parse_trec_measure("official").unwrap();
        assert_eq!(official.len(), 28);
        assert_eq!(official[0].to_string(), "P@5");
        assert_eq!(official[11].to_string(), "IPrec@0.0");
        assert_eq!(official[27].to_string(), "RR");
    }

    #[test]
    fn iprec_levels() {
        assert_eq!(
            parse_trec_measure("iprec_at_recall_0.20").unwrap(),
            vec![measures::iprec().at(0.2)]
        );
        assert_eq!(parse_trec_measure("iprec_at_recall").unwrap().len(), 11);
    }

    #[test]
    fn errors() {
        assert!(parse_trec_measure("bogus").unwrap_err().is_name_not_found());
        let err = parse_trec_measure("P_5,x").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::Syntax {
                position: 4,
                reason: "invalid trec_eval parameter 'x'".to_string(),
            }
        );
    }

    #[test]
    fn names_for_measures() {
        let name = TrecName::for_measure(&measures::precision().rel(2).at(10)).unwrap();
        assert_eq!(name.to_string(), "P.10");
        assert_eq!(name.output(), "P_10");
        assert_eq!(name.relevance_level(), Some(2));

        let name = TrecName::for_measure(&measures::ndcg().at(20)).unwrap();
        assert_eq!(name.output(), "ndcg_cut_20");
        assert_eq!(name.relevance_level(), None);

        let name = TrecName::for_measure(&measures::iprec().at(0.2)).unwrap();
        assert_eq!(name.to_string(), "iprec_at_recall.0.20");
        assert_eq!(name.output(), "iprec_at_recall_0.20");

        let name = TrecName::for_measure(&measures::iprec().at(0.25)).unwrap();
        assert_eq!(name.param(), Some("0.25"));
        assert_eq!(name.output(), "iprec_at_recall_0.25");

        assert_eq!(
            TrecName::for_measure(&measures::num_rel_ret()).unwrap().output(),
            "num_rel_ret"
        );
        assert_eq!(
            TrecName::for_measure(&measures::num_ret()).unwrap().output(),
            "num_ret"
        );

        let name = TrecName::for_measure(&measures::set_precision().rel(2)).unwrap();
        assert_eq!(name.to_string(), "set_P");
        assert_eq!(name.relevance_level(), Some(2));
        assert_eq!(
            TrecName::for_measure(&measures::inf_ap()).unwrap().output(),
            "infAP"
        );
        assert_eq!(
            TrecName::for_measure(&measures::set_recall()).unwrap().output(),
            "set_recall"
        );
    }

    #[test]
    fn set_and_inferred_names_parse() {
        assert_eq!(parse_trec_measure("set_P").unwrap(), vec![measures::set_precision()]);
        assert_eq!(parse_trec_measure("infAP").unwrap(), vec![measures::inf_ap()]);
    }

    #[test]
    fn inexpressible_measures() {
        assert!(TrecName::for_measure(&measures::reciprocal_rank().at(10)).is_none());
        assert!(TrecName::for_measure(&measures::ndcg().dcg("exp-log2")).is_none());
        assert!(TrecName::for_measure(&measures::precision().at(5).judged_only(true)).is_none());
        assert!(TrecName::for_measure(&measures::judged().at(5)).is_none());
        assert!(TrecName::for_measure(&measures::iprec().at(0.333)).is_none());
        assert!(
            TrecName::for_measure(&measures::set_precision().with_param("relative", true))
                .is_none()
        );
        assert!(TrecName::for_measure(&measures::iprec().at(1.5)).is_none());
    }
}
