//! Measures computed by the `trec_eval` executable.
//!
//! Qrels and the run are written to temporary TREC files right before each
//! evaluation and removed before it returns. `trec_eval` applies one
//! relevance level per invocation, so measures are grouped by their `rel`
//! and the executable runs once per group.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::process::{Command, Stdio};
use std::rc::Rc;

use ir_eval::{
    AGGREGATE_QUERY_ID, Measure, Metric, ParamPredicate, QrelsConverter, QrelsMap, RunConverter,
    TrecName, ValidationError,
};
use tracing::debug;

use crate::{
    Availability, Evaluator, Provider, ProviderError, RawMetrics, SupportedMeasure, TrecEvalConfig,
};

const NAME: &str = "trec_eval";

/// Runs `trec_eval` as a subprocess.
///
/// Available when the configured executable can be spawned.
#[derive(Debug)]
pub struct TrecEvalProvider {
    config: TrecEvalConfig,
    availability: Availability,
    supported: Vec<SupportedMeasure>,
}

impl TrecEvalProvider {
    /// Creates a provider for the given configuration.
    #[must_use]
    pub fn new(config: TrecEvalConfig) -> Self {
        let not_judged_only = || ParamPredicate::one_of([false]);
        let supported = vec![
            SupportedMeasure::new("P")
                .with("cutoff", ParamPredicate::Required)
                .with("rel", ParamPredicate::Any)
                .with("judged_only", not_judged_only()),
            SupportedMeasure::new("RR")
                .with("cutoff", ParamPredicate::Absent)
                .with("rel", ParamPredicate::Any)
                .with("judged_only", not_judged_only()),
            SupportedMeasure::new("Rprec")
                .with("rel", ParamPredicate::Any)
                .with("judged_only", not_judged_only()),
            SupportedMeasure::new("AP")
                .with("cutoff", ParamPredicate::Any)
                .with("rel", ParamPredicate::Any)
                .with("judged_only", not_judged_only()),
            SupportedMeasure::new("nDCG")
                .with("cutoff", ParamPredicate::Any)
                .with("dcg", ParamPredicate::one_of(["log2"]))
                .with("gains", ParamPredicate::Absent)
                .with("judged_only", not_judged_only()),
            SupportedMeasure::new("R").with("cutoff", ParamPredicate::Required),
            SupportedMeasure::new("Bpref").with("rel", ParamPredicate::Any),
            SupportedMeasure::new("NumRet").with("rel", ParamPredicate::Any),
            SupportedMeasure::new("NumQ"),
            SupportedMeasure::new("NumRel").with("rel", ParamPredicate::one_of([1])),
            SupportedMeasure::new("Success")
                .with("rel", ParamPredicate::Any)
                .with("cutoff", ParamPredicate::Required),
            SupportedMeasure::new("IPrec")
                .with("recall", ParamPredicate::Required)
                .with("rel", ParamPredicate::Any)
                .with("judged_only", not_judged_only()),
            SupportedMeasure::new("SetP")
                .with("rel", ParamPredicate::Any)
                .with("relative", ParamPredicate::one_of([false]))
                .with("judged_only", not_judged_only()),
            SupportedMeasure::new("SetR").with("rel", ParamPredicate::Any),
            SupportedMeasure::new("infAP").with("rel", ParamPredicate::Any),
        ];
        Self {
            config,
            availability: Availability::new(),
            supported,
        }
    }

    /// Creates a provider configured from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(TrecEvalConfig::from_env())
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TrecEvalConfig {
        &self.config
    }
}

impl Default for TrecEvalProvider {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Provider for TrecEvalProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn supported_measures(&self) -> &[SupportedMeasure] {
        &self.supported
    }

    fn availability(&self) -> &Availability {
        &self.availability
    }

    fn supports(&self, measure: &Measure) -> Result<bool, ValidationError> {
        measure.validate()?;
        Ok(self.supported.iter().any(|s| s.matches(measure))
            && TrecName::for_measure(measure).is_some())
    }

    fn initialize(&self) -> Result<(), ProviderError> {
        Command::new(&self.config.binary)
            .arg("-v")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
            .map_err(|e| {
                ProviderError::backend(
                    NAME,
                    format!("cannot run {}: {e}", self.config.binary.display()),
                )
            })
    }

    fn install_instructions(&self) -> Option<String> {
        Some(format!(
            "build trec_eval from https://github.com/usnistgov/trec_eval and put it on PATH, or set {}",
            crate::TREC_EVAL_ENV
        ))
    }

    fn build_evaluator(
        &self,
        measures: Vec<Measure>,
        mut qrels: QrelsConverter,
    ) -> Result<Box<dyn Evaluator>, ProviderError> {
        let mut names = Vec::with_capacity(measures.len());
        for measure in &measures {
            let name = self
                .supported
                .iter()
                .any(|s| s.matches(measure))
                .then(|| TrecName::for_measure(measure))
                .flatten();
            match name {
                Some(name) => names.push((name, measure.clone())),
                None => {
                    return Err(ProviderError::unsupported([measure.to_string()], Vec::new()));
                }
            }
        }
        let qrels = qrels.as_mapping()?;
        let query_ids = qrels.keys().cloned().collect();
        Ok(Box::new(TrecEvalEvaluator {
            config: self.config.clone(),
            measures,
            invocations: group_by_level(names),
            qrels,
            query_ids,
        }))
    }
}

/// One `trec_eval` run: an optional relevance level and the measures it reports.
#[derive(Debug)]
struct Invocation {
    level: Option<i64>,
    names: Vec<(TrecName, Measure)>,
}

impl Invocation {
    /// Builds `-m` arguments, merging parameters of the same family.
    fn measure_args(&self) -> Vec<String> {
        let mut families: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (name, _) in &self.names {
            let params = families.entry(name.family()).or_default();
            if let Some(param) = name.param() {
                params.insert(param);
            }
        }
        let mut args = Vec::new();
        for (family, params) in families {
            args.push("-m".to_string());
            if params.is_empty() {
                args.push(family.to_string());
            } else {
                let params: Vec<&str> = params.into_iter().collect();
                args.push(format!("{family}.{}", params.join(",")));
            }
        }
        args
    }
}

/// Groups names by relevance level. Level-independent names join the first group.
fn group_by_level(names: Vec<(TrecName, Measure)>) -> Vec<Invocation> {
    let mut by_level: BTreeMap<i64, Vec<(TrecName, Measure)>> = BTreeMap::new();
    let mut any_level = Vec::new();
    for (name, measure) in names {
        match name.relevance_level() {
            Some(level) => by_level.entry(level).or_default().push((name, measure)),
            None => any_level.push((name, measure)),
        }
    }
    let mut invocations: Vec<Invocation> = by_level
        .into_iter()
        .map(|(level, names)| Invocation {
            level: Some(level),
            names,
        })
        .collect();
    match invocations.first_mut() {
        Some(first) => first.names.extend(any_level),
        None if !any_level.is_empty() => invocations.push(Invocation {
            level: None,
            names: any_level,
        }),
        None => {}
    }
    invocations
}

struct TrecEvalEvaluator {
    config: TrecEvalConfig,
    measures: Vec<Measure>,
    invocations: Vec<Invocation>,
    qrels: Rc<QrelsMap>,
    query_ids: BTreeSet<String>,
}

impl TrecEvalEvaluator {
    fn invoke(
        &self,
        invocation: &Invocation,
        qrels_path: &Path,
        run_path: &Path,
    ) -> Result<Vec<Metric>, ProviderError> {
        let mut args = vec!["-q".to_string()];
        args.extend(self.config.extra_args.iter().cloned());
        if let Some(level) = invocation.level {
            args.push(self.config.relevance_flag.clone());
            args.push(level.to_string());
        }
        args.extend(invocation.measure_args());
        debug!(
            binary = %self.config.binary.display(),
            args = ?args,
            "invoking trec_eval"
        );

        let output = Command::new(&self.config.binary)
            .args(&args)
            .arg(qrels_path)
            .arg(run_path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ProviderError::backend(NAME, format!("failed to run: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::backend(
                NAME,
                format!("exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let mut by_output: BTreeMap<&str, Vec<&Measure>> = BTreeMap::new();
        for (name, measure) in &invocation.names {
            by_output.entry(name.output()).or_default().push(measure);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut rows = Vec::new();
        for line in stdout.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [name, query_id, value] = fields[..] else {
                continue;
            };
            if query_id == AGGREGATE_QUERY_ID {
                continue;
            }
            let Some(measures) = by_output.get(name) else {
                continue;
            };
            let value: f64 = value.parse().map_err(|_| {
                ProviderError::backend(NAME, format!("unreadable value '{value}' for {name}"))
            })?;
            for measure in measures {
                rows.push(Metric::new(query_id, (*measure).clone(), value));
            }
        }
        Ok(rows)
    }
}

impl Evaluator for TrecEvalEvaluator {
    fn measures(&self) -> &[Measure] {
        &self.measures
    }

    fn query_ids(&self) -> &BTreeSet<String> {
        &self.query_ids
    }

    fn iter_raw(&self, mut run: RunConverter) -> Result<RawMetrics<'_>, ProviderError> {
        let qrels_file =
            QrelsConverter::from_shared_mapping(Rc::clone(&self.qrels)).as_temp_file()?;
        let run_file = run.as_temp_file()?;
        let mut rows = Vec::new();
        for invocation in &self.invocations {
            rows.extend(self.invoke(invocation, qrels_file.path(), run_file.path())?);
        }
        Ok(Box::new(rows.into_iter()))
    }
}
