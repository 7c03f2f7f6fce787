//! Provider and evaluator trait definitions.

use std::collections::{BTreeMap, BTreeSet};

use ir_eval::{Measure, Metric, QREL_COLUMNS, QrelsConverter, RUN_COLUMNS, RunConverter, ValidationError};
use tracing::debug;

use crate::{Availability, MetricStream, ProviderError, SupportedMeasure};

/// Lazily produced results, before defaults are backfilled.
pub type RawMetrics<'a> = Box<dyn Iterator<Item = Metric> + 'a>;

/// A component that computes some set of measures.
///
/// Providers declare what they support through [`supported_measures`],
/// report whether they can run through [`is_available`], and build an
/// [`Evaluator`] bound to a fixed measure set and qrels.
///
/// # Availability
///
/// Availability is computed once, on first use, by calling
/// [`initialize`]; the answer is cached in the provider's
/// [`Availability`] for the rest of its life.
///
/// [`supported_measures`]: Provider::supported_measures
/// [`is_available`]: Provider::is_available
/// [`initialize`]: Provider::initialize
pub trait Provider: Send + Sync {
    /// Returns the provider's name, as shown in diagnostics.
    fn name(&self) -> &str;

    /// Returns the parameterizations this provider computes.
    fn supported_measures(&self) -> &[SupportedMeasure];

    /// Returns the provider's cached availability flag.
    fn availability(&self) -> &Availability;

    /// Checks that the provider can run, for example that an executable exists.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` describing why the provider cannot run.
    fn initialize(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Returns true if the provider can run. Only the first call checks.
    fn is_available(&self) -> bool {
        self.availability().get_or_check(|| match self.initialize() {
            Ok(()) => true,
            Err(e) => {
                debug!(provider = self.name(), error = %e, "provider unavailable");
                false
            }
        })
    }

    /// Returns guidance on making the provider available, if there is any.
    fn install_instructions(&self) -> Option<String> {
        None
    }

    /// Returns true if this provider computes `measure`.
    ///
    /// Availability is not considered.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the measure itself is invalid.
    fn supports(&self, measure: &Measure) -> Result<bool, ValidationError> {
        measure.validate()?;
        Ok(self
            .supported_measures()
            .iter()
            .any(|supported| supported.matches(measure)))
    }

    /// Builds an evaluator without checking availability.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the qrels cannot be read or a measure is
    /// not one this provider computes.
    fn build_evaluator(
        &self,
        measures: Vec<Measure>,
        qrels: QrelsConverter,
    ) -> Result<Box<dyn Evaluator>, ProviderError>;

    /// Builds an evaluator for `measures` bound to `qrels`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unavailable` if the provider cannot run, or
    /// any error from [`build_evaluator`](Provider::build_evaluator).
    fn evaluator(
        &self,
        measures: Vec<Measure>,
        qrels: QrelsConverter,
    ) -> Result<Box<dyn Evaluator>, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::unavailable(
                self.name(),
                self.install_instructions(),
            ));
        }
        self.build_evaluator(measures, qrels)
    }

    /// Returns the run columns `measures` read.
    fn run_inputs(&self, _measures: &[Measure]) -> Vec<String> {
        RUN_COLUMNS.iter().map(|c| (*c).to_string()).collect()
    }

    /// Returns the qrels columns `measures` read.
    fn qrel_inputs(&self, _measures: &[Measure]) -> Vec<String> {
        QREL_COLUMNS.iter().map(|c| (*c).to_string()).collect()
    }
}

/// A measure set bound to a fixed set of judged queries.
///
/// Evaluators are built by a [`Provider`] and can score any number of runs.
/// Implementations only write [`iter_raw`]; [`iter_calc`] adds the default
/// for every (measure, query) pair the raw results leave out.
///
/// [`iter_raw`]: Evaluator::iter_raw
/// [`iter_calc`]: Evaluator::iter_calc
pub trait Evaluator {
    /// Returns the measures this evaluator reports.
    fn measures(&self) -> &[Measure];

    /// Returns the query ids present in the bound qrels.
    fn query_ids(&self) -> &BTreeSet<String>;

    /// Scores a run, yielding only the results the backend produced.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the run cannot be read or the backend fails.
    fn iter_raw(&self, run: RunConverter) -> Result<RawMetrics<'_>, ProviderError>;

    /// Scores a run, yielding exactly one result per measure and judged query.
    ///
    /// Pairs missing from the raw results follow them with the measure's
    /// default value, ordered by measure then query id.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the run cannot be read or the backend fails.
    fn iter_calc(&self, run: RunConverter) -> Result<MetricStream<'_>, ProviderError> {
        let raw = self.iter_raw(run)?;
        Ok(MetricStream::new(raw, self.measures(), self.query_ids()))
    }

    /// Scores a run and folds each measure's values with its aggregator.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the run cannot be read or the backend fails.
    fn calc_aggregate(&self, run: RunConverter) -> Result<BTreeMap<Measure, f64>, ProviderError> {
        let mut aggregators: BTreeMap<Measure, _> = self
            .measures()
            .iter()
            .map(|m| (m.clone(), m.aggregator()))
            .collect();
        for metric in self.iter_calc(run)? {
            if let Some(aggregator) = aggregators.get_mut(&metric.measure) {
                aggregator.add(metric.value);
            }
        }
        Ok(aggregators
            .into_iter()
            .map(|(measure, aggregator)| (measure, aggregator.result()))
            .collect())
    }
}
