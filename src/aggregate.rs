//! Aggregators that fold per-query values into one value per measure.

/// Which aggregator a measure uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregatorKind {
    /// Arithmetic mean; `empty` is reported when nothing was observed
    Mean {
        /// Result when no values were added
        empty: f64,
    },
    /// Running sum, for count-like measures
    Sum,
}

impl Default for AggregatorKind {
    fn default() -> Self {
        Self::Mean { empty: f64::NAN }
    }
}

impl AggregatorKind {
    /// Creates a fresh aggregator of this kind.
    #[must_use]
    pub const fn build(self) -> Aggregator {
        match self {
            Self::Mean { empty } => Aggregator::Mean(MeanAgg::new().with_default(empty)),
            Self::Sum => Aggregator::Sum(SumAgg::new()),
        }
    }
}

/// Arithmetic mean with a configurable "no observations" value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanAgg {
    sum: f64,
    count: usize,
    default: f64,
}

impl MeanAgg {
    /// Creates an empty mean whose empty result is NaN.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            default: f64::NAN,
        }
    }

    /// Sets the value reported when nothing was added.
    #[must_use]
    pub const fn with_default(mut self, default: f64) -> Self {
        self.default = default;
        self
    }

    /// Adds one observation.
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Returns the mean, or the configured default if empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn result(&self) -> f64 {
        if self.count == 0 {
            return self.default;
        }
        self.sum / self.count as f64
    }

    /// Returns the number of observations.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }
}

impl Default for MeanAgg {
    fn default() -> Self {
        Self::new()
    }
}

/// Running sum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SumAgg {
    sum: f64,
}

impl SumAgg {
    /// Creates a zero sum.
    #[must_use]
    pub const fn new() -> Self {
        Self { sum: 0.0 }
    }

    /// Adds one observation.
    pub fn add(&mut self, value: f64) {
        self.sum += value;
    }

    /// Returns the sum.
    #[must_use]
    pub const fn result(&self) -> f64 {
        self.sum
    }
}

/// An aggregator instance owned by one measure during one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregator {
    /// See [`MeanAgg`]
    Mean(MeanAgg),
    /// See [`SumAgg`]
    Sum(SumAgg),
}

impl Aggregator {
    /// Adds one observation.
    pub fn add(&mut self, value: f64) {
        match self {
            Self::Mean(agg) => agg.add(value),
            Self::Sum(agg) => agg.add(value),
        }
    }

    /// Returns the aggregate value.
    #[must_use]
    pub fn result(&self) -> f64 {
        match self {
            Self::Mean(agg) => agg.result(),
            Self::Sum(agg) => agg.result(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mean_is_nan_by_default() {
        assert!(MeanAgg::new().result().is_nan());
        assert_eq!(MeanAgg::new().with_default(0.0).result(), 0.0);
    }

    #[test]
    fn mean_of_values() {
        let mut agg = AggregatorKind::default().build();
        agg.add(0.6);
        agg.add(0.4);
        assert!((agg.result() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn sum_of_values() {
        let mut agg = AggregatorKind::Sum.build();
        assert_eq!(agg.result(), 0.0);
        agg.add(3.0);
        agg.add(4.0);
        assert_eq!(agg.result(), 7.0);
    }
}
