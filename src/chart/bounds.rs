use crate::qc::stats::{nan_mean, nan_median, nan_std};

/// Initial y extent of a chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YBounds {
    pub min: f64,
    pub max: f64,
}

impl YBounds {
    /// False when the data had no finite values to derive bounds from.
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

/// Centre and spread of a series, NaN values skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub center: f64,
    pub std: f64,
}

impl Spread {
    /// Mean and population standard deviation.
    pub fn of(values: &[f64]) -> Self {
        Spread {
            center: nan_mean(values),
            std: nan_std(values),
        }
    }

    /// Like [`Spread::of`], but when a handful of wild values push the
    /// standard deviation above the median, fall back to the median with a
    /// spread of 20% of it.
    pub fn robust(values: &[f64]) -> Self {
        let spread = Spread::of(values);
        let median = nan_median(values);
        if spread.std > median {
            Spread {
                center: median,
                std: median * 0.2,
            }
        } else {
            spread
        }
    }

    /// `center ± k·std`.
    pub fn bounds(&self, k: f64) -> YBounds {
        YBounds {
            min: self.center - k * self.std,
            max: self.center + k * self.std,
        }
    }
}
