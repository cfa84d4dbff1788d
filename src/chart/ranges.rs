use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::data::model::OoiDataset;
use crate::error::ChartError;
use crate::qc::QartodFlag;
use crate::qc::stats::{nan_mean, nan_std};

use super::bounds::Spread;

/// Suspect envelope width, in standard deviations.
const SUSPECT_SIGMA: f64 = 3.0;

// ---------------------------------------------------------------------------
// Gross range
// ---------------------------------------------------------------------------

/// QARTOD gross range limits for one variable.
///
/// `fail_*` are the sensor limits; `suspect_*` the user limits derived
/// from historical data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrossRange {
    pub fail_min: f64,
    pub fail_max: f64,
    pub suspect_min: f64,
    pub suspect_max: f64,
}

impl GrossRange {
    /// Suspect limits at mean ± 3 std of `values`, kept inside the fail limits.
    pub fn from_values(values: &[f64], fail_min: f64, fail_max: f64) -> Self {
        let s = Spread::of(values);
        GrossRange {
            fail_min,
            fail_max,
            suspect_min: (s.center - SUSPECT_SIGMA * s.std).max(fail_min),
            suspect_max: (s.center + SUSPECT_SIGMA * s.std).min(fail_max),
        }
    }

    /// Gross range test of one value.
    pub fn flag(&self, value: f64) -> QartodFlag {
        if value.is_nan() {
            QartodFlag::Missing
        } else if value < self.fail_min || value > self.fail_max {
            QartodFlag::Fail
        } else if value < self.suspect_min || value > self.suspect_max {
            QartodFlag::Suspect
        } else {
            QartodFlag::Pass
        }
    }

    pub fn flags(&self, values: &[f64]) -> Vec<QartodFlag> {
        values.iter().map(|&v| self.flag(v)).collect()
    }
}

// ---------------------------------------------------------------------------
// Climatology
// ---------------------------------------------------------------------------

/// Monthly climatological mean and standard deviation.
///
/// Index 0 is January. `None` marks a month without observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Climatology {
    pub monthly_fit: [Option<f64>; 12],
    pub monthly_std: [Option<f64>; 12],
}

impl Climatology {
    /// Group observations by calendar month across all years.
    pub fn from_series(time: &[DateTime<Utc>], values: &[f64]) -> Self {
        let mut by_month: [Vec<f64>; 12] = Default::default();
        for (t, &v) in time.iter().zip(values) {
            by_month[t.month0() as usize].push(v);
        }

        let mut monthly_fit = [None; 12];
        let mut monthly_std = [None; 12];
        for (m, obs) in by_month.iter().enumerate() {
            let mean = nan_mean(obs);
            if mean.is_finite() {
                monthly_fit[m] = Some(mean);
                monthly_std[m] = Some(nan_std(obs));
            }
        }
        Climatology {
            monthly_fit,
            monthly_std,
        }
    }

    pub fn from_dataset(ds: &OoiDataset, param: &str) -> Result<Self, ChartError> {
        let var = ds
            .variable(param)
            .ok_or_else(|| ChartError::UnknownVariable(param.to_string()))?;
        Ok(Climatology::from_series(&ds.time, &var.values))
    }

    /// Fit and standard deviation for a calendar month (1 = January).
    pub fn month(&self, month: u32) -> Option<(f64, f64)> {
        let i = month.checked_sub(1)? as usize;
        let fit = (*self.monthly_fit.get(i)?)?;
        let std = (*self.monthly_std.get(i)?)?;
        Some((fit, std))
    }

    /// Climatology test: outside fit ± 3 std for the sample's month is suspect.
    pub fn flag(&self, t: &DateTime<Utc>, value: f64) -> QartodFlag {
        if value.is_nan() {
            return QartodFlag::Missing;
        }
        match self.month(t.month()) {
            Some((fit, std)) if (value - fit).abs() > SUSPECT_SIGMA * std => QartodFlag::Suspect,
            Some(_) => QartodFlag::Pass,
            None => QartodFlag::NotEvaluated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn gross_range_suspect_limits_stay_inside_fail_limits() {
        let values = [7.0, 9.0, 7.0, 9.0];
        let gr = GrossRange::from_values(&values, 6.9, 9.0);
        assert_eq!(gr.suspect_min, 6.9);
        assert_eq!(gr.suspect_max, 9.0);

        let gr = GrossRange::from_values(&values, 0.0, 14.0);
        assert!((gr.suspect_min - 5.0).abs() < 1e-12);
        assert!((gr.suspect_max - 11.0).abs() < 1e-12);
        assert_eq!(
            gr.flags(&[8.0, 12.0, 15.0, f64::NAN]),
            vec![
                QartodFlag::Pass,
                QartodFlag::Suspect,
                QartodFlag::Fail,
                QartodFlag::Missing
            ]
        );
    }

    #[test]
    fn climatology_groups_by_calendar_month() {
        let time = vec![
            Utc.with_ymd_and_hms(2021, 1, 5, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 1, 20, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 7, 1, 0, 0, 0).unwrap(),
        ];
        let clim = Climatology::from_series(&time, &[10.0, 12.0, 20.0]);
        assert_eq!(clim.month(1), Some((11.0, 1.0)));
        assert_eq!(clim.month(7), Some((20.0, 0.0)));
        assert_eq!(clim.month(3), None);
        assert_eq!(clim.month(0), None);
        assert_eq!(clim.month(13), None);

        assert_eq!(clim.flag(&time[0], 14.5), QartodFlag::Suspect);
        assert_eq!(clim.flag(&time[0], 12.5), QartodFlag::Pass);
        let march = Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(clim.flag(&march, 1.0), QartodFlag::NotEvaluated);
    }

    #[test]
    fn climatology_deserializes_with_missing_months() {
        let json = r#"{
            "monthly_fit": [11.0, null, null, null, null, null, 20.0, null, null, null, null, null],
            "monthly_std": [1.0, null, null, null, null, null, 0.5, null, null, null, null, null]
        }"#;
        let clim: Climatology = serde_json::from_str(json).unwrap();
        assert_eq!(clim.month(7), Some((20.0, 0.5)));
        assert_eq!(clim.month(2), None);
    }
}
