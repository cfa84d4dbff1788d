//! Quality assessment of SAMI-CO2 (PCO2W) seawater pCO2.
//!
//! Suspect levels follow the vendor documentation and experience with the
//! SAMI-pH; fail levels reflect how the blanks regularly fail when the
//! plumbing is obstructed.

use chrono::{DateTime, Utc};

use crate::data::model::Matrix;
use crate::error::QcError;

use super::flags::{FlagAccumulator, QartodFlag, summarize};
use super::phsen::check_matrix;
use super::stats::{any_across, either, first_difference};

const DARK_RANGE: (f64, f64) = (50.0, 200.0);
const SATURATED_SIGNAL: f64 = 4000.0;
const DARK_SIGNAL: f64 = 5.0;
const SUSPECT_PCO2_RANGE: (f64, f64) = (200.0, 2000.0);
const FAIL_PCO2_RANGE: (f64, f64) = (100.0, 4000.0);
/// 20% of the blank absorbance full scale.
const MIN_ABSORBANCE_BLANK: f64 = 16384.0 * 0.20;
const MAX_BLANK_STEP: f64 = 2800.0;
const MAX_PCO2_STEP: f64 = 1600.0;

/// Light measurements (duplicate pairs) and derived values of one PCO2W stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Pco2wRecord {
    pub time: Vec<DateTime<Utc>>,
    pub dark_reference: Matrix,
    pub dark_signal: Matrix,
    pub reference_434: Matrix,
    pub signal_434: Matrix,
    pub reference_620: Matrix,
    pub signal_620: Matrix,
    pub absorbance_blank_434: Vec<f64>,
    pub absorbance_blank_620: Vec<f64>,
    pub pco2_seawater: Vec<f64>,
}

impl Pco2wRecord {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn validate(&self) -> Result<(), QcError> {
        let n = self.len();
        let arrays = [
            ("dark_reference", &self.dark_reference),
            ("dark_signal", &self.dark_signal),
            ("reference_434", &self.reference_434),
            ("signal_434", &self.signal_434),
            ("reference_620", &self.reference_620),
            ("signal_620", &self.signal_620),
        ];
        for (field, m) in arrays {
            check_matrix(field, m, n)?;
        }
        let series = [
            ("absorbance_blank_434", &self.absorbance_blank_434),
            ("absorbance_blank_620", &self.absorbance_blank_620),
            ("pco2_seawater", &self.pco2_seawater),
        ];
        for (field, v) in series {
            if v.len() != n {
                return Err(QcError::LengthMismatch {
                    field: field.into(),
                    expected: n,
                    actual: v.len(),
                });
            }
        }
        Ok(())
    }
}

/// Flag each sample of a PCO2W record.
pub fn pco2w_quality_checks(record: &Pco2wRecord) -> Result<Vec<QartodFlag>, QcError> {
    record.validate()?;

    let mut flags = FlagAccumulator::new(record.len());
    let (dark_lo, dark_hi) = DARK_RANGE;

    // suspect: dark reference or dark signal outside the electronics' normal range
    let bad_dark = |v: f64| v < dark_lo || v > dark_hi;
    let m_ref = any_across(&record.dark_reference, bad_dark);
    let m_sig = any_across(&record.dark_signal, bad_dark);
    flags.raise(QartodFlag::Suspect, &either(&m_ref, &m_sig));

    // suspect: signal near saturation
    let m434 = any_across(&record.signal_434, |v| v > SATURATED_SIGNAL);
    let m620 = any_across(&record.signal_620, |v| v > SATURATED_SIGNAL);
    flags.raise(QartodFlag::Suspect, &either(&m434, &m620));

    // suspect: outside the vendor calibration range
    let (lo, hi) = SUSPECT_PCO2_RANGE;
    let m: Vec<bool> = record
        .pco2_seawater
        .iter()
        .map(|&v| v < lo || v > hi)
        .collect();
    flags.raise(QartodFlag::Suspect, &m);

    // fail: no light reaching the detector
    let m434 = any_across(&record.signal_434, |v| v < DARK_SIGNAL);
    let m620 = any_across(&record.signal_620, |v| v < DARK_SIGNAL);
    flags.raise(QartodFlag::Fail, &either(&m434, &m620));

    // fail: 2x beyond the suspect limits, or not computed
    let (lo, hi) = FAIL_PCO2_RANGE;
    let m: Vec<bool> = record
        .pco2_seawater
        .iter()
        .map(|&v| v < lo || v > hi || v.is_nan())
        .collect();
    flags.raise(QartodFlag::Fail, &m);

    // fail: blank absorbance below 20% of full scale
    let m: Vec<bool> = record
        .absorbance_blank_434
        .iter()
        .zip(&record.absorbance_blank_620)
        .map(|(&a, &b)| a < MIN_ABSORBANCE_BLANK || b < MIN_ABSORBANCE_BLANK)
        .collect();
    flags.raise(QartodFlag::Fail, &m);

    // fail: abrupt steps in the blanks, pumps failed to clear the sample volume
    let m434 = large_step(&record.absorbance_blank_434, MAX_BLANK_STEP);
    let m620 = large_step(&record.absorbance_blank_620, MAX_BLANK_STEP);
    flags.raise(QartodFlag::Fail, &either(&m434, &m620));

    // fail: abrupt steps in pCO2, one of the ratios feeding it blew up
    let m = large_step(&record.pco2_seawater, MAX_PCO2_STEP);
    flags.raise(QartodFlag::Fail, &m);

    log::debug!("pco2w quality checks: {}", summarize(flags.flags()));
    Ok(flags.finish())
}

/// Steps over `limit`; a step into or out of a missing value counts as one.
fn large_step(values: &[f64], limit: f64) -> Vec<bool> {
    first_difference(values)
        .into_iter()
        .map(|d| d.is_nan() || d.abs() > limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn nominal(n: usize) -> Pco2wRecord {
        let t0 = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
        Pco2wRecord {
            time: (0..n).map(|i| t0 + chrono::Duration::hours(i as i64)).collect(),
            dark_reference: Matrix::filled(n, 2, 100.0),
            dark_signal: Matrix::filled(n, 2, 100.0),
            reference_434: Matrix::filled(n, 2, 2500.0),
            signal_434: Matrix::filled(n, 2, 2500.0),
            reference_620: Matrix::filled(n, 2, 2500.0),
            signal_620: Matrix::filled(n, 2, 2500.0),
            absorbance_blank_434: vec![10000.0; n],
            absorbance_blank_620: vec![10000.0; n],
            pco2_seawater: vec![400.0; n],
        }
    }

    fn flags(r: &Pco2wRecord) -> Vec<QartodFlag> {
        pco2w_quality_checks(r).unwrap()
    }

    #[test]
    fn nominal_samples_pass() {
        assert_eq!(flags(&nominal(4)), vec![QartodFlag::Pass; 4]);
    }

    #[test]
    fn any_dark_value_out_of_range_is_suspect() {
        let mut r = nominal(2);
        r.dark_signal.row_mut(1)[0] = 250.0;
        assert_eq!(flags(&r), vec![QartodFlag::Pass, QartodFlag::Suspect]);
    }

    #[test]
    fn near_saturated_signal_is_suspect_and_dark_signal_fails() {
        let mut r = nominal(2);
        r.signal_620.row_mut(0)[1] = 4050.0;
        r.signal_434.row_mut(1)[0] = 3.0;
        assert_eq!(flags(&r), vec![QartodFlag::Suspect, QartodFlag::Fail]);
    }

    #[test]
    fn pco2_ranges_map_to_suspect_and_fail() {
        let mut r = nominal(4);
        // steps between neighbours kept under the step limit
        r.pco2_seawater = vec![150.0, 150.0, 90.0, f64::NAN];
        assert_eq!(
            flags(&r),
            vec![
                QartodFlag::Suspect,
                QartodFlag::Suspect,
                QartodFlag::Fail,
                QartodFlag::Fail,
            ]
        );
    }

    #[test]
    fn low_absorbance_blank_fails() {
        let mut r = nominal(1);
        r.absorbance_blank_620[0] = 3000.0;
        assert_eq!(flags(&r), vec![QartodFlag::Fail]);
    }

    #[test]
    fn steps_fail_the_sample_after_the_jump() {
        let mut r = nominal(3);
        r.absorbance_blank_434 = vec![10000.0, 13000.0, 13000.0];
        assert_eq!(
            flags(&r),
            vec![QartodFlag::Pass, QartodFlag::Fail, QartodFlag::Pass]
        );

        let mut r = nominal(3);
        r.pco2_seawater = vec![400.0, 400.0, 1999.0];
        assert_eq!(
            flags(&r),
            vec![QartodFlag::Pass, QartodFlag::Pass, QartodFlag::Pass]
        );
        r.pco2_seawater[2] = 1900.0 + 200.0;
        assert_eq!(flags(&r)[2], QartodFlag::Fail);
    }

    #[test]
    fn missing_blank_fails_it_and_the_next_sample() {
        let mut r = nominal(4);
        r.absorbance_blank_434 = vec![10000.0, f64::NAN, 10000.0, 10000.0];
        assert_eq!(
            flags(&r),
            vec![
                QartodFlag::Pass,
                QartodFlag::Fail,
                QartodFlag::Fail,
                QartodFlag::Pass
            ]
        );

        // a missing first value has no step of its own
        let mut r = nominal(2);
        r.absorbance_blank_620[0] = f64::NAN;
        assert_eq!(flags(&r), vec![QartodFlag::Pass, QartodFlag::Fail]);
    }

    #[test]
    fn missing_series_length_is_reported() {
        let mut r = nominal(2);
        r.absorbance_blank_434.push(1.0);
        assert_eq!(
            pco2w_quality_checks(&r).unwrap_err(),
            QcError::LengthMismatch {
                field: "absorbance_blank_434".into(),
                expected: 2,
                actual: 3
            }
        );
    }
}
