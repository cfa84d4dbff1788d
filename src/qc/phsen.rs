//! Quality assessment of SAMI-pH (PHSEN) seawater pH.
//!
//! A subset of the QARTOD flags is used: 1 = pass, 3 = suspect or of high
//! interest, 4 = fail. Suspect thresholds come from experience with the
//! instrument and its data; fail thresholds come from the vendor processing
//! code. The final flag is the worst assessment across all tests.

use chrono::{DateTime, Utc};

use crate::data::model::Matrix;
use crate::error::QcError;

use super::flags::{FlagAccumulator, QartodFlag, summarize};
use super::stats::{all_across, either, std_across};

/// Full-scale count of the instrument's light detector.
pub const MAX_BITS: f64 = 4096.0;

/// Below this every blank/intensity measurement is too dim to be useful.
const LOW_COUNTS: f64 = MAX_BITS / 12.0;
/// Above this a measurement is saturated.
const SATURATED_COUNTS: f64 = MAX_BITS - MAX_BITS / 20.0;
/// Intensity this low means no light reached the detector at all.
const DARK_COUNTS: f64 = 5.0;

const SUSPECT_FLAT_STD: f64 = 180.0;
const FAIL_FLAT_STD: f64 = 60.0;
const SUSPECT_REFERENCE_STD: f64 = 10.0;

const SUSPECT_PH_RANGE: (f64, f64) = (7.4, 8.6);
const SENSOR_PH_RANGE: (f64, f64) = (6.9, 9.0);

/// The raw light measurements and the computed pH of one PHSEN stream.
///
/// Signal and reference arrays have one row per sample and one column per
/// measurement in the cycle (23 on the instrument); blank arrays have one
/// column per DI-water blank (4 on the instrument).
#[derive(Debug, Clone, PartialEq)]
pub struct PhsenRecord {
    pub time: Vec<DateTime<Utc>>,
    pub signal_434: Matrix,
    pub signal_578: Matrix,
    pub reference_434: Matrix,
    pub reference_578: Matrix,
    pub blank_signal_434: Matrix,
    pub blank_signal_578: Matrix,
    pub seawater_ph: Vec<f64>,
}

impl PhsenRecord {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Every array must have one row per sample and at least one
    /// sub-measurement.
    pub fn validate(&self) -> Result<(), QcError> {
        let n = self.len();
        let arrays = [
            ("signal_434", &self.signal_434),
            ("signal_578", &self.signal_578),
            ("reference_434", &self.reference_434),
            ("reference_578", &self.reference_578),
            ("blank_signal_434", &self.blank_signal_434),
            ("blank_signal_578", &self.blank_signal_578),
        ];
        for (field, m) in arrays {
            check_matrix(field, m, n)?;
        }
        if self.seawater_ph.len() != n {
            return Err(QcError::LengthMismatch {
                field: "seawater_ph".into(),
                expected: n,
                actual: self.seawater_ph.len(),
            });
        }
        Ok(())
    }
}

pub(crate) fn check_matrix(field: &str, m: &Matrix, n: usize) -> Result<(), QcError> {
    if m.nrows() != n {
        return Err(QcError::LengthMismatch {
            field: field.into(),
            expected: n,
            actual: m.nrows(),
        });
    }
    if m.ncols() == 0 && n > 0 {
        return Err(QcError::WidthMismatch {
            field: field.into(),
            expected: "at least 1".into(),
            actual: 0,
        });
    }
    Ok(())
}

/// Flag each sample of a PHSEN record.
///
/// Returns one flag per sample, each `Pass`, `Suspect` or `Fail`.
pub fn phsen_quality_checks(record: &PhsenRecord) -> Result<Vec<QartodFlag>, QcError> {
    record.validate()?;

    let mut flags = FlagAccumulator::new(record.len());
    let std_434 = std_across(&record.signal_434);
    let std_578 = std_across(&record.signal_578);

    // suspect: indicator signals getting too low for a good calculation
    let m434 = all_across(&record.signal_434, |v| v < LOW_COUNTS);
    let m578 = all_across(&record.signal_578, |v| v < LOW_COUNTS);
    flags.raise(QartodFlag::Suspect, &either(&m434, &m578));

    // suspect: flattening signal, pump starting to fail or obstructed
    let m434 = below(&std_434, SUSPECT_FLAT_STD);
    let m578 = below(&std_578, SUSPECT_FLAT_STD);
    flags.raise(QartodFlag::Suspect, &either(&m434, &m578));

    // suspect: outside real-world pH expectations
    let m = outside(&record.seawater_ph, SUSPECT_PH_RANGE);
    flags.raise(QartodFlag::Suspect, &m);

    // suspect: erratic reference measurements
    let m434 = above(&std_across(&record.reference_434), SUSPECT_REFERENCE_STD);
    let m578 = above(&std_across(&record.reference_578), SUSPECT_REFERENCE_STD);
    flags.raise(QartodFlag::Suspect, &either(&m434, &m578));

    // fail: blanks saturated or too low
    let bad_blank = |v: f64| v > SATURATED_COUNTS || v < LOW_COUNTS;
    let m434 = all_across(&record.blank_signal_434, bad_blank);
    let m578 = all_across(&record.blank_signal_578, bad_blank);
    flags.raise(QartodFlag::Fail, &either(&m434, &m578));

    // fail: intensities saturated or dark
    let bad_intensity = |v: f64| v > SATURATED_COUNTS || v < DARK_COUNTS;
    let m434 = all_across(&record.signal_434, bad_intensity);
    let m578 = all_across(&record.signal_578, bad_intensity);
    flags.raise(QartodFlag::Fail, &either(&m434, &m578));

    // fail: flat intensity, pump not working or flow cell obstructed
    let m434 = below(&std_434, FAIL_FLAT_STD);
    let m578 = below(&std_578, FAIL_FLAT_STD);
    flags.raise(QartodFlag::Fail, &either(&m434, &m578));

    // fail: outside the sensor range, or not computed
    let mut m = outside(&record.seawater_ph, SENSOR_PH_RANGE);
    for (hit, ph) in m.iter_mut().zip(&record.seawater_ph) {
        *hit |= ph.is_nan();
    }
    flags.raise(QartodFlag::Fail, &m);

    log::debug!("phsen quality checks: {}", summarize(flags.flags()));
    Ok(flags.finish())
}

fn below(values: &[f64], limit: f64) -> Vec<bool> {
    values.iter().map(|&v| v < limit).collect()
}

fn above(values: &[f64], limit: f64) -> Vec<bool> {
    values.iter().map(|&v| v > limit).collect()
}

fn outside(values: &[f64], (lo, hi): (f64, f64)) -> Vec<bool> {
    values.iter().map(|&v| v < lo || v > hi).collect()
}
