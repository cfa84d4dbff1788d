use std::fmt;

use clap::ValueEnum;

use crate::error::QcError;
use crate::qc::{self, Pco2wRecord, PhsenRecord, QartodFlag};

use super::model::{Matrix, OoiDataset, Variable};

/// Channels interleaved in a PHSEN light record: reference 434,
/// signal 434, reference 578, signal 578.
const PHSEN_CHANNELS: usize = 4;
/// Fill value used by OOINet for absent integer data.
pub const FILL_VALUE: f64 = -9_999_999.0;

// ---------------------------------------------------------------------------
// Instrument selection
// ---------------------------------------------------------------------------

/// Instruments with a quality-check routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Instrument {
    /// SAMI-pH seawater pH sensor.
    Phsen,
    /// SAMI-CO2 seawater pCO2 sensor.
    Pco2w,
}

impl Instrument {
    /// Guess the instrument from the derived data product a dataset carries.
    pub fn detect(ds: &OoiDataset) -> Option<Self> {
        if ds.variable("seawater_ph").is_some() {
            Some(Instrument::Phsen)
        } else if ds.variable("pco2_seawater").is_some() {
            Some(Instrument::Pco2w)
        } else {
            None
        }
    }

    /// Name of the variable the flags are stored under.
    pub fn flag_variable(self) -> &'static str {
        match self {
            Instrument::Phsen => "seawater_ph_quality_flag",
            Instrument::Pco2w => "pco2_seawater_quality_flag",
        }
    }

    fn flag_long_name(self) -> &'static str {
        match self {
            Instrument::Phsen => "Seawater pH Quality Flag",
            Instrument::Pco2w => "pCO2 Seawater Quality Flag",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instrument::Phsen => write!(f, "PHSEN"),
            Instrument::Pco2w => write!(f, "PCO2W"),
        }
    }
}

/// Run the instrument's checks and store the flags in the dataset, as a
/// variable named by [`Instrument::flag_variable`].
pub fn attach_quality_flags(
    ds: &mut OoiDataset,
    instrument: Instrument,
) -> Result<Vec<QartodFlag>, QcError> {
    let flags = match instrument {
        Instrument::Phsen => qc::phsen_quality_checks(&phsen_record(ds)?)?,
        Instrument::Pco2w => qc::pco2w_quality_checks(&pco2w_record(ds)?)?,
    };
    let mut var = Variable::new(
        instrument.flag_variable(),
        flags.iter().map(|f| f64::from(f.code())).collect(),
    );
    var.long_name = instrument.flag_long_name().to_string();
    ds.insert_variable(instrument.flag_variable(), var);
    Ok(flags)
}

// ---------------------------------------------------------------------------
// PHSEN
// ---------------------------------------------------------------------------

/// Assemble a [`PhsenRecord`] from a dataset.
///
/// Uses the split channel arrays (`signal_434`, ...) when present,
/// otherwise de-interleaves the raw `light_measurements` and
/// `reference_light_measurements` arrays as recorded by the instrument.
pub fn phsen_record(ds: &OoiDataset) -> Result<PhsenRecord, QcError> {
    let seawater_ph = required_variable(ds, "seawater_ph")?;

    let [reference_434, signal_434, reference_578, signal_578] =
        match (ds.array("signal_434"), ds.array("light_measurements")) {
            (Some(_), _) | (None, None) => [
                required_array(ds, "reference_434")?,
                required_array(ds, "signal_434")?,
                required_array(ds, "reference_578")?,
                required_array(ds, "signal_578")?,
            ],
            (None, Some(light)) => split_phsen_channels("light_measurements", light)?,
        };

    let (blank_signal_434, blank_signal_578) = match (
        ds.array("blank_signal_434"),
        ds.array("reference_light_measurements"),
    ) {
        (Some(_), _) | (None, None) => (
            required_array(ds, "blank_signal_434")?,
            required_array(ds, "blank_signal_578")?,
        ),
        (None, Some(blanks)) => {
            let [_, b434, _, b578] = split_phsen_channels("reference_light_measurements", blanks)?;
            (b434, b578)
        }
    };

    Ok(PhsenRecord {
        time: ds.time.clone(),
        signal_434,
        signal_578,
        reference_434,
        reference_578,
        blank_signal_434,
        blank_signal_578,
        seawater_ph,
    })
}

/// Split an `N x 4m` PHSEN record into its four `N x m` channels.
pub fn split_phsen_channels(field: &str, light: &Matrix) -> Result<[Matrix; 4], QcError> {
    if light.ncols() == 0 || light.ncols() % PHSEN_CHANNELS != 0 {
        return Err(QcError::WidthMismatch {
            field: field.into(),
            expected: format!("a multiple of {PHSEN_CHANNELS}"),
            actual: light.ncols(),
        });
    }
    Ok([0, 1, 2, 3].map(|c| light.stride_columns(c, PHSEN_CHANNELS)))
}

// ---------------------------------------------------------------------------
// PCO2W
// ---------------------------------------------------------------------------

/// Assemble a [`Pco2wRecord`] from a dataset.
///
/// The duplicate light measurements sit at fixed offsets 8 apart in the
/// raw `light_measurements` array. Absent blank absorbances are filled
/// with [`FILL_VALUE`].
pub fn pco2w_record(ds: &OoiDataset) -> Result<Pco2wRecord, QcError> {
    let pco2_seawater = required_variable(ds, "pco2_seawater")?;
    let n = ds.len();

    let [dark_reference, dark_signal, reference_434, signal_434, reference_620, signal_620] =
        match ds.array("light_measurements") {
            Some(light) => split_pco2w_light(light)?,
            None => [
                required_array(ds, "dark_reference")?,
                required_array(ds, "dark_signal")?,
                required_array(ds, "reference_434")?,
                required_array(ds, "signal_434")?,
                required_array(ds, "reference_620")?,
                required_array(ds, "signal_620")?,
            ],
        };

    let blank = |name: &str| {
        ds.variable(name)
            .map(|v| v.values.clone())
            .unwrap_or_else(|| vec![FILL_VALUE; n])
    };

    Ok(Pco2wRecord {
        time: ds.time.clone(),
        dark_reference,
        dark_signal,
        reference_434,
        signal_434,
        reference_620,
        signal_620,
        absorbance_blank_434: blank("absorbance_blank_434"),
        absorbance_blank_620: blank("absorbance_blank_620"),
        pco2_seawater,
    })
}

/// Pull the six duplicate-pair channels out of a PCO2W light record.
pub fn split_pco2w_light(light: &Matrix) -> Result<[Matrix; 6], QcError> {
    if light.ncols() < 14 {
        return Err(QcError::WidthMismatch {
            field: "light_measurements".into(),
            expected: "at least 14".into(),
            actual: light.ncols(),
        });
    }
    Ok([0, 1, 2, 3, 4, 5].map(|c| light.select_columns(&[c, c + 8])))
}

// -- helpers --

fn required_array(ds: &OoiDataset, name: &str) -> Result<Matrix, QcError> {
    ds.array(name)
        .cloned()
        .ok_or_else(|| QcError::MissingField(name.into()))
}

fn required_variable(ds: &OoiDataset, name: &str) -> Result<Vec<f64>, QcError> {
    ds.variable(name)
        .map(|v| v.values.clone())
        .ok_or_else(|| QcError::MissingField(name.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn dataset(n: usize) -> OoiDataset {
        let t0 = Utc.with_ymd_and_hms(2022, 4, 1, 0, 0, 0).unwrap();
        let time = (0..n).map(|i| t0 + chrono::Duration::hours(i as i64)).collect();
        OoiDataset::new("CE01ISSM-RID16-06-PHSEND000", time)
    }

    /// 23 cycles of (ref434, sig434, ref578, sig578) per sample.
    fn raw_light(n: usize) -> Matrix {
        let row: Vec<f64> = (0..23)
            .flat_map(|k| {
                let sig = if k % 2 == 0 { 1500.0 } else { 2500.0 };
                [2000.0, sig, 2000.0, sig]
            })
            .collect();
        Matrix::from_rows(vec![row; n]).unwrap()
    }

    #[test]
    fn phsen_record_from_raw_instrument_arrays() {
        let mut ds = dataset(2);
        ds.insert_variable("seawater_ph", Variable::new("seawater_ph", vec![8.0, 10.0]));
        ds.insert_array("light_measurements", raw_light(2));
        ds.insert_array(
            "reference_light_measurements",
            Matrix::from_rows(vec![vec![1.0, 2.0, 3.0, 4.0].repeat(4); 2]).unwrap(),
        );

        let record = phsen_record(&ds).unwrap();
        assert_eq!(record.signal_434.ncols(), 23);
        assert_eq!(record.reference_578.row(0)[5], 2000.0);
        assert_eq!(record.signal_578.row(1)[1], 2500.0);
        assert_eq!(record.blank_signal_434.row(0), &[2.0, 2.0, 2.0, 2.0]);
        assert_eq!(record.blank_signal_578.row(0), &[4.0, 4.0, 4.0, 4.0]);
    }

    #[test]
    fn attach_stores_flag_variable() {
        let mut ds = dataset(2);
        ds.insert_variable("seawater_ph", Variable::new("seawater_ph", vec![8.0, 10.0]));
        ds.insert_array("light_measurements", raw_light(2));
        ds.insert_array("blank_signal_434", Matrix::filled(2, 4, 2000.0));
        ds.insert_array("blank_signal_578", Matrix::filled(2, 4, 2000.0));

        let instrument = Instrument::detect(&ds).unwrap();
        assert_eq!(instrument, Instrument::Phsen);
        let flags = attach_quality_flags(&mut ds, instrument).unwrap();
        assert_eq!(flags, vec![QartodFlag::Pass, QartodFlag::Fail]);
        assert_eq!(
            ds.variable("seawater_ph_quality_flag").unwrap().values,
            vec![1.0, 4.0]
        );
    }

    #[test]
    fn missing_fields_are_named() {
        let mut ds = dataset(1);
        assert_eq!(
            phsen_record(&ds).unwrap_err(),
            QcError::MissingField("seawater_ph".into())
        );
        ds.insert_variable("seawater_ph", Variable::new("seawater_ph", vec![8.0]));
        assert_eq!(
            phsen_record(&ds).unwrap_err(),
            QcError::MissingField("reference_434".into())
        );
    }

    #[test]
    fn odd_light_width_is_rejected() {
        let light = Matrix::filled(1, 7, 0.0);
        assert!(matches!(
            split_phsen_channels("light_measurements", &light),
            Err(QcError::WidthMismatch { actual: 7, .. })
        ));
    }

    #[test]
    fn pco2w_light_pairs_are_eight_apart() {
        let row: Vec<f64> = (0..16).map(f64::from).collect();
        let light = Matrix::from_rows(vec![row]).unwrap();
        let [dark_ref, _, _, sig434, _, sig620] = split_pco2w_light(&light).unwrap();
        assert_eq!(dark_ref.row(0), &[0.0, 8.0]);
        assert_eq!(sig434.row(0), &[3.0, 11.0]);
        assert_eq!(sig620.row(0), &[5.0, 13.0]);
    }

    #[test]
    fn pco2w_missing_blanks_fail() {
        let mut ds = dataset(1);
        ds.insert_variable("pco2_seawater", Variable::new("pco2_seawater", vec![400.0]));
        let row = [100.0, 100.0, 2500.0, 2500.0, 2500.0, 2500.0, 0.0, 0.0].repeat(2);
        ds.insert_array("light_measurements", Matrix::from_rows(vec![row]).unwrap());
        assert_eq!(Instrument::detect(&ds), Some(Instrument::Pco2w));
        let record = pco2w_record(&ds).unwrap();
        assert_eq!(record.absorbance_blank_434, vec![FILL_VALUE]);
        assert_eq!(
            attach_quality_flags(&mut ds, Instrument::Pco2w).unwrap(),
            vec![QartodFlag::Fail]
        );
    }
}
