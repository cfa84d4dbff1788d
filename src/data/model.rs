use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::error::ShapeError;

// ---------------------------------------------------------------------------
// Matrix – a per-sample block of sub-measurements
// ---------------------------------------------------------------------------

/// Row-major `rows x cols` array of `f64`.
///
/// One row per time sample, one column per sub-measurement (e.g. the 23
/// light measurements a PHSEN takes per cycle). Missing values are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Matrix {
    /// Wrap a flat row-major buffer.
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, ShapeError> {
        if rows * cols != values.len() {
            return Err(ShapeError::Size {
                rows,
                cols,
                values: values.len(),
            });
        }
        Ok(Matrix { rows, cols, values })
    }

    /// Build from one `Vec` per sample. Every row must have the same width.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ShapeError> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * cols);
        for (row, r) in rows.iter().enumerate() {
            if r.len() != cols {
                return Err(ShapeError::Ragged {
                    row,
                    expected: cols,
                    actual: r.len(),
                });
            }
            values.extend_from_slice(r);
        }
        Ok(Matrix {
            rows: rows.len(),
            cols,
            values,
        })
    }

    /// Every entry set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Matrix {
            rows,
            cols,
            values: vec![value; rows * cols],
        }
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// The sub-measurements of sample `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.values[i * self.cols..(i + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// New matrix made of the given columns, in the given order.
    ///
    /// Panics if a column index is out of range; callers check the width first.
    pub fn select_columns(&self, columns: &[usize]) -> Matrix {
        let mut values = Vec::with_capacity(self.rows * columns.len());
        for row in self.iter_rows() {
            values.extend(columns.iter().map(|&c| row[c]));
        }
        Matrix {
            rows: self.rows,
            cols: columns.len(),
            values,
        }
    }

    /// Every `step`-th column starting at `offset`: de-interleaves
    /// `[a0, b0, c0, a1, b1, c1, ...]` style instrument records.
    pub fn stride_columns(&self, offset: usize, step: usize) -> Matrix {
        let columns: Vec<usize> = (offset..self.cols).step_by(step.max(1)).collect();
        self.select_columns(&columns)
    }
}

// ---------------------------------------------------------------------------
// Variable – one scalar data variable of a dataset
// ---------------------------------------------------------------------------

/// A 1D data variable with its display attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Human readable name used as the y axis label.
    pub long_name: String,
    pub units: Option<String>,
    pub values: Vec<f64>,
}

impl Variable {
    /// A variable whose long name defaults to its column name.
    pub fn new(name: &str, values: Vec<f64>) -> Self {
        Variable {
            long_name: name.to_string(),
            units: None,
            values,
        }
    }

    /// Axis label: long name plus units when known.
    pub fn label(&self) -> String {
        match &self.units {
            Some(u) if !u.is_empty() => format!("{} [{u}]", self.long_name),
            _ => self.long_name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// OoiDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// One instrument stream, indexed by time.
///
/// Mirrors the shape of an OOINet NetCDF download: a `time` coordinate,
/// an optional per-sample `deployment` number, scalar data variables and
/// 2D array variables (sample x sub-measurement). Every column has
/// `time.len()` entries.
#[derive(Debug, Clone, Default)]
pub struct OoiDataset {
    /// Reference designator / stream id, used as the chart title.
    pub id: String,
    pub time: Vec<DateTime<Utc>>,
    pub deployment: Option<Vec<i64>>,
    pub variables: BTreeMap<String, Variable>,
    pub arrays: BTreeMap<String, Matrix>,
}

impl OoiDataset {
    pub fn new(id: impl Into<String>, time: Vec<DateTime<Utc>>) -> Self {
        OoiDataset {
            id: id.into(),
            time,
            ..Default::default()
        }
    }

    /// Number of time samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn array(&self, name: &str) -> Option<&Matrix> {
        self.arrays.get(name)
    }

    pub fn insert_variable(&mut self, name: impl Into<String>, variable: Variable) {
        self.variables.insert(name.into(), variable);
    }

    pub fn insert_array(&mut self, name: impl Into<String>, array: Matrix) {
        self.arrays.insert(name.into(), array);
    }

    /// Names of the scalar variables, i.e. everything that can be charted.
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    /// Sorted unique deployment numbers (empty without a deployment column).
    pub fn deployments(&self) -> BTreeSet<i64> {
        self.deployment
            .as_deref()
            .map(|d| d.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Time axis as float seconds since 1970-01-01.
    pub fn epoch_seconds(&self) -> Vec<f64> {
        self.time.iter().map(epoch_seconds).collect()
    }
}

/// Seconds since 1970-01-01 as a float, with sub-second precision.
pub fn epoch_seconds(t: &DateTime<Utc>) -> f64 {
    t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1e9
}

/// Inverse of [`epoch_seconds`]. `None` for non-finite or out-of-range input.
pub fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos)
}

// ---------------------------------------------------------------------------
// Discrete (bottle) samples
// ---------------------------------------------------------------------------

/// A latitude / longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }
}

/// One row of an OOI discrete sample summary sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct BottleSample {
    pub location: GeoPoint,
    /// CTD depth in metres, `NaN` when not recorded.
    pub depth: f64,
    /// Every other column of the sheet, as text.
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_ragged_input() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::Ragged {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn stride_columns_deinterleaves_channels() {
        let m = Matrix::from_rows(vec![vec![0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0]]).unwrap();
        assert_eq!(m.stride_columns(1, 4).row(0), &[1.0, 11.0]);
        assert_eq!(m.stride_columns(3, 4).row(0), &[3.0, 13.0]);
    }

    #[test]
    fn epoch_seconds_round_trips_sub_second_times() {
        let t = from_epoch_seconds(1_650_000_000.25).unwrap();
        assert!((epoch_seconds(&t) - 1_650_000_000.25).abs() < 1e-6);
        assert!(from_epoch_seconds(f64::NAN).is_none());
    }

    #[test]
    fn variable_label_includes_units() {
        let mut v = Variable::new("sea_water_temperature", vec![]);
        assert_eq!(v.label(), "sea_water_temperature");
        v.units = Some("degrees_Celsius".into());
        assert_eq!(v.label(), "sea_water_temperature [degrees_Celsius]");
    }
}
