//! Per-sample reductions across sub-measurements, and NaN-skipping
//! summaries of 1D series.
//!
//! Reductions across a row follow plain IEEE semantics: a `NaN` anywhere in
//! a row makes `std_across` `NaN`, and every comparison against `NaN` is
//! false, so such rows never satisfy a threshold test.

use crate::data::model::Matrix;

/// `true` for each row where `pred` holds for every sub-measurement.
pub fn all_across(m: &Matrix, pred: impl Fn(f64) -> bool) -> Vec<bool> {
    m.iter_rows().map(|row| row.iter().all(|&v| pred(v))).collect()
}

/// `true` for each row where `pred` holds for at least one sub-measurement.
pub fn any_across(m: &Matrix, pred: impl Fn(f64) -> bool) -> Vec<bool> {
    m.iter_rows().map(|row| row.iter().any(|&v| pred(v))).collect()
}

/// Population standard deviation (divisor K) of each row.
pub fn std_across(m: &Matrix) -> Vec<f64> {
    m.iter_rows().map(population_std).collect()
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

/// Element-wise OR of two masks.
pub fn either(a: &[bool], b: &[bool]) -> Vec<bool> {
    a.iter().zip(b).map(|(&x, &y)| x || y).collect()
}

/// Difference from the previous sample; the first sample gets 0.
pub fn first_difference(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if !values.is_empty() {
        out.push(0.0);
    }
    out.extend(values.windows(2).map(|w| w[1] - w[0]));
    out
}

// ---------------------------------------------------------------------------
// NaN-skipping summaries
// ---------------------------------------------------------------------------

fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| !v.is_nan())
}

/// Mean of the non-NaN values; `NaN` if there are none.
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, n) = finite(values).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Population standard deviation of the non-NaN values.
pub fn nan_std(values: &[f64]) -> f64 {
    let kept: Vec<f64> = finite(values).collect();
    population_std(&kept)
}

/// Median of the non-NaN values; `NaN` if there are none.
pub fn nan_median(values: &[f64]) -> f64 {
    let mut kept: Vec<f64> = finite(values).collect();
    if kept.is_empty() {
        return f64::NAN;
    }
    kept.sort_by(f64::total_cmp);
    let mid = kept.len() / 2;
    if kept.len() % 2 == 0 {
        (kept[mid - 1] + kept[mid]) / 2.0
    } else {
        kept[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: Vec<Vec<f64>>) -> Matrix {
        Matrix::from_rows(rows).unwrap()
    }

    #[test]
    fn std_across_uses_population_divisor() {
        let s = std_across(&m(vec![vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]]));
        assert!((s[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn nan_in_a_row_never_satisfies_a_threshold() {
        let data = m(vec![vec![1.0, f64::NAN], vec![1.0, 1.0]]);
        assert_eq!(all_across(&data, |v| v < 10.0), vec![false, true]);
        let s = std_across(&data);
        assert!(s[0].is_nan());
        assert!(!(s[0] < 60.0));
    }

    #[test]
    fn first_difference_starts_at_zero() {
        assert_eq!(first_difference(&[1.0, 4.0, 2.0]), vec![0.0, 3.0, -2.0]);
        assert!(first_difference(&[]).is_empty());
    }

    #[test]
    fn nan_summaries_skip_missing_values() {
        let v = [1.0, f64::NAN, 3.0, 8.0];
        assert_eq!(nan_mean(&v), 4.0);
        assert_eq!(nan_median(&v), 3.0);
        assert_eq!(nan_median(&[4.0, 1.0]), 2.5);
        assert!(nan_mean(&[f64::NAN]).is_nan());
        assert!((nan_std(&[1.0, f64::NAN, 3.0]) - 1.0).abs() < 1e-12);
    }
}
