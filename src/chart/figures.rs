use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::color::{DeploymentColors, FIT_COLOR, OBSERVATION_COLOR, band_color, flag_color};
use crate::data::model::{OoiDataset, Variable, epoch_seconds};
use crate::error::ChartError;
use crate::qc::QartodFlag;

use super::bounds::{Spread, YBounds};
use super::ranges::{Climatology, GrossRange};
use super::{Band, Figure, Marker, Segment, Series};

/// Half-height of the timeseries view, in standard deviations.
const VIEW_SIGMA: f64 = 4.0;
/// Half-height of the gross range / climatology views.
const DIAGNOSTIC_VIEW_SIGMA: f64 = 5.0;

// ---------------------------------------------------------------------------
// Timeseries
// ---------------------------------------------------------------------------

/// Timeseries of `param`, optionally split and marked by deployment.
///
/// The view spans mean ± 4 std, or median ± 80% of the median when the
/// data contain values far enough out to make std exceed the median.
/// With `add_deployments` (and a deployment column), each deployment is its
/// own series and its first sample time gets a labelled vertical marker.
pub fn variable_figure(
    ds: &OoiDataset,
    param: &str,
    add_deployments: bool,
) -> Result<Figure, ChartError> {
    let var = plottable(ds, param)?;
    let x = ds.epoch_seconds();
    let spread = Spread::robust(&var.values);
    let mut fig = Figure::new(&ds.id, var.label(), spread.bounds(VIEW_SIGMA));

    match (add_deployments, ds.deployment.as_deref()) {
        (true, Some(deployment)) => {
            let colors = DeploymentColors::new(&ds.deployments());
            for d in ds.deployments() {
                let points = points_where(&x, &var.values, |i| deployment[i] == d);
                fig.series.push(Series {
                    name: d.to_string(),
                    points,
                    color: colors.color_for(d),
                    deployment: Some(d),
                });
            }
            fig.legend_title = Some("Deployments".to_string());
            fig.markers = deployment_markers(ds, &x, spread);
        }
        _ => fig.series.push(Series {
            name: var.long_name.clone(),
            points: points_where(&x, &var.values, |_| true),
            color: OBSERVATION_COLOR,
            deployment: None,
        }),
    }
    Ok(fig)
}

/// Timeseries of `param` coloured by quality flag, with deployment markers
/// when the dataset has deployments.
pub fn flagged_variable_figure(
    ds: &OoiDataset,
    param: &str,
    flags: &[QartodFlag],
) -> Result<Figure, ChartError> {
    let var = plottable(ds, param)?;
    if flags.len() != ds.len() {
        return Err(ChartError::FlagLengthMismatch {
            expected: ds.len(),
            actual: flags.len(),
        });
    }
    let x = ds.epoch_seconds();
    let spread = Spread::robust(&var.values);
    let mut fig = Figure::new(&ds.id, var.label(), spread.bounds(VIEW_SIGMA));

    let mut present: Vec<QartodFlag> = flags.to_vec();
    present.sort();
    present.dedup();
    match ds.deployment.as_deref() {
        Some(deployment) => {
            for flag in present {
                for d in ds.deployments() {
                    let points = points_where(&x, &var.values, |i| {
                        flags[i] == flag && deployment[i] == d
                    });
                    if points.is_empty() {
                        continue;
                    }
                    fig.series.push(Series {
                        name: flag.to_string(),
                        points,
                        color: flag_color(flag),
                        deployment: Some(d),
                    });
                }
            }
            fig.markers = deployment_markers(ds, &x, spread);
        }
        None => {
            for flag in present {
                fig.series.push(Series {
                    name: flag.to_string(),
                    points: points_where(&x, &var.values, |i| flags[i] == flag),
                    color: flag_color(flag),
                    deployment: None,
                });
            }
        }
    }
    fig.legend_title = Some("QC flag".to_string());
    Ok(fig)
}

/// One marker per deployment at its earliest sample, spanning the view,
/// labelled with the deployment number three std below the centre.
fn deployment_markers(ds: &OoiDataset, x: &[f64], spread: Spread) -> Vec<Marker> {
    let Some(deployment) = ds.deployment.as_deref() else {
        return Vec::new();
    };
    let view = spread.bounds(VIEW_SIGMA);
    ds.deployments()
        .into_iter()
        .map(|d| {
            let start = x
                .iter()
                .zip(deployment)
                .filter(|&(_, &dd)| dd == d)
                .map(|(&t, _)| t)
                .fold(f64::INFINITY, f64::min);
            Marker {
                x: start,
                y_range: (view.min, view.max),
                label: d.to_string(),
                label_y: spread.center - 3.0 * spread.std,
                deployment: Some(d),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Observations over the gross range suspect envelope, coloured by the
/// outcome of the gross range test.
pub fn gross_range_figure(
    ds: &OoiDataset,
    param: &str,
    gross_range: &GrossRange,
) -> Result<Figure, ChartError> {
    let var = plottable(ds, param)?;
    let x = ds.epoch_seconds();
    let mut fig = Figure::new(&ds.id, var.label(), diagnostic_bounds(var));

    if let Some(span) = time_span(&x) {
        fig.bands.push(Band {
            name: "Gross range (suspect)".to_string(),
            x_range: span,
            y_range: (gross_range.suspect_min, gross_range.suspect_max),
            color: band_color(),
        });
    }
    fig.series.extend(by_outcome(&x, &var.values, &gross_range.flags(&var.values)));
    Ok(fig)
}

/// Observations over the monthly climatological fit and its ±3 std envelope,
/// coloured by the outcome of the climatology test.
pub fn climatology_figure(
    ds: &OoiDataset,
    param: &str,
    climatology: &Climatology,
) -> Result<Figure, ChartError> {
    let var = plottable(ds, param)?;
    let x = ds.epoch_seconds();
    let title = ds.id.split('-').take(4).collect::<Vec<_>>().join("-");
    let mut fig = Figure::new(title, var.long_name.clone(), diagnostic_bounds(var));

    let outcomes: Vec<QartodFlag> = ds
        .time
        .iter()
        .zip(&var.values)
        .map(|(t, &v)| climatology.flag(t, v))
        .collect();
    fig.series.extend(by_outcome(&x, &var.values, &outcomes));
    if let (Some(first), Some(last)) = (ds.time.iter().min(), ds.time.iter().max()) {
        for (start, end, month) in month_spans(first, last) {
            let Some((fit, std)) = climatology.month(month) else {
                continue;
            };
            let x_range = (epoch_seconds(&start), epoch_seconds(&end));
            fig.segments.push(Segment {
                name: "Climatological Fit".to_string(),
                x_range,
                y: fit,
                color: FIT_COLOR,
                width: 3.0,
            });
            fig.bands.push(Band {
                name: "3σ".to_string(),
                x_range,
                y_range: (fit - 3.0 * std, fit + 3.0 * std),
                color: band_color(),
            });
        }
    }
    Ok(fig)
}

/// `(first of month, last day of month, month number)` for every calendar
/// month from `first` through `last`.
fn month_spans(
    first: &DateTime<Utc>,
    last: &DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>, u32)> {
    let mut spans = Vec::new();
    let (mut year, mut month) = (first.year(), first.month());
    while (year, month) <= (last.year(), last.month()) {
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let start = NaiveDate::from_ymd_opt(year, month, 1);
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt());
        if let (Some(start), Some(end)) = (start, end) {
            spans.push((midnight(start), midnight(end), month));
        }
        (year, month) = (next_year, next_month);
    }
    spans
}

fn midnight(d: NaiveDate) -> DateTime<Utc> {
    d.and_time(chrono::NaiveTime::MIN).and_utc()
}

// -- helpers --

fn plottable<'a>(ds: &'a OoiDataset, param: &str) -> Result<&'a Variable, ChartError> {
    ds.variable(param)
        .ok_or_else(|| ChartError::UnknownVariable(param.to_string()))
}

fn diagnostic_bounds(var: &Variable) -> YBounds {
    Spread::of(&var.values).bounds(DIAGNOSTIC_VIEW_SIGMA)
}

/// Passing values as "Observations", then one series per other outcome.
fn by_outcome(x: &[f64], y: &[f64], outcomes: &[QartodFlag]) -> Vec<Series> {
    let mut present: Vec<QartodFlag> = outcomes.to_vec();
    present.sort();
    present.dedup();
    present
        .into_iter()
        .filter_map(|flag| {
            let points = points_where(x, y, |i| outcomes[i] == flag);
            if points.is_empty() {
                return None;
            }
            let (name, color) = match flag {
                QartodFlag::Pass => ("Observations".to_string(), OBSERVATION_COLOR),
                other => (other.to_string(), flag_color(other)),
            };
            Some(Series {
                name,
                points,
                color,
                deployment: None,
            })
        })
        .collect()
}

/// `[t, v]` pairs for the selected samples; missing values are not drawn.
fn points_where(x: &[f64], y: &[f64], keep: impl Fn(usize) -> bool) -> Vec<[f64; 2]> {
    x.iter()
        .zip(y)
        .enumerate()
        .filter(|&(i, (_, v))| keep(i) && !v.is_nan())
        .map(|(_, (&t, &v))| [t, v])
        .collect()
}

fn time_span(x: &[f64]) -> Option<(f64, f64)> {
    let min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min <= max).then_some((min, max))
}
