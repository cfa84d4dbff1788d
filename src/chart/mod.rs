//! Chart construction, independent of rendering.
//!
//! Builders in [`figures`] turn a dataset and a parameter name into a
//! [`Figure`]: scatter series, filled bands, horizontal segments and
//! labelled vertical markers, plus the y bounds the view should open on.
//! The viewer draws a `Figure` with `egui_plot`; tests inspect it directly.

use std::collections::BTreeSet;

use eframe::egui::Color32;

pub mod bounds;
pub mod figures;
pub mod ranges;

pub use bounds::{Spread, YBounds};
pub use figures::{climatology_figure, flagged_variable_figure, gross_range_figure, variable_figure};
pub use ranges::{Climatology, GrossRange};

/// Scatter points sharing a legend entry. `x` is epoch seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub color: Color32,
    pub deployment: Option<i64>,
}

/// Filled rectangle spanning `x_range` x `y_range`.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub name: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub color: Color32,
}

/// Horizontal line from `x_range.0` to `x_range.1` at `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub x_range: (f64, f64),
    pub y: f64,
    pub color: Color32,
    pub width: f32,
}

/// Vertical line with a text label, e.g. the start of a deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub x: f64,
    pub y_range: (f64, f64),
    pub label: String,
    pub label_y: f64,
    pub deployment: Option<i64>,
}

/// A fully described chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend_title: Option<String>,
    pub series: Vec<Series>,
    pub bands: Vec<Band>,
    pub segments: Vec<Segment>,
    pub markers: Vec<Marker>,
    pub y_bounds: YBounds,
}

impl Figure {
    pub fn new(title: impl Into<String>, y_label: impl Into<String>, y_bounds: YBounds) -> Self {
        Figure {
            title: title.into(),
            x_label: "time".to_string(),
            y_label: y_label.into(),
            legend_title: None,
            series: Vec::new(),
            bands: Vec::new(),
            segments: Vec::new(),
            markers: Vec::new(),
            y_bounds,
        }
    }

    /// Drop series and markers belonging to deployments not in `visible`.
    pub fn retain_deployments(&mut self, visible: &BTreeSet<i64>) {
        let keep = |d: Option<i64>| d.map_or(true, |d| visible.contains(&d));
        self.series.retain(|s| keep(s.deployment));
        self.markers.retain(|m| keep(m.deployment));
    }

    /// Initial view as `(min, max)` corners: the drawn x extent and
    /// `y_bounds`. `None` when nothing is drawn or the bounds are not finite,
    /// so samples outside `y_bounds` stay off screen until the user zooms out.
    pub fn view_bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        if !self.y_bounds.is_finite() {
            return None;
        }
        let xs = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p[0]))
            .chain(self.bands.iter().flat_map(|b| [b.x_range.0, b.x_range.1]))
            .chain(self.segments.iter().flat_map(|s| [s.x_range.0, s.x_range.1]))
            .chain(self.markers.iter().map(|m| m.x));
        let (x0, x1) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        });
        (x0 <= x1).then_some(([x0, self.y_bounds.min], [x1, self.y_bounds.max]))
    }

    /// Total number of plotted observations.
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}
