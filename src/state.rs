use std::collections::BTreeSet;
use std::fmt;

use ooi_explorer::chart::{
    Climatology, Figure, GrossRange, climatology_figure, flagged_variable_figure,
    gross_range_figure, variable_figure,
};
use ooi_explorer::config::ExplorerConfig;
use ooi_explorer::data::filter::{find_samples, haversine_km};
use ooi_explorer::data::model::{BottleSample, OoiDataset};
use ooi_explorer::data::record::{Instrument, attach_quality_flags};
use ooi_explorer::error::ChartError;
use ooi_explorer::qc::QartodFlag;
use ooi_explorer::qc::stats::nan_mean;

// ---------------------------------------------------------------------------
// View selections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Timeseries,
    GrossRange,
    Climatology,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::Timeseries,
        ChartKind::GrossRange,
        ChartKind::Climatology,
    ];
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Timeseries => write!(f, "Timeseries"),
            ChartKind::GrossRange => write!(f, "Gross range"),
            ChartKind::Climatology => write!(f, "Climatology"),
        }
    }
}

/// How timeseries points are coloured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorBy {
    Deployment,
    QcFlag,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until user loads a file).
    pub dataset: Option<OoiDataset>,

    pub config: ExplorerConfig,

    /// Variable shown in the plot.
    pub selected_param: Option<String>,

    pub chart_kind: ChartKind,

    /// Split the timeseries by deployment and mark deployment starts.
    pub add_deployments: bool,

    pub color_by: ColorBy,

    /// QC flags computed when the dataset was loaded.
    pub flags: Option<(Instrument, Vec<QartodFlag>)>,

    /// Tables loaded from file for the selected parameter; derived from
    /// the data when absent.
    pub gross_range: Option<GrossRange>,
    pub climatology: Option<Climatology>,

    /// Deployments currently drawn.
    pub visible_deployments: BTreeSet<i64>,

    /// Figure for the current selections (cached).
    pub figure: Option<Figure>,

    /// Set when `figure` is rebuilt; the plot then opens on the figure's
    /// bounds instead of the previous pan and zoom.
    pub reset_view: bool,

    /// Discrete samples loaded from file, and those near the buoy.
    pub bottle_samples: Vec<BottleSample>,
    pub matched_samples: Vec<BottleSample>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new(ExplorerConfig::default())
    }
}

impl AppState {
    pub fn new(config: ExplorerConfig) -> Self {
        Self {
            dataset: None,
            add_deployments: config.chart.add_deployments,
            config,
            selected_param: None,
            chart_kind: ChartKind::Timeseries,
            color_by: ColorBy::Deployment,
            flags: None,
            gross_range: None,
            climatology: None,
            visible_deployments: BTreeSet::new(),
            figure: None,
            reset_view: false,
            bottle_samples: Vec::new(),
            matched_samples: Vec::new(),
            status_message: None,
            loading: false,
        }
    }

    /// Ingest a newly loaded dataset: run the instrument's QC checks when
    /// it can be identified, select its data product and build the figure.
    pub fn set_dataset(&mut self, mut dataset: OoiDataset) {
        self.status_message = None;
        let instrument = Instrument::detect(&dataset);
        self.flags = instrument.and_then(|instrument| {
            match attach_quality_flags(&mut dataset, instrument) {
                Ok(flags) => Some((instrument, flags)),
                Err(e) => {
                    log::warn!("{instrument} checks skipped: {e}");
                    self.status_message = Some(format!("QC not run: {e}"));
                    None
                }
            }
        });

        self.visible_deployments = dataset.deployments();
        self.selected_param = match instrument {
            Some(Instrument::Phsen) => Some("seawater_ph".to_string()),
            Some(Instrument::Pco2w) => Some("pco2_seawater".to_string()),
            None => dataset.variable_names().into_iter().next(),
        };
        self.gross_range = None;
        self.climatology = None;

        self.dataset = Some(dataset);
        self.loading = false;
        self.rebuild_figure();
    }

    /// Select the plotted variable; tables loaded for the previous one are
    /// dropped.
    pub fn set_param(&mut self, param: String) {
        if self.selected_param.as_deref() != Some(param.as_str()) {
            self.gross_range = None;
            self.climatology = None;
        }
        self.selected_param = Some(param);
        self.rebuild_figure();
    }

    pub fn set_chart_kind(&mut self, kind: ChartKind) {
        self.chart_kind = kind;
        self.rebuild_figure();
    }

    pub fn set_color_by(&mut self, color_by: ColorBy) {
        self.color_by = color_by;
        self.rebuild_figure();
    }

    pub fn set_add_deployments(&mut self, on: bool) {
        self.add_deployments = on;
        self.rebuild_figure();
    }

    pub fn set_gross_range(&mut self, table: GrossRange) {
        self.gross_range = Some(table);
        self.chart_kind = ChartKind::GrossRange;
        self.rebuild_figure();
    }

    pub fn set_climatology(&mut self, table: Climatology) {
        self.climatology = Some(table);
        self.chart_kind = ChartKind::Climatology;
        self.rebuild_figure();
    }

    /// Recompute the figure after any selection change.
    pub fn rebuild_figure(&mut self) {
        match self.build_figure() {
            Ok(mut figure) => {
                if let Some(fig) = &mut figure {
                    fig.retain_deployments(&self.visible_deployments);
                }
                self.reset_view = figure.is_some();
                self.figure = figure;
            }
            Err(e) => {
                log::error!("Cannot draw chart: {e}");
                self.status_message = Some(format!("Error: {e}"));
                self.figure = None;
            }
        }
    }

    fn build_figure(&self) -> Result<Option<Figure>, ChartError> {
        let (Some(ds), Some(param)) = (&self.dataset, self.selected_param.as_deref()) else {
            return Ok(None);
        };
        let figure = match self.chart_kind {
            ChartKind::Timeseries => match (&self.flags, self.color_by) {
                (Some((_, flags)), ColorBy::QcFlag) => flagged_variable_figure(ds, param, flags)?,
                _ => variable_figure(ds, param, self.add_deployments)?,
            },
            ChartKind::GrossRange => {
                let table = match self.gross_range {
                    Some(table) => table,
                    None => derived_gross_range(ds, param)?,
                };
                gross_range_figure(ds, param, &table)?
            }
            ChartKind::Climatology => match &self.climatology {
                Some(table) => climatology_figure(ds, param, table)?,
                None => climatology_figure(ds, param, &Climatology::from_dataset(ds, param)?)?,
            },
        };
        Ok(Some(figure))
    }

    /// Show or hide one deployment.
    pub fn toggle_deployment(&mut self, deployment: i64) {
        if !self.visible_deployments.remove(&deployment) {
            self.visible_deployments.insert(deployment);
        }
        self.rebuild_figure();
    }

    pub fn select_all_deployments(&mut self) {
        if let Some(ds) = &self.dataset {
            self.visible_deployments = ds.deployments();
            self.rebuild_figure();
        }
    }

    pub fn select_no_deployments(&mut self) {
        self.visible_deployments.clear();
        self.rebuild_figure();
    }

    /// Store discrete samples and keep those near the configured site.
    pub fn set_bottle_samples(&mut self, samples: Vec<BottleSample>) {
        let site = &self.config.site;
        self.matched_samples = find_samples(
            &samples,
            site.buoy(),
            site.depth,
            site.max_distance_km,
            site.depth_tolerance,
        );
        log::info!(
            "{} of {} discrete samples match the site",
            self.matched_samples.len(),
            samples.len()
        );
        self.bottle_samples = samples;
    }

    /// Distance of a sample from the configured buoy, in km.
    pub fn distance_km(&self, sample: &BottleSample) -> f64 {
        haversine_km(sample.location, self.config.site.buoy())
    }

    /// Mean of the matched samples' value in `column`, skipping blanks.
    pub fn matched_mean(&self, column: &str) -> Option<f64> {
        let values: Vec<f64> = self
            .matched_samples
            .iter()
            .filter_map(|s| s.metadata.get(column)?.trim().parse().ok())
            .collect();
        let mean = nan_mean(&values);
        mean.is_finite().then_some(mean)
    }
}

/// Gross range from the data itself, fail limits at its extremes.
fn derived_gross_range(ds: &OoiDataset, param: &str) -> Result<GrossRange, ChartError> {
    let var = ds
        .variable(param)
        .ok_or_else(|| ChartError::UnknownVariable(param.to_string()))?;
    let finite = var.values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    Ok(GrossRange::from_values(&var.values, min, max))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use ooi_explorer::data::model::{GeoPoint, Variable};

    use super::*;

    fn dataset() -> OoiDataset {
        let time = (0..4)
            .map(|i| Utc.with_ymd_and_hms(2022, 1 + i, 1, 0, 0, 0).unwrap())
            .collect();
        let mut ds = OoiDataset::new("CE02SHSM-RID26-06-PHSEND000", time);
        ds.deployment = Some(vec![1, 1, 2, 2]);
        ds.insert_variable(
            "temperature",
            Variable::new("temperature", vec![10.0, 11.0, 12.0, 13.0]),
        );
        ds
    }

    #[test]
    fn loading_selects_first_variable_and_builds_a_figure() {
        let mut state = AppState::default();
        state.set_dataset(dataset());
        assert_eq!(state.selected_param.as_deref(), Some("temperature"));
        assert!(state.flags.is_none());
        assert_eq!(state.figure.as_ref().unwrap().series.len(), 2);
    }

    #[test]
    fn hidden_deployments_are_not_drawn() {
        let mut state = AppState::default();
        state.set_dataset(dataset());
        state.toggle_deployment(1);
        let fig = state.figure.as_ref().unwrap();
        assert_eq!(fig.series.len(), 1);
        assert_eq!(fig.series[0].deployment, Some(2));

        state.select_no_deployments();
        assert_eq!(state.figure.as_ref().unwrap().point_count(), 0);
        state.select_all_deployments();
        assert_eq!(state.figure.as_ref().unwrap().point_count(), 4);
    }

    #[test]
    fn rebuilt_figure_opens_on_its_bounds() {
        let mut state = AppState::default();
        let mut ds = dataset();
        ds.insert_variable(
            "temperature",
            Variable::new("temperature", vec![10.0, 11.0, 1.0e6, 13.0]),
        );
        state.set_dataset(ds);
        assert!(state.reset_view);

        let fig = state.figure.as_ref().unwrap();
        let (min, max) = fig.view_bounds().unwrap();
        assert_eq!((min[1], max[1]), (fig.y_bounds.min, fig.y_bounds.max));
        assert!(max[1] < 1.0e6);

        state.reset_view = false;
        state.set_chart_kind(ChartKind::GrossRange);
        assert!(state.reset_view);
    }

    #[test]
    fn every_chart_kind_renders() {
        let mut state = AppState::default();
        state.set_dataset(dataset());
        for kind in ChartKind::ALL {
            state.set_chart_kind(kind);
            assert!(state.figure.is_some(), "{kind}");
        }
        state.set_param("salinity".into());
        assert!(state.figure.is_none());
        assert!(state.status_message.as_deref().unwrap().contains("salinity"));
    }

    #[test]
    fn bottle_samples_are_matched_against_the_site() {
        let mut state = AppState::default();
        let buoy = state.config.site.buoy();
        let sample = |location: GeoPoint, depth: f64, oxygen: &str| BottleSample {
            location,
            depth,
            metadata: BTreeMap::from([("Oxygen".to_string(), oxygen.to_string())]),
        };
        state.set_bottle_samples(vec![
            sample(buoy, 5.0, "250"),
            sample(buoy, 30.0, "100"),
            sample(GeoPoint::new(45.0, -124.304), 7.0, "100"),
            sample(buoy, 9.0, "270"),
        ]);
        assert_eq!(state.bottle_samples.len(), 4);
        assert_eq!(state.matched_samples.len(), 2);
        assert_eq!(state.matched_mean("Oxygen"), Some(260.0));
        assert_eq!(state.distance_km(&state.matched_samples[0]), 0.0);
    }
}
