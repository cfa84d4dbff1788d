use std::path::Path;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use serde::de::DeserializeOwned;

use ooi_explorer::color::{DeploymentColors, flag_color};
use ooi_explorer::data::loader::{load_bottle_samples, load_file};
use ooi_explorer::qc::flags::{flag_counts, summarize};

use crate::state::{AppState, ChartKind, ColorBy};
use crate::ui::plot::swatch;

// ---------------------------------------------------------------------------
// Left side panel – chart controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Chart");
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label("No dataset loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the closures.
    let params = dataset.variable_names();
    let deployments = dataset.deployments();
    let has_deployments = dataset.deployment.is_some();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Parameter selector ----
            ui.strong("Parameter");
            let current = state.selected_param.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("parameter")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for param in &params {
                        if ui.selectable_label(current == *param, param).clicked() {
                            state.set_param(param.clone());
                        }
                    }
                });
            ui.add_space(4.0);

            // ---- Chart kind ----
            ui.strong("Kind");
            for kind in ChartKind::ALL {
                if ui
                    .radio(state.chart_kind == kind, kind.to_string())
                    .clicked()
                {
                    state.set_chart_kind(kind);
                }
            }
            ui.separator();

            if state.chart_kind == ChartKind::Timeseries {
                timeseries_options(ui, state, has_deployments);
                ui.separator();
            }

            // ---- Deployment visibility ----
            if !deployments.is_empty() {
                let colors = DeploymentColors::new(&deployments);
                let header = format!(
                    "Deployments  ({}/{})",
                    state.visible_deployments.len(),
                    deployments.len()
                );
                egui::CollapsingHeader::new(RichText::new(header).strong())
                    .id_salt("deployments")
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all_deployments();
                            }
                            if ui.small_button("None").clicked() {
                                state.select_no_deployments();
                            }
                        });
                        for &d in &deployments {
                            let mut checked = state.visible_deployments.contains(&d);
                            ui.horizontal(|ui: &mut Ui| {
                                swatch(ui, colors.color_for(d));
                                if ui.checkbox(&mut checked, d.to_string()).changed() {
                                    state.toggle_deployment(d);
                                }
                            });
                        }
                    });
                ui.separator();
            }

            discrete_samples(ui, state);
        });
}

fn timeseries_options(ui: &mut Ui, state: &mut AppState, has_deployments: bool) {
    let mut add_deployments = state.add_deployments;
    if ui
        .add_enabled(
            has_deployments,
            egui::Checkbox::new(&mut add_deployments, "Show deployments"),
        )
        .changed()
    {
        state.set_add_deployments(add_deployments);
    }

    ui.strong("Color by");
    let has_flags = state.flags.is_some();
    ui.horizontal(|ui: &mut Ui| {
        if ui
            .selectable_label(state.color_by == ColorBy::Deployment, "Deployment")
            .clicked()
        {
            state.set_color_by(ColorBy::Deployment);
        }
        if ui
            .add_enabled(
                has_flags,
                egui::SelectableLabel::new(state.color_by == ColorBy::QcFlag, "QC flag"),
            )
            .clicked()
        {
            state.set_color_by(ColorBy::QcFlag);
        }
    });

    if let Some((instrument, flags)) = &state.flags {
        ui.label(RichText::new(format!("{instrument} checks")).small());
        for (flag, n) in flag_counts(flags) {
            ui.horizontal(|ui: &mut Ui| {
                swatch(ui, flag_color(flag));
                ui.label(format!("{flag}: {n}"));
            });
        }
    }
}

/// Discrete samples matched against the configured site.
fn discrete_samples(ui: &mut Ui, state: &AppState) {
    if state.bottle_samples.is_empty() {
        return;
    }
    let site = &state.config.site;
    let header = format!(
        "Discrete samples  ({}/{})",
        state.matched_samples.len(),
        state.bottle_samples.len()
    );
    egui::CollapsingHeader::new(RichText::new(header).strong())
        .id_salt("discrete_samples")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.label(
                RichText::new(format!(
                    "within {} km of ({:.4}, {:.4}), {} ± {} m",
                    site.max_distance_km,
                    site.latitude,
                    site.longitude,
                    site.depth,
                    site.depth_tolerance
                ))
                .small(),
            );
            TableBuilder::new(ui)
                .striped(true)
                .vscroll(false)
                .columns(Column::auto(), 4)
                .header(18.0, |mut header| {
                    for title in ["Lat", "Lon", "Depth", "km"] {
                        header.col(|ui: &mut Ui| {
                            ui.strong(title);
                        });
                    }
                })
                .body(|mut body| {
                    for s in &state.matched_samples {
                        body.row(18.0, |mut row| {
                            for cell in [
                                format!("{:.4}", s.location.latitude),
                                format!("{:.4}", s.location.longitude),
                                format!("{:.1}", s.depth),
                                format!("{:.2}", state.distance_km(s)),
                            ] {
                                row.col(|ui: &mut Ui| {
                                    ui.label(cell);
                                });
                            }
                        });
                    }
                });
            if let Some(param) = state.selected_param.as_deref() {
                if let Some(mean) = state.matched_mean(param) {
                    ui.label(format!("Mean {param}: {mean:.4}"));
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open dataset…").clicked() {
                open_dataset_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open discrete samples…").clicked() {
                open_samples_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            let has_dataset = state.dataset.is_some();
            if ui
                .add_enabled(has_dataset, egui::Button::new("Open gross range table…"))
                .clicked()
            {
                if let Some(table) = open_table_dialog(state, "Open gross range table") {
                    state.set_gross_range(table);
                }
                ui.close_menu();
            }
            if ui
                .add_enabled(has_dataset, egui::Button::new("Open climatology table…"))
                .clicked()
            {
                if let Some(table) = open_table_dialog(state, "Open climatology table") {
                    state.set_climatology(table);
                }
                ui.close_menu();
            }
        });

        ui.separator();

        if state.loading {
            ui.spinner();
        }
        if let Some(ds) = &state.dataset {
            ui.label(format!("{}: {} samples", ds.id, ds.len()));
        }

        if let Some((instrument, flags)) = &state.flags {
            ui.separator();
            ui.label(format!("{instrument} QC: {}", summarize(flags)));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_dataset_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open OOI dataset")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.loading = true;
        match load_file(&path) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} samples with variables {:?}",
                    dataset.len(),
                    dataset.variable_names()
                );
                state.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
                state.loading = false;
            }
        }
    }
}

pub fn open_samples_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open discrete sample summary")
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        match load_bottle_samples(&path) {
            Ok(samples) => state.set_bottle_samples(samples),
            Err(e) => {
                log::error!("Failed to load discrete samples: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

/// Pick and parse a JSON table; errors go to the status bar.
fn open_table_dialog<T: DeserializeOwned>(state: &mut AppState, title: &str) -> Option<T> {
    let path = rfd::FileDialog::new()
        .set_title(title)
        .add_filter("JSON", &["json"])
        .pick_file()?;
    match read_json(&path) {
        Ok(table) => Some(table),
        Err(e) => {
            log::error!("Failed to load {}: {e:#}", path.display());
            state.status_message = Some(format!("Error: {e:#}"));
            None
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    use anyhow::Context;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid table in {}", path.display()))
}
