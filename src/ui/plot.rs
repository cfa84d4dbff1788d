use eframe::egui::{self, Color32, RichText, Stroke, Ui};
use egui_plot::{
    GridMark, Legend, Line, Plot, PlotBounds, PlotPoint, PlotPoints, Points, Polygon, Text,
};

use ooi_explorer::chart::Figure;
use ooi_explorer::color::MARKER_COLOR;
use ooi_explorer::data::model::from_epoch_seconds;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Figure plot (central panel)
// ---------------------------------------------------------------------------

/// Render the current figure in the central panel.
///
/// A freshly built figure opens on its own bounds; after that the user's
/// pan and zoom are kept.
pub fn figure_plot(ui: &mut Ui, state: &mut AppState) {
    let reset_view = std::mem::take(&mut state.reset_view);
    let figure = match (&state.dataset, &state.figure) {
        (Some(_), Some(fig)) => fig,
        (Some(_), None) => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Select a variable to plot");
            });
            return;
        }
        (None, _) => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a dataset to view it  (File → Open dataset…)");
            });
            return;
        }
    };

    ui.horizontal(|ui: &mut Ui| {
        ui.strong(&figure.title);
        if let Some(legend_title) = &figure.legend_title {
            ui.separator();
            ui.label(RichText::new(legend_title).italics());
        }
    });

    let plot = Plot::new("figure_plot")
        .legend(Legend::default())
        .x_axis_label(&figure.x_label)
        .y_axis_label(&figure.y_label)
        .x_axis_formatter(|mark: GridMark, _range| format_date(mark.value))
        .label_formatter(|name: &str, value: &PlotPoint| {
            let when = format_date(value.x);
            if name.is_empty() {
                format!("{when}\n{:.4}", value.y)
            } else {
                format!("{name}\n{when}\n{:.4}", value.y)
            }
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    let view = figure.view_bounds().filter(|_| reset_view);

    plot.show(ui, |plot_ui| {
        if let Some((min, max)) = view {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
        }
        draw_figure(plot_ui, figure);
    });
}

fn draw_figure(plot_ui: &mut egui_plot::PlotUi, figure: &Figure) {
    for band in &figure.bands {
        let (x0, x1) = band.x_range;
        let (y0, y1) = band.y_range;
        let corners = vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]];
        plot_ui.polygon(
            Polygon::new(PlotPoints::from(corners))
                .name(&band.name)
                .fill_color(band.color)
                .stroke(Stroke::NONE),
        );
    }

    for segment in &figure.segments {
        let (x0, x1) = segment.x_range;
        plot_ui.line(
            Line::new(PlotPoints::from(vec![[x0, segment.y], [x1, segment.y]]))
                .name(&segment.name)
                .color(segment.color)
                .width(segment.width),
        );
    }

    for series in &figure.series {
        plot_ui.points(
            Points::new(PlotPoints::from(series.points.clone()))
                .name(&series.name)
                .color(series.color)
                .radius(2.0),
        );
    }

    for marker in &figure.markers {
        let (y0, y1) = marker.y_range;
        plot_ui.line(
            Line::new(PlotPoints::from(vec![[marker.x, y0], [marker.x, y1]]))
                .color(MARKER_COLOR)
                .style(egui_plot::LineStyle::dashed_loose())
                .width(1.0),
        );
        plot_ui.text(
            Text::new(
                PlotPoint::new(marker.x, marker.label_y),
                RichText::new(&marker.label).color(MARKER_COLOR),
            )
            .anchor(egui::Align2::LEFT_CENTER),
        );
    }
}

/// Axis and hover text for an epoch-seconds x value.
fn format_date(x: f64) -> String {
    from_epoch_seconds(x)
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Small filled square used as a legend swatch in the side panel.
pub fn swatch(ui: &mut Ui, color: Color32) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
    ui.painter().rect_filled(rect, 2.0, color);
}
