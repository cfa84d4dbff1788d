mod app;
mod state;
mod ui;

use std::path::Path;

use app::OoiExplorerApp;
use eframe::egui;
use ooi_explorer::config::{DEFAULT_CONFIG_FILE, ExplorerConfig};

fn main() -> eframe::Result {
    env_logger::init();

    let config =
        ExplorerConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE)).unwrap_or_else(|e| {
            log::error!("{e:#}; using defaults");
            ExplorerConfig::default()
        });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "OOI Explorer",
        options,
        Box::new(|_cc| Ok(Box::new(OoiExplorerApp::new(config)))),
    )
}
