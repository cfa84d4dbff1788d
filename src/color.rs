use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::qc::QartodFlag;

/// matplotlib `tab:red`, used for raw observations.
pub const OBSERVATION_COLOR: Color32 = Color32::from_rgb(214, 39, 40);
/// Climatological fit line.
pub const FIT_COLOR: Color32 = Color32::BLACK;
/// Deployment boundary markers.
pub const MARKER_COLOR: Color32 = Color32::from_rgb(40, 40, 40);

/// Translucent fill for gross-range and climatology envelopes.
pub fn band_color() -> Color32 {
    Color32::from_rgba_unmultiplied(214, 39, 40, 77)
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: deployment number → Color32
// ---------------------------------------------------------------------------

/// Maps each deployment of a dataset to a distinct colour.
#[derive(Debug, Clone)]
pub struct DeploymentColors {
    mapping: BTreeMap<i64, Color32>,
    default_color: Color32,
}

impl DeploymentColors {
    pub fn new(deployments: &BTreeSet<i64>) -> Self {
        let palette = generate_palette(deployments.len());
        let mapping = deployments.iter().copied().zip(palette).collect();

        DeploymentColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a deployment.
    pub fn color_for(&self, deployment: i64) -> Color32 {
        self.mapping
            .get(&deployment)
            .copied()
            .unwrap_or(self.default_color)
    }
}

/// Colour of a point carrying the given quality flag.
pub fn flag_color(flag: QartodFlag) -> Color32 {
    match flag {
        QartodFlag::Pass => Color32::from_rgb(44, 160, 44),
        QartodFlag::NotEvaluated => Color32::GRAY,
        QartodFlag::Suspect => Color32::from_rgb(255, 127, 14),
        QartodFlag::Fail => Color32::from_rgb(148, 103, 189),
        QartodFlag::Missing => Color32::DARK_GRAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_deployment_gets_its_own_colour() {
        let deployments: BTreeSet<i64> = [12, 13, 14].into_iter().collect();
        let colors = DeploymentColors::new(&deployments);
        let distinct: BTreeSet<[u8; 4]> = deployments
            .iter()
            .map(|&d| colors.color_for(d).to_array())
            .collect();
        assert_eq!(distinct.len(), 3);
        assert_eq!(colors.color_for(99), Color32::GRAY);
    }

    #[test]
    fn flagged_points_stand_out_from_observations() {
        for flag in [QartodFlag::NotEvaluated, QartodFlag::Suspect, QartodFlag::Fail] {
            assert_ne!(flag_color(flag), OBSERVATION_COLOR, "{flag}");
        }
    }
}
