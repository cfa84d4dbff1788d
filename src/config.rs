//! Viewer and CLI configuration, read from `ooi-explorer.toml`.
//!
//! Every key is optional; a missing file means defaults for the Oregon
//! Shelf surface mooring (CE02SHSM).

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::GeoPoint;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "ooi-explorer.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplorerConfig {
    pub site: SiteConfig,
    pub chart: ChartConfig,
}

/// Buoy position and the search window for discrete samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Sensor depth in metres.
    pub depth: f64,
    pub max_distance_km: f64,
    /// Metres above or below `depth`.
    pub depth_tolerance: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            latitude: 44.6393,
            longitude: -124.304,
            depth: 7.0,
            max_distance_km: 10.0,
            depth_tolerance: 5.0,
        }
    }
}

impl SiteConfig {
    pub fn buoy(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartConfig {
    /// Split timeseries by deployment and mark deployment starts.
    pub add_deployments: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            add_deployments: true,
        }
    }
}

impl ExplorerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Like [`ExplorerConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let config = Self::load(path)?;
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            log::debug!("{} not found, using defaults", path.display());
            Ok(ExplorerConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config: ExplorerConfig = toml::from_str(
            r#"
            [site]
            depth = 80.0

            [chart]
            add_deployments = false
            "#,
        )
        .unwrap();
        assert_eq!(config.site.depth, 80.0);
        assert_eq!(config.site.latitude, 44.6393);
        assert!(!config.chart.add_deployments);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = toml::from_str::<ExplorerConfig>("[site]\nlat = 44.0\n").unwrap_err();
        assert!(err.to_string().contains("lat"), "{err}");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            ExplorerConfig::load_or_default(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, ExplorerConfig::default());
        assert_eq!(config.site.buoy(), GeoPoint::new(44.6393, -124.304));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[site\nlatitude = 1").unwrap();
        assert!(ExplorerConfig::load_or_default(file.path()).is_err());
    }
}
