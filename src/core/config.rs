//! Map configuration.
//!
//! Everything the map, synchronizer and overlay need is read from one
//! [`MapConfig`], loadable from JSON, with presets for the two pyramid kinds.

use crate::core::{
    bounds::Bounds,
    constants::{DEFAULT_PRIORITY, MAX_LEVEL, TILE_SIZE},
    geo::ProjectedCoord,
    projection::ProjectionKind,
};
use crate::layers::style::OverlayStyles;
use crate::tiles::{address::BinGrid, pyramid::PyramidConfig, sync::SyncConfig};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Initial view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
    pub zoom: u32,
    pub min_zoom: u32,
    pub max_zoom: u32,
    /// Initial center in projected units; the domain center when absent
    pub center: Option<ProjectedCoord>,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            zoom: 2,
            min_zoom: 0,
            max_zoom: 18,
            center: None,
        }
    }
}

/// Annotation overlay behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Priority given to annotations drawn by the user
    pub default_priority: String,
    pub default_title: String,
    pub default_comment: String,
    /// Bins per tile axis used when bucketing annotations
    pub bin_grid: BinGrid,
    pub styles: OverlayStyles,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            default_priority: DEFAULT_PRIORITY.to_string(),
            default_title: String::new(),
            default_comment: String::new(),
            bin_grid: BinGrid::SINGLE,
            styles: OverlayStyles::default(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    pub pyramid: PyramidConfig,
    pub projection: ProjectionKind,
    pub tile_size: u32,
    pub viewport: ViewportConfig,
    pub sync: SyncConfig,
    pub overlay: OverlayConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::web_default()
    }
}

impl MapConfig {
    /// Global web mercator pyramid in EPSG:3857
    pub fn web_default() -> Self {
        Self {
            pyramid: PyramidConfig::WebMercator,
            projection: ProjectionKind::SphericalMercator,
            tile_size: TILE_SIZE,
            viewport: ViewportConfig::default(),
            sync: SyncConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }

    /// Custom rectangle in plain lon/lat
    pub fn area_of_interest(bounds: Bounds) -> Self {
        Self {
            pyramid: PyramidConfig::AreaOfInterest {
                min_x: bounds.min.x,
                min_y: bounds.min.y,
                max_x: bounds.max.x,
                max_y: bounds.max.y,
            },
            projection: ProjectionKind::Identity,
            ..Self::web_default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: MapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(MapError::Config("tileSize must be positive".into()));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(MapError::Config("viewport needs a non-zero size".into()));
        }
        if self.viewport.min_zoom > self.viewport.max_zoom {
            return Err(MapError::Config(format!(
                "minZoom {} exceeds maxZoom {}",
                self.viewport.min_zoom, self.viewport.max_zoom
            )));
        }
        if self.viewport.max_zoom > MAX_LEVEL {
            return Err(MapError::Config(format!(
                "maxZoom {} is deeper than the pyramid's last level {}",
                self.viewport.max_zoom, MAX_LEVEL
            )));
        }
        if self.overlay.bin_grid.x == 0 || self.overlay.bin_grid.y == 0 {
            return Err(MapError::Config("bin grid needs at least one bin per axis".into()));
        }
        // surfaces an empty area of interest
        self.pyramid.build()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let web = MapConfig::default();
        assert_eq!(web.pyramid, PyramidConfig::WebMercator);
        assert_eq!(web.tile_size, 256);
        assert_eq!(web.overlay.default_priority, "P0");
        assert!(web.validate().is_ok());

        let aoi = MapConfig::area_of_interest(Bounds::from_coords(-10.0, 40.0, 5.0, 55.0));
        assert_eq!(aoi.projection, ProjectionKind::Identity);
        assert!(aoi.validate().is_ok());
    }

    #[test]
    fn test_from_json_with_defaults() {
        let config = MapConfig::from_json(
            r#"{
                "pyramid": {"type": "AreaOfInterest", "minX": 0, "minY": 0, "maxX": 100, "maxY": 100},
                "projection": "Identity",
                "viewport": {"width": 512, "height": 512, "zoom": 1},
                "sync": {"maxRetries": 4},
                "overlay": {"defaultPriority": "P3", "binGrid": {"x": 4, "y": 4}}
            }"#,
        )
        .unwrap();

        assert_eq!(config.viewport.width, 512);
        assert_eq!(config.viewport.max_zoom, 18);
        assert_eq!(config.sync.max_retries, 4);
        assert_eq!(config.overlay.default_priority, "P3");
        assert_eq!(config.overlay.bin_grid, BinGrid::square(4));
        assert_eq!(config.tile_size, 256);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(matches!(
            MapConfig::from_json(r#"{"tileSize": 0}"#),
            Err(MapError::Config(_))
        ));
        assert!(matches!(
            MapConfig::from_json(r#"{"viewport": {"minZoom": 9, "maxZoom": 3}}"#),
            Err(MapError::Config(_))
        ));
        assert!(matches!(
            MapConfig::from_json(r#"{"pyramid": {"type": "AreaOfInterest", "minX": 1, "minY": 1, "maxX": 1, "maxY": 5}}"#),
            Err(MapError::InvalidCoordinates(_))
        ));
        assert!(matches!(
            MapConfig::from_json(r#"{"viewport": {"zoom": 34, "maxZoom": 34}}"#),
            Err(MapError::Config(_))
        ));
        assert!(MapConfig::from_json(r#"{"viewport": {"maxZoom": 30}}"#).is_ok());
        assert!(matches!(
            MapConfig::from_json("{not json"),
            Err(MapError::Serialization(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = MapConfig::area_of_interest(Bounds::from_coords(0.0, 0.0, 10.0, 10.0));
        let back = MapConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
