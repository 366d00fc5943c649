//! Quad-tree tile pyramid geometry.
//!
//! A pyramid maps projected coordinates onto `{level, xIndex, yIndex}` tiles and
//! `{x, y}` bins inside those tiles, and back. Every level doubles the number of
//! tiles on both axes. Queries outside the domain clamp to the nearest edge
//! tile/bin; none of these functions fail.

use crate::core::{
    bounds::Bounds,
    constants::{MAX_LEVEL, WEB_MERCATOR_HALF_EXTENT},
    geo::ProjectedCoord,
};
use crate::tiles::address::{BinAddress, BinGrid, TileAddress};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Shared contract of the area-of-interest and web pyramids
pub trait TilePyramid: Send + Sync + Debug {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Projected rectangle covered by the single level-0 tile
    fn bounds(&self) -> Bounds;

    /// Tiles per axis at `level`
    fn tile_count(&self, level: u32) -> u32 {
        1u32 << level.min(MAX_LEVEL)
    }

    /// Tile containing `coord` at `level`
    fn coordinate_to_tile(&self, coord: ProjectedCoord, level: u32) -> TileAddress {
        let bounds = self.bounds();
        let count = self.tile_count(level);
        TileAddress::new(
            level,
            axis_index(coord.x, bounds.min.x, bounds.width(), count),
            axis_index(coord.y, bounds.min.y, bounds.height(), count),
        )
    }

    /// Bin of `tile` containing `coord`; bin rows count down from the tile's top edge
    fn coordinate_to_bin(&self, coord: ProjectedCoord, tile: TileAddress, grid: BinGrid) -> BinAddress {
        let tile_bounds = self.tile_bounds(tile);
        let x = axis_index(coord.x, tile_bounds.min.x, tile_bounds.width(), grid.x);
        let y = axis_index(coord.y, tile_bounds.min.y, tile_bounds.height(), grid.y);
        BinAddress::new(x, grid.y - 1 - y)
    }

    fn coordinate_to_tile_and_bin(
        &self,
        coord: ProjectedCoord,
        level: u32,
        grid: BinGrid,
    ) -> (TileAddress, BinAddress) {
        let tile = self.coordinate_to_tile(coord, level);
        let bin = self.coordinate_to_bin(coord, tile, grid);
        (tile, bin)
    }

    /// Projected rectangle covered by `tile`
    fn tile_bounds(&self, tile: TileAddress) -> Bounds {
        let bounds = self.bounds();
        let count = f64::from(self.tile_count(tile.level));
        let width = bounds.width() / count;
        let height = bounds.height() / count;
        let min_x = bounds.min.x + width * f64::from(tile.x_index);
        let min_y = bounds.min.y + height * f64::from(tile.y_index);
        Bounds::from_coords(min_x, min_y, min_x + width, min_y + height)
    }

    /// Projected rectangle covered by `bin` of `tile`; its minimum corner is the
    /// canonical origin of the bin
    fn bin_to_coordinate_bounds(&self, tile: TileAddress, bin: BinAddress, grid: BinGrid) -> Bounds {
        let tile_bounds = self.tile_bounds(tile);
        let bin_width = tile_bounds.width() / f64::from(grid.x);
        let bin_height = tile_bounds.height() / f64::from(grid.y);
        let row_from_bottom = grid.y - 1 - bin.y.min(grid.y - 1);
        let min_x = tile_bounds.min.x + bin_width * f64::from(bin.x.min(grid.x - 1));
        let min_y = tile_bounds.min.y + bin_height * f64::from(row_from_bottom);
        Bounds::from_coords(min_x, min_y, min_x + bin_width, min_y + bin_height)
    }
}

/// `floor(divisions * (value - origin) / span)` clamped to `[0, divisions)`
fn axis_index(value: f64, origin: f64, span: f64, divisions: u32) -> u32 {
    if divisions == 0 {
        return 0;
    }
    let raw = (f64::from(divisions) * (value - origin) / span).floor();
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, f64::from(divisions - 1)) as u32
}

/// Pyramid over a custom bounding rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct AoiPyramid {
    bounds: Bounds,
}

impl AoiPyramid {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let bounds = Bounds::from_coords(min_x, min_y, max_x, max_y);
        if !bounds.is_valid() || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(MapError::InvalidCoordinates(format!(
                "area of interest [{}, {}]-[{}, {}] has no extent",
                min_x, min_y, max_x, max_y
            )));
        }
        Ok(Self { bounds })
    }
}

impl TilePyramid for AoiPyramid {
    fn name(&self) -> &'static str {
        "AreaOfInterest"
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }
}

/// Pyramid over the global spherical mercator square
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WebPyramid;

impl WebPyramid {
    pub fn new() -> Self {
        Self
    }
}

impl TilePyramid for WebPyramid {
    fn name(&self) -> &'static str {
        "WebMercator"
    }

    fn bounds(&self) -> Bounds {
        Bounds::from_coords(
            -WEB_MERCATOR_HALF_EXTENT,
            -WEB_MERCATOR_HALF_EXTENT,
            WEB_MERCATOR_HALF_EXTENT,
            WEB_MERCATOR_HALF_EXTENT,
        )
    }
}

/// Configuration-time pyramid choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PyramidConfig {
    #[serde(rename_all = "camelCase")]
    AreaOfInterest {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
    WebMercator,
}

impl PyramidConfig {
    pub fn build(&self) -> Result<Arc<dyn TilePyramid>> {
        Ok(match *self {
            PyramidConfig::AreaOfInterest {
                min_x,
                min_y,
                max_x,
                max_y,
            } => Arc::new(AoiPyramid::new(min_x, min_y, max_x, max_y)?),
            PyramidConfig::WebMercator => Arc::new(WebPyramid::new()),
        })
    }
}

impl Default for PyramidConfig {
    fn default() -> Self {
        PyramidConfig::WebMercator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_pyramid() -> AoiPyramid {
        AoiPyramid::new(0.0, 0.0, 100.0, 100.0).unwrap()
    }

    #[test]
    fn test_scenario_level_one() {
        let pyramid = unit_pyramid();
        let grid = BinGrid::SINGLE;

        let (tile, bin) = pyramid.coordinate_to_tile_and_bin(ProjectedCoord::new(60.0, 60.0), 1, grid);
        assert_eq!(tile, TileAddress::new(1, 1, 1));
        assert_eq!(bin, BinAddress::new(0, 0));

        let (tile, bin) = pyramid.coordinate_to_tile_and_bin(ProjectedCoord::new(0.0, 0.0), 1, grid);
        assert_eq!(tile, TileAddress::new(1, 0, 0));
        assert_eq!(bin, BinAddress::new(0, 0));
    }

    #[test]
    fn test_origin_bin_is_bottom_row_in_pixel_bins() {
        let pyramid = unit_pyramid();
        let (tile, bin) =
            pyramid.coordinate_to_tile_and_bin(ProjectedCoord::new(0.0, 0.0), 1, BinGrid::square(256));
        assert_eq!(tile, TileAddress::new(1, 0, 0));
        assert_eq!(bin, BinAddress::new(0, 255));
    }

    #[test]
    fn test_round_trip_containment() {
        let pyramids: Vec<Box<dyn TilePyramid>> = vec![
            Box::new(unit_pyramid()),
            Box::new(AoiPyramid::new(-180.0, -90.0, 180.0, 90.0).unwrap()),
            Box::new(WebPyramid::new()),
        ];
        let grids = [BinGrid::SINGLE, BinGrid::square(4), BinGrid::new(256, 16)];

        for pyramid in &pyramids {
            let domain = pyramid.bounds();
            for level in [0, 1, 3, 7, 12] {
                for grid in grids {
                    for i in 0..=20 {
                        for j in 0..=20 {
                            let coord = ProjectedCoord::new(
                                domain.min.x + domain.width() * f64::from(i) / 20.0,
                                domain.min.y + domain.height() * f64::from(j) / 20.0,
                            );
                            let (tile, bin) = pyramid.coordinate_to_tile_and_bin(coord, level, grid);
                            assert!(grid.contains(&bin));
                            let bounds = pyramid.bin_to_coordinate_bounds(tile, bin, grid);
                            let tolerance = bounds.width().max(bounds.height()) * 1e-9;
                            assert!(
                                bounds.expanded(tolerance).contains(&coord),
                                "{} level {} grid {:?}: {:?} not in {:?}",
                                pyramid.name(),
                                level,
                                grid,
                                coord,
                                bounds
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_out_of_domain_clamps() {
        let pyramid = unit_pyramid();
        let grid = BinGrid::square(4);

        let (tile, bin) = pyramid.coordinate_to_tile_and_bin(ProjectedCoord::new(-50.0, 500.0), 2, grid);
        assert_eq!(tile, TileAddress::new(2, 0, 3));
        // leftmost column, top row
        assert_eq!(bin, BinAddress::new(0, 0));

        let (tile, bin) = pyramid.coordinate_to_tile_and_bin(ProjectedCoord::new(f64::NAN, 100.0), 2, grid);
        assert_eq!(tile, TileAddress::new(2, 0, 3));
        assert_eq!(bin.x, 0);
    }

    #[test]
    fn test_bin_bounds_origin() {
        let pyramid = unit_pyramid();
        let tile = TileAddress::new(1, 1, 0);
        let grid = BinGrid::square(2);

        // bin (0, 0) is the top-left quarter of tile (1, 0)
        let top_left = pyramid.bin_to_coordinate_bounds(tile, BinAddress::new(0, 0), grid);
        assert_eq!(top_left, Bounds::from_coords(50.0, 25.0, 75.0, 50.0));

        let bottom_right = pyramid.bin_to_coordinate_bounds(tile, BinAddress::new(1, 1), grid);
        assert_eq!(bottom_right, Bounds::from_coords(75.0, 0.0, 100.0, 25.0));
    }

    #[test]
    fn test_single_bin_matches_tile_bounds() {
        let pyramid = WebPyramid::new();
        let tile = TileAddress::new(4, 3, 9);
        assert_eq!(
            pyramid.bin_to_coordinate_bounds(tile, BinAddress::new(0, 0), BinGrid::SINGLE),
            pyramid.tile_bounds(tile)
        );
    }

    #[test]
    fn test_empty_area_of_interest_rejected() {
        assert!(AoiPyramid::new(0.0, 0.0, 0.0, 10.0).is_err());
        assert!(AoiPyramid::new(0.0, 0.0, f64::INFINITY, 10.0).is_err());
    }

    #[test]
    fn test_pyramid_config_json() {
        let config: PyramidConfig = serde_json::from_str(
            r#"{"type": "AreaOfInterest", "minX": 0, "minY": 0, "maxX": 100, "maxY": 50}"#,
        )
        .unwrap();
        let pyramid = config.build().unwrap();
        assert_eq!(pyramid.name(), "AreaOfInterest");
        assert_eq!(pyramid.bounds(), Bounds::from_coords(0.0, 0.0, 100.0, 50.0));

        let web: PyramidConfig = serde_json::from_str(r#"{"type": "WebMercator"}"#).unwrap();
        assert_eq!(web.build().unwrap().name(), "WebMercator");
    }
}
