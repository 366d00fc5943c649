//! Conversions between the four coordinate spaces.
//!
//! | space          | type               | origin       |
//! |----------------|--------------------|--------------|
//! | geographic     | [`GeoCoord`]       | -            |
//! | projected      | [`ProjectedCoord`] | -            |
//! | absolute pixel | [`AbsolutePixel`]  | bottom-left  |
//! | viewport pixel | [`ViewportPixel`]  | top-left     |
//!
//! Only the primitive conversions do arithmetic. Every composite conversion is
//! a chain of primitives, and a 1x1 bin grid gives tile lookup through the same
//! path as any other grid.

use crate::core::{
    geo::{AbsolutePixel, GeoCoord, ProjectedCoord, ViewportPixel},
    projection::Projection,
    viewport::Viewport,
};
use crate::tiles::address::{BinAddress, BinGrid, BinKey, TileAddress, TileKey};
use crate::tiles::pyramid::TilePyramid;
use std::sync::Arc;

/// Owns the pyramid, projection and viewport state all conversions read
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    pyramid: Arc<dyn TilePyramid>,
    projection: Arc<dyn Projection>,
    viewport: Viewport,
}

impl CoordinateMapper {
    pub fn new(pyramid: Arc<dyn TilePyramid>, projection: Arc<dyn Projection>, viewport: Viewport) -> Self {
        Self {
            pyramid,
            projection,
            viewport,
        }
    }

    pub fn pyramid(&self) -> &Arc<dyn TilePyramid> {
        &self.pyramid
    }

    pub fn projection(&self) -> &Arc<dyn Projection> {
        &self.projection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub(crate) fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn zoom(&self) -> u32 {
        self.viewport.zoom
    }

    pub fn tile_size(&self) -> u32 {
        self.viewport.tile_size()
    }

    /// Pixel grid of one tile: one bin per pixel
    fn pixel_grid(&self) -> BinGrid {
        BinGrid::square(self.tile_size())
    }

    /// Absolute pixel bounds of the rendered viewport: `(min, max)` where
    /// `max - min` is the viewport size. Not clamped to the canvas.
    pub fn absolute_pixel_bounds(&self) -> (AbsolutePixel, AbsolutePixel) {
        let extent = self.viewport.extent();
        let domain = self.viewport.domain();
        let min = AbsolutePixel::new(
            ((extent.min.x - domain.min.x) / self.viewport.resolution_x()).floor() as i64,
            ((extent.min.y - domain.min.y) / self.viewport.resolution_y()).floor() as i64,
        );
        let max = AbsolutePixel::new(
            min.x + i64::from(self.viewport.width),
            min.y + i64::from(self.viewport.height),
        );
        (min, max)
    }

    // Viewport <-> absolute

    pub fn viewport_to_absolute(&self, pixel: ViewportPixel) -> AbsolutePixel {
        let (min, _) = self.absolute_pixel_bounds();
        let height = i64::from(self.viewport.height);
        AbsolutePixel::new(pixel.x + min.x, min.y + height - pixel.y)
    }

    pub fn absolute_to_viewport(&self, pixel: AbsolutePixel) -> ViewportPixel {
        let (min, _) = self.absolute_pixel_bounds();
        let height = i64::from(self.viewport.height);
        ViewportPixel::new(pixel.x - min.x, height - (pixel.y - min.y))
    }

    // Absolute <-> projected / tile + bin

    /// Pixel containing `point` at the current zoom
    pub fn projected_to_absolute(&self, point: ProjectedCoord) -> AbsolutePixel {
        let size = i64::from(self.tile_size());
        let (tile, bin) = self
            .pyramid
            .coordinate_to_tile_and_bin(point, self.zoom(), self.pixel_grid());
        AbsolutePixel::new(
            i64::from(tile.x_index) * size + i64::from(bin.x),
            i64::from(tile.y_index) * size + (size - 1 - i64::from(bin.y)),
        )
    }

    /// Tile and bin holding `pixel` for a grid of `grid` bins per tile.
    /// Pixels off the canvas clamp to its edge.
    pub fn absolute_to_tile_and_bin(&self, pixel: AbsolutePixel, grid: BinGrid) -> (TileAddress, BinAddress) {
        let size = i64::from(self.tile_size());
        let last = self.viewport.canvas_size() - 1;
        let x = pixel.x.clamp(0, last);
        let y = pixel.y.clamp(0, last);

        let last_tile = self.pyramid.tile_count(self.zoom()) - 1;
        let index = |v: i64| u32::try_from(v / size).map_or(last_tile, |i| i.min(last_tile));
        let tile = TileAddress::new(self.zoom(), index(x), index(y));
        let (tile_px, tile_py) = (x % size, y % size);
        let bin_x = tile_px * i64::from(grid.x) / size;
        // bin rows count down from the tile's top edge
        let bin_y = i64::from(grid.y) - 1 - tile_py * i64::from(grid.y) / size;
        (tile, BinAddress::new(bin_x as u32, bin_y as u32))
    }

    /// Minimum corner of the pixel's footprint in projected space
    pub fn absolute_to_projected(&self, pixel: AbsolutePixel) -> ProjectedCoord {
        let grid = self.pixel_grid();
        let (tile, bin) = self.absolute_to_tile_and_bin(pixel, grid);
        self.pyramid.bin_to_coordinate_bounds(tile, bin, grid).min
    }

    // Geographic <-> projected

    pub fn geo_to_projected(&self, geo: GeoCoord) -> ProjectedCoord {
        self.projection.project(geo)
    }

    pub fn projected_to_geo(&self, point: ProjectedCoord) -> GeoCoord {
        self.projection.unproject(point)
    }

    // Composites

    pub fn viewport_to_projected(&self, pixel: ViewportPixel) -> ProjectedCoord {
        self.absolute_to_projected(self.viewport_to_absolute(pixel))
    }

    pub fn projected_to_viewport(&self, point: ProjectedCoord) -> ViewportPixel {
        self.absolute_to_viewport(self.projected_to_absolute(point))
    }

    pub fn viewport_to_geo(&self, pixel: ViewportPixel) -> GeoCoord {
        self.projected_to_geo(self.viewport_to_projected(pixel))
    }

    pub fn geo_to_viewport(&self, geo: GeoCoord) -> ViewportPixel {
        self.projected_to_viewport(self.geo_to_projected(geo))
    }

    pub fn viewport_to_tile_and_bin(&self, pixel: ViewportPixel, grid: BinGrid) -> (TileAddress, BinAddress) {
        self.absolute_to_tile_and_bin(self.viewport_to_absolute(pixel), grid)
    }

    pub fn geo_to_tile_and_bin(&self, geo: GeoCoord, grid: BinGrid) -> (TileAddress, BinAddress) {
        self.absolute_to_tile_and_bin(self.projected_to_absolute(self.geo_to_projected(geo)), grid)
    }

    /// Key of the tile under a viewport pixel
    pub fn tile_key_at(&self, pixel: ViewportPixel) -> TileKey {
        self.viewport_to_tile_and_bin(pixel, BinGrid::SINGLE).0.key()
    }

    /// Key of the bin under a viewport pixel for a given grid
    pub fn bin_key_at(&self, pixel: ViewportPixel, grid: BinGrid) -> BinKey {
        self.viewport_to_tile_and_bin(pixel, grid).1.key()
    }

    /// The whole canvas expressed in viewport pixels as `(top_left, bottom_right)`
    pub fn canvas_in_viewport_pixels(&self) -> (ViewportPixel, ViewportPixel) {
        let size = self.viewport.canvas_size();
        (
            self.absolute_to_viewport(AbsolutePixel::new(0, size)),
            self.absolute_to_viewport(AbsolutePixel::new(size, 0)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bounds::Bounds;
    use crate::core::constants::MAX_LEVEL;
    use crate::core::projection::{Identity, SphericalMercator};
    use crate::tiles::pyramid::{AoiPyramid, WebPyramid};

    /// Domain [0,100]^2, 256px tiles, 512x512 viewport showing the whole level-1 canvas
    fn unit_mapper(zoom: u32) -> CoordinateMapper {
        let domain = Bounds::from_coords(0.0, 0.0, 100.0, 100.0);
        CoordinateMapper::new(
            Arc::new(AoiPyramid::new(0.0, 0.0, 100.0, 100.0).unwrap()),
            Arc::new(Identity),
            Viewport::new(domain, 256, ProjectedCoord::new(50.0, 50.0), zoom, 512, 512),
        )
    }

    #[test]
    fn test_absolute_bounds_follow_extent() {
        let mapper = unit_mapper(1);
        let (min, max) = mapper.absolute_pixel_bounds();
        assert_eq!(min, AbsolutePixel::new(0, 0));
        assert_eq!(max, AbsolutePixel::new(512, 512));
    }

    #[test]
    fn test_scenario_origin_pixel() {
        let mapper = unit_mapper(1);
        let origin = ProjectedCoord::new(0.0, 0.0);

        let (tile, bin) = mapper
            .pyramid()
            .coordinate_to_tile_and_bin(origin, 1, BinGrid::square(256));
        assert_eq!(tile, TileAddress::new(1, 0, 0));
        assert_eq!(bin, BinAddress::new(0, 255));
        assert_eq!(mapper.projected_to_absolute(origin), AbsolutePixel::new(0, 0));

        let (tile, _) = mapper.absolute_to_tile_and_bin(
            mapper.projected_to_absolute(ProjectedCoord::new(60.0, 60.0)),
            BinGrid::SINGLE,
        );
        assert_eq!(tile, TileAddress::new(1, 1, 1));
    }

    #[test]
    fn test_viewport_absolute_round_trip_is_exact() {
        for zoom in [0, 1, 3] {
            let mut mapper = unit_mapper(zoom);
            mapper.viewport_mut().pan(37.0, -11.0);
            for vx in (-300..900).step_by(37) {
                for vy in (-300..900).step_by(41) {
                    let pixel = ViewportPixel::new(vx, vy);
                    assert_eq!(mapper.absolute_to_viewport(mapper.viewport_to_absolute(pixel)), pixel);
                    let abs = AbsolutePixel::new(vx, vy);
                    assert_eq!(mapper.viewport_to_absolute(mapper.absolute_to_viewport(abs)), abs);
                }
            }
        }
    }

    #[test]
    fn test_vertical_axis_flips() {
        let mapper = unit_mapper(1);
        // top-left of the viewport is the top of the canvas
        assert_eq!(mapper.viewport_to_absolute(ViewportPixel::new(0, 0)), AbsolutePixel::new(0, 512));
        assert_eq!(mapper.viewport_to_absolute(ViewportPixel::new(0, 512)), AbsolutePixel::new(0, 0));

        let (tile, bin) = mapper.viewport_to_tile_and_bin(ViewportPixel::new(0, 511), BinGrid::square(256));
        assert_eq!(tile, TileAddress::new(1, 0, 0));
        assert_eq!(bin, BinAddress::new(0, 254));
    }

    #[test]
    fn test_single_bin_grid_is_tile_lookup() {
        let mapper = unit_mapper(1);
        for (vx, vy, expected) in [(10, 10, "1,0,1"), (300, 10, "1,1,1"), (10, 300, "1,0,0"), (511, 511, "1,1,0")] {
            let pixel = ViewportPixel::new(vx, vy);
            assert_eq!(mapper.tile_key_at(pixel).to_string(), expected);
            assert_eq!(mapper.bin_key_at(pixel, BinGrid::SINGLE).to_string(), "0,0");
        }
    }

    #[test]
    fn test_bin_key_in_quadrants() {
        let mapper = unit_mapper(1);
        // (10, 10) from the top-left is the top-left quarter of tile (1, 0, 1)
        assert_eq!(mapper.bin_key_at(ViewportPixel::new(10, 10), BinGrid::square(2)).to_string(), "0,0");
        assert_eq!(mapper.bin_key_at(ViewportPixel::new(200, 200), BinGrid::square(2)).to_string(), "1,1");
    }

    #[test]
    fn test_projected_pixel_round_trip_stays_in_pixel() {
        let mapper = unit_mapper(3);
        let point = ProjectedCoord::new(37.3, 81.9);
        let pixel = mapper.projected_to_absolute(point);
        let corner = mapper.absolute_to_projected(pixel);
        let res = mapper.viewport().resolution_x();
        assert!(corner.x <= point.x && point.x - corner.x < res);
        assert!(corner.y <= point.y && point.y - corner.y < res);
        assert_eq!(mapper.projected_to_absolute(corner), pixel);
    }

    #[test]
    fn test_geo_viewport_round_trip_within_a_pixel() {
        let domain = WebPyramid::new().bounds();
        let mut mapper = CoordinateMapper::new(
            Arc::new(WebPyramid::new()),
            Arc::new(SphericalMercator),
            Viewport::new(domain, 256, ProjectedCoord::new(0.0, 0.0), 4, 800, 600),
        );
        mapper.viewport_mut().set_center(SphericalMercator.project(GeoCoord::new(-74.0, 40.7)));

        let geo = GeoCoord::new(-73.95, 40.75);
        let pixel = mapper.geo_to_viewport(geo);
        assert!((0..800).contains(&pixel.x) && (0..600).contains(&pixel.y));
        // the inverse lands on the pixel corner; projection rounding may tip it one pixel over
        let back = mapper.geo_to_viewport(mapper.viewport_to_geo(pixel));
        assert!((back.x - pixel.x).abs() <= 1 && (back.y - pixel.y).abs() <= 1);
    }

    #[test]
    fn test_off_canvas_pixels_clamp() {
        let mapper = unit_mapper(1);
        let (tile, bin) = mapper.absolute_to_tile_and_bin(AbsolutePixel::new(-40, 9000), BinGrid::square(4));
        assert_eq!(tile, TileAddress::new(1, 0, 1));
        assert_eq!(bin, BinAddress::new(0, 0));
    }

    #[test]
    fn test_deepest_level_lookup_stays_on_canvas() {
        let mut mapper = unit_mapper(0);
        mapper.viewport_mut().set_zoom_limits(0, 34);
        mapper.viewport_mut().set_zoom(34);
        assert_eq!(mapper.zoom(), MAX_LEVEL);

        let last = mapper.viewport().canvas_size() - 1;
        let (tile, _) = mapper.absolute_to_tile_and_bin(AbsolutePixel::new(last, last), BinGrid::SINGLE);
        assert!(tile.is_valid());
        assert_eq!(tile.x_index, mapper.pyramid().tile_count(MAX_LEVEL) - 1);
    }

    #[test]
    fn test_canvas_in_viewport_pixels() {
        let mapper = unit_mapper(1);
        assert_eq!(
            mapper.canvas_in_viewport_pixels(),
            (ViewportPixel::new(0, 0), ViewportPixel::new(512, 512))
        );
    }
}
