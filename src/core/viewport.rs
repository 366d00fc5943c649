use crate::core::{bounds::Bounds, constants::MAX_LEVEL, geo::ProjectedCoord};
use serde::{Deserialize, Serialize};

/// Manages the current view of the map: center, zoom, and screen dimensions.
///
/// All positions are in projected units of the pyramid domain. Every zoom level
/// lays the domain out on a canvas of `tile_size * 2^zoom` pixels per axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the view in projected coordinates
    pub center: ProjectedCoord,
    /// The current zoom level, which is also the tile level
    pub zoom: u32,
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
    pub min_zoom: u32,
    pub max_zoom: u32,
    /// Projected rectangle of the whole pyramid
    domain: Bounds,
    tile_size: u32,
}

impl Viewport {
    /// Creates a new viewport over `domain`
    pub fn new(domain: Bounds, tile_size: u32, center: ProjectedCoord, zoom: u32, width: u32, height: u32) -> Self {
        let mut viewport = Self {
            center: domain.center(),
            zoom: 0,
            width: width.max(1),
            height: height.max(1),
            min_zoom: 0,
            max_zoom: 18,
            domain,
            tile_size: tile_size.max(1),
        };
        viewport.set_zoom(zoom);
        viewport.set_center(center);
        viewport
    }

    pub fn domain(&self) -> Bounds {
        self.domain
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Sets the center, clamped into the domain
    pub fn set_center(&mut self, center: ProjectedCoord) {
        self.center = if center.is_finite() {
            self.domain.clamp(&center)
        } else {
            self.domain.center()
        };
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: u32) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Sets the viewport size in pixels
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// Sets the zoom limits, never deeper than the pyramid's last level
    pub fn set_zoom_limits(&mut self, min_zoom: u32, max_zoom: u32) {
        let max_zoom = max_zoom.min(MAX_LEVEL);
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = max_zoom.max(min_zoom);
        self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Tiles per axis at the current zoom level
    pub fn scale(&self) -> f64 {
        2_f64.powi(self.zoom as i32)
    }

    /// Canvas size in pixels per axis at the current zoom
    pub fn canvas_size(&self) -> i64 {
        i64::from(self.tile_size) << self.zoom.min(40)
    }

    /// Projected units per horizontal pixel at `zoom`
    pub fn resolution_x_at(&self, zoom: u32) -> f64 {
        self.domain.width() / (f64::from(self.tile_size) * 2_f64.powi(zoom as i32))
    }

    /// Projected units per vertical pixel at `zoom`
    pub fn resolution_y_at(&self, zoom: u32) -> f64 {
        self.domain.height() / (f64::from(self.tile_size) * 2_f64.powi(zoom as i32))
    }

    pub fn resolution_x(&self) -> f64 {
        self.resolution_x_at(self.zoom)
    }

    pub fn resolution_y(&self) -> f64 {
        self.resolution_y_at(self.zoom)
    }

    /// The visible extent in projected coordinates
    pub fn extent(&self) -> Bounds {
        Bounds::from_center_and_size(
            self.center,
            f64::from(self.width) * self.resolution_x(),
            f64::from(self.height) * self.resolution_y(),
        )
    }

    /// Moves the view by a drag of `(dx, dy)` viewport pixels: content follows
    /// the pointer, so the center moves the opposite way. Returns the new center.
    pub fn pan(&mut self, dx: f64, dy: f64) -> ProjectedCoord {
        let target = ProjectedCoord::new(
            self.center.x - dx * self.resolution_x(),
            self.center.y + dy * self.resolution_y(),
        );
        self.set_center(target);
        self.center
    }

    /// Centers on `bounds` at the deepest zoom whose extent still covers them
    pub fn fit_bounds(&mut self, bounds: &Bounds) {
        self.set_center(bounds.center());

        let mut best_zoom = self.min_zoom;
        for zoom in self.min_zoom..=self.max_zoom {
            let covers_x = f64::from(self.width) * self.resolution_x_at(zoom) >= bounds.width();
            let covers_y = f64::from(self.height) * self.resolution_y_at(zoom) >= bounds.height();
            if covers_x && covers_y {
                best_zoom = zoom;
            } else {
                break;
            }
        }
        self.set_zoom(best_zoom);
    }
}
