use crate::core::constants::MAX_LATITUDE;
use serde::{Deserialize, Serialize};

/// A geographic coordinate in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoord {
    pub lon: f64,
    pub lat: f64,
}

impl GeoCoord {
    /// Creates a new geographic coordinate
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lon >= -180.0 && self.lon <= 180.0
    }

    /// True when the latitude is inside the square web mercator extent
    pub fn is_within_mercator(&self) -> bool {
        self.is_valid() && self.lat.abs() <= MAX_LATITUDE
    }
}

impl Default for GeoCoord {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A point in map projection units (meters for mercator, degrees for identity)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCoord {
    pub x: f64,
    pub y: f64,
}

impl ProjectedCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> ProjectedCoord {
        ProjectedCoord::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for ProjectedCoord {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Pixel offset within the full pyramid canvas at one zoom level.
///
/// The origin is the bottom-left corner of the canvas and `y` grows upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbsolutePixel {
    pub x: i64,
    pub y: i64,
}

impl AbsolutePixel {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Pixel offset within the visible viewport.
///
/// The origin is the top-left corner of the viewport and `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewportPixel {
    pub x: i64,
    pub y: i64,
}

impl ViewportPixel {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_coord_creation() {
        let coord = GeoCoord::new(-74.0060, 40.7128);
        assert_eq!(coord.lon, -74.0060);
        assert_eq!(coord.lat, 40.7128);
        assert!(coord.is_valid());
        assert!(coord.is_within_mercator());
    }

    #[test]
    fn test_geo_coord_validity() {
        assert!(!GeoCoord::new(181.0, 0.0).is_valid());
        assert!(!GeoCoord::new(0.0, -90.5).is_valid());

        let pole = GeoCoord::new(0.0, 89.0);
        assert!(pole.is_valid());
        assert!(!pole.is_within_mercator());
    }

    #[test]
    fn test_projected_offset() {
        let point = ProjectedCoord::new(10.0, 20.0).offset(-5.0, 2.5);
        assert_eq!(point, ProjectedCoord::new(5.0, 22.5));
        assert!(point.is_finite());
        assert!(!ProjectedCoord::new(f64::INFINITY, 0.0).is_finite());
    }
}
