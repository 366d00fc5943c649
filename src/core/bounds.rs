use crate::core::geo::ProjectedCoord;
use serde::{Deserialize, Serialize};

/// Represents a rectangle in projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: ProjectedCoord,
    pub max: ProjectedCoord,
}

impl Bounds {
    /// Creates new bounds from two corners, normalising their order
    pub fn new(a: ProjectedCoord, b: ProjectedCoord) -> Self {
        Self {
            min: ProjectedCoord::new(a.x.min(b.x), a.y.min(b.y)),
            max: ProjectedCoord::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(
            ProjectedCoord::new(min_x, min_y),
            ProjectedCoord::new(max_x, max_y),
        )
    }

    /// Creates bounds from a center point and size
    pub fn from_center_and_size(center: ProjectedCoord, width: f64, height: f64) -> Self {
        let half_width = width / 2.0;
        let half_height = height / 2.0;
        Self::from_coords(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        )
    }

    /// Gets the width of the bounds
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Gets the height of the bounds
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> ProjectedCoord {
        ProjectedCoord::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Checks if the bounds contain a point (edges included)
    pub fn contains(&self, point: &ProjectedCoord) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Checks if the bounds intersect with another bounds (touching edges count)
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.max.x < self.min.x
            || other.min.x > self.max.x
            || other.max.y < self.min.y
            || other.min.y > self.max.y)
    }

    /// Checks that both corners are finite and ordered
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
    }

    /// Clamps a point to be within the bounds
    pub fn clamp(&self, point: &ProjectedCoord) -> ProjectedCoord {
        ProjectedCoord::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }

    /// Returns a copy grown by `amount` on every side
    pub fn expanded(&self, amount: f64) -> Bounds {
        Bounds::from_coords(
            self.min.x - amount,
            self.min.y - amount,
            self.max.x + amount,
            self.max.y + amount,
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::from_coords(0.0, 0.0, 0.0, 0.0)
    }
}
