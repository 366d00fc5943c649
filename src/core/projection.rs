//! Geographic ↔ projected transforms.
//!
//! The coordinate mapper treats the projection as a swappable function: it must
//! round-trip within its own precision and must never clamp silently. Inputs
//! outside a projection's domain produce non-finite output instead.

use crate::core::{
    bounds::Bounds,
    constants::{EARTH_RADIUS, MAX_LATITUDE, WEB_MERCATOR_HALF_EXTENT},
    geo::{GeoCoord, ProjectedCoord},
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt::Debug;
use std::sync::Arc;

/// Converts between geographic degrees and projection units
pub trait Projection: Send + Sync + Debug {
    /// Short identifier, e.g. `"EPSG:3857"`
    fn code(&self) -> &'static str;

    /// Geographic → projected
    fn project(&self, geo: GeoCoord) -> ProjectedCoord;

    /// Projected → geographic
    fn unproject(&self, point: ProjectedCoord) -> GeoCoord;

    /// The full projected extent this projection covers
    fn extent(&self) -> Bounds;

    /// Whether `geo` lies inside the domain where `project` is defined
    fn in_domain(&self, geo: GeoCoord) -> bool {
        geo.is_valid()
    }
}

/// Spherical (web) mercator, EPSG:3857
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SphericalMercator;

impl Projection for SphericalMercator {
    fn code(&self) -> &'static str {
        "EPSG:3857"
    }

    fn project(&self, geo: GeoCoord) -> ProjectedCoord {
        let x = geo.lon.to_radians() * EARTH_RADIUS;
        let y = (PI / 4.0 + geo.lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
        ProjectedCoord::new(x, y)
    }

    fn unproject(&self, point: ProjectedCoord) -> GeoCoord {
        let lon = (point.x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        GeoCoord::new(lon, lat)
    }

    fn extent(&self) -> Bounds {
        Bounds::from_coords(
            -WEB_MERCATOR_HALF_EXTENT,
            -WEB_MERCATOR_HALF_EXTENT,
            WEB_MERCATOR_HALF_EXTENT,
            WEB_MERCATOR_HALF_EXTENT,
        )
    }

    fn in_domain(&self, geo: GeoCoord) -> bool {
        geo.is_valid() && geo.lat.abs() <= MAX_LATITUDE
    }
}

/// Plate carrée: projected units are the geographic degrees themselves
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Identity;

impl Projection for Identity {
    fn code(&self) -> &'static str {
        "EPSG:4326"
    }

    fn project(&self, geo: GeoCoord) -> ProjectedCoord {
        ProjectedCoord::new(geo.lon, geo.lat)
    }

    fn unproject(&self, point: ProjectedCoord) -> GeoCoord {
        GeoCoord::new(point.x, point.y)
    }

    fn extent(&self) -> Bounds {
        Bounds::from_coords(-180.0, -90.0, 180.0, 90.0)
    }
}

/// Configuration-time projection choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionKind {
    Identity,
    #[default]
    SphericalMercator,
}

impl ProjectionKind {
    pub fn build(self) -> Arc<dyn Projection> {
        match self {
            ProjectionKind::Identity => Arc::new(Identity),
            ProjectionKind::SphericalMercator => Arc::new(SphericalMercator),
        }
    }
}
