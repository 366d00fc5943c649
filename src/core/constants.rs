//! Core constants shared by the pyramid, the projections and the overlay.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Deepest pyramid level we address. `2^30` tiles per axis still fits in a `u32`
/// and keeps absolute pixel coordinates well inside `i64`.
pub const MAX_LEVEL: u32 = 30;

/// Spherical mercator earth radius in meters (EPSG:3857).
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude at which the spherical mercator square extent ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Half the width of the spherical mercator extent, in meters.
pub const WEB_MERCATOR_HALF_EXTENT: f64 = std::f64::consts::PI * EARTH_RADIUS;

/// Priority label stamped on annotations created through a draw gesture.
pub const DEFAULT_PRIORITY: &str = "P0";
