//! # annotile
//!
//! Quad-tree tile addressing and viewport-driven annotation tiles.
//!
//! A [`TilePyramid`] splits a rectangular domain into `2^L × 2^L` tiles per
//! level, each optionally subdivided into bins. The [`Map`] keeps the
//! viewport and a [`CoordinateMapper`] between geographic, projected,
//! absolute-pixel and viewport-pixel space. An [`AnnotationLayer`] turns
//! every view change into a desired tile set for the [`TileSynchronizer`],
//! which fetches from an [`AnnotationService`] and discards superseded
//! results, and redraws its point features whenever the view is ready.

pub mod core;
pub mod data;
pub mod layers;
pub mod prelude;
pub mod service;
pub mod tiles;
pub mod ui;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::Bounds,
    config::{MapConfig, OverlayConfig, ViewportConfig},
    geo::{AbsolutePixel, GeoCoord, ProjectedCoord, ViewportPixel},
    map::{Map, MapEvent},
    mapper::CoordinateMapper,
    projection::{Identity, Projection, ProjectionKind, SphericalMercator},
    viewport::Viewport,
};

pub use data::{Annotation, AnnotationRef, Mutation, TileDataMap};

pub use layers::{AnnotationLayer, AnnotationOverlay, EditSurface, FeatureId, FeatureState};

pub use service::{AnnotationService, MemoryAnnotationService, TileRequest};

#[cfg(feature = "http")]
pub use service::HttpAnnotationService;

pub use tiles::{
    AoiPyramid, BinAddress, BinGrid, BinKey, Generation, SyncConfig, SyncReport, TileAddress,
    TileIterator, TileKey, TilePyramid, TileRange, TileSynchronizer, WebPyramid,
};

pub use ui::SharedState;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "http")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error type alias for convenience
pub type Error = MapError;
