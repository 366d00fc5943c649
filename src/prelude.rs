//! Prelude module for common annotile types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use annotile::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    config::{MapConfig, OverlayConfig, ViewportConfig},
    geo::{AbsolutePixel, GeoCoord, ProjectedCoord, ViewportPixel},
    map::{Map, MapEvent},
    mapper::CoordinateMapper,
    projection::{Identity, Projection, ProjectionKind, SphericalMercator},
    viewport::Viewport,
};

pub use crate::tiles::{
    address::{BinAddress, BinGrid, BinKey, TileAddress, TileKey},
    iterator::{TileIterator, TileRange},
    pyramid::{AoiPyramid, PyramidConfig, TilePyramid, WebPyramid},
    sync::{Generation, SyncConfig, SyncReport, TileSynchronizer},
};

pub use crate::data::annotation::{Annotation, AnnotationRef, Mutation, TileDataMap};

pub use crate::layers::{
    annotation::AnnotationLayer,
    overlay::{AnnotationOverlay, EditSurface, Feature, FeatureId, FeatureState},
    style::{MarkerStyle, OverlayStyles, RenderIntent},
};

pub use crate::service::{AnnotationService, MemoryAnnotationService, TileRequest};

#[cfg(feature = "http")]
pub use crate::service::HttpAnnotationService;

pub use crate::ui::shared::{ListenerId, SharedState};

pub use crate::{Error as MapError, Result};

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
