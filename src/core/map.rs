use crate::{
    core::{
        bounds::Bounds,
        config::MapConfig,
        geo::{ProjectedCoord, ViewportPixel},
        mapper::CoordinateMapper,
        projection::Projection,
        viewport::Viewport,
    },
    prelude::{Arc, HashSet},
    tiles::{
        address::TileAddress,
        iterator::{TileIterator, TileRange},
        pyramid::TilePyramid,
    },
    Result,
};

/// What a view change reports to layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    PanEnd,
    ZoomEnd { zoom: u32 },
    Resize { width: u32, height: u32 },
}

/// The map: viewport state plus the coordinate mapper reading it
#[derive(Debug, Clone)]
pub struct Map {
    mapper: CoordinateMapper,
}

impl Map {
    pub fn new(pyramid: Arc<dyn TilePyramid>, projection: Arc<dyn Projection>, viewport: Viewport) -> Self {
        Self {
            mapper: CoordinateMapper::new(pyramid, projection, viewport),
        }
    }

    pub fn from_config(config: &MapConfig) -> Result<Self> {
        config.validate()?;
        let pyramid = config.pyramid.build()?;
        let projection = config.projection.build();
        let domain = pyramid.bounds();
        let view = &config.viewport;

        let mut viewport = Viewport::new(
            domain,
            config.tile_size,
            view.center.unwrap_or_else(|| domain.center()),
            view.zoom,
            view.width,
            view.height,
        );
        viewport.set_zoom_limits(view.min_zoom, view.max_zoom);
        viewport.set_zoom(view.zoom);

        log::info!(
            "map over {} pyramid in {}, zoom {}",
            pyramid.name(),
            projection.code(),
            viewport.zoom
        );
        Ok(Self::new(pyramid, projection, viewport))
    }

    /// Drag by `(dx, dy)` viewport pixels
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> MapEvent {
        self.mapper.viewport_mut().pan(dx, dy);
        MapEvent::PanEnd
    }

    pub fn pan_to(&mut self, center: ProjectedCoord) -> MapEvent {
        self.mapper.viewport_mut().set_center(center);
        MapEvent::PanEnd
    }

    pub fn zoom_to(&mut self, zoom: u32) -> MapEvent {
        self.mapper.viewport_mut().set_zoom(zoom);
        MapEvent::ZoomEnd { zoom: self.zoom() }
    }

    pub fn zoom_in(&mut self) -> MapEvent {
        self.zoom_to(self.zoom().saturating_add(1))
    }

    pub fn zoom_out(&mut self) -> MapEvent {
        self.zoom_to(self.zoom().saturating_sub(1))
    }

    /// Centers on `bounds` at the deepest zoom that still shows all of them
    pub fn zoom_to_extent(&mut self, bounds: &Bounds) -> MapEvent {
        self.mapper.viewport_mut().fit_bounds(bounds);
        MapEvent::ZoomEnd { zoom: self.zoom() }
    }

    pub fn resize(&mut self, width: u32, height: u32) -> MapEvent {
        let viewport = self.mapper.viewport_mut();
        viewport.set_size(width, height);
        MapEvent::Resize {
            width: viewport.width,
            height: viewport.height,
        }
    }

    /// Tiles of the current level intersecting the visible extent
    pub fn tile_iterator(&self) -> TileIterator {
        TileIterator::new(self.pyramid().as_ref(), self.zoom(), &self.extent())
    }

    pub fn tiles_in_view(&self) -> HashSet<TileAddress> {
        self.tile_iterator().rest()
    }

    pub fn tile_range_in_view(&self) -> Option<TileRange> {
        self.tile_iterator().to_tile_range()
    }

    /// Absolute canvas bounds at the current zoom, in viewport pixels
    pub fn min_and_max_in_viewport_pixels(&self) -> (ViewportPixel, ViewportPixel) {
        self.mapper.canvas_in_viewport_pixels()
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn viewport(&self) -> &Viewport {
        self.mapper.viewport()
    }

    pub fn pyramid(&self) -> &Arc<dyn TilePyramid> {
        self.mapper.pyramid()
    }

    pub fn projection(&self) -> &Arc<dyn Projection> {
        self.mapper.projection()
    }

    pub fn zoom(&self) -> u32 {
        self.mapper.zoom()
    }

    pub fn extent(&self) -> Bounds {
        self.viewport().extent()
    }
}
