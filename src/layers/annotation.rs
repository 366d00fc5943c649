use crate::{
    core::{
        config::MapConfig,
        geo::{ProjectedCoord, ViewportPixel},
        map::{Map, MapEvent},
        projection::Projection,
    },
    layers::overlay::{AnnotationOverlay, EditSurface, FeatureId},
    prelude::Arc,
    service::AnnotationService,
    tiles::{
        address::{BinGrid, BinKey, TileKey},
        sync::{SyncReport, TileSynchronizer},
    },
    ui::shared::SharedState,
    Result,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde_json::{json, Value};

/// Shared state keys published by the layer
pub const SELECTED_KEY: &str = "selected";
pub const TILE_COUNT_KEY: &str = "tileCount";
pub const DRAW_ENABLED_KEY: &str = "drawEnabled";

/// Annotation tiles for the current view, drawn as editable point features.
///
/// Map events recompute the desired tiles and hand them to the synchronizer;
/// its ready notifications come back over a channel and trigger a full
/// redraw in [`pump`](Self::pump). User edits are forwarded as mutations.
pub struct AnnotationLayer<S: AnnotationService> {
    id: String,
    overlay: AnnotationOverlay,
    sync: TileSynchronizer<S>,
    projection: Arc<dyn Projection>,
    bin_grid: BinGrid,
    ready_tx: Sender<SyncReport>,
    ready_rx: Receiver<SyncReport>,
    state: SharedState,
}

impl<S: AnnotationService> AnnotationLayer<S> {
    /// Creates the layer and requests the tiles of the current view.
    /// Must be called inside a tokio runtime.
    pub fn new(id: impl Into<String>, map: &Map, service: Arc<S>, config: &MapConfig) -> Result<Self> {
        let (ready_tx, ready_rx) = unbounded();
        let mut layer = Self {
            id: id.into(),
            overlay: AnnotationOverlay::new(config.overlay.clone()),
            sync: TileSynchronizer::new(service, config.sync.clone())?,
            projection: Arc::clone(map.projection()),
            bin_grid: config.overlay.bin_grid,
            ready_tx,
            ready_rx,
            state: SharedState::new(),
        };
        layer.state.set(DRAW_ENABLED_KEY, json!(true));
        layer.on_map_update(map);
        Ok(layer)
    }

    pub fn on_map_event(&mut self, map: &Map, event: MapEvent) {
        if let MapEvent::ZoomEnd { .. } = event {
            self.overlay.on_zoom_end();
            self.publish_draw_enabled();
        }
        self.on_map_update(map);
    }

    /// Recomputes the desired tiles for the view and redraws from what is resident
    pub fn on_map_update(&mut self, map: &Map) {
        let ready_tx = self.ready_tx.clone();
        let generation = self.sync.desired_tiles_changed(map.tile_iterator(), move |report| {
            // The receiver lives as long as the layer
            let _ = ready_tx.send(report.clone());
        });
        log::debug!("{}: view at zoom {} is generation {}", self.id, map.zoom(), generation);

        self.state.set(TILE_COUNT_KEY, json!(self.sync.desired().len()));
        self.redraw();
    }

    /// Applies arrived tile data and redraws if the current view became ready.
    /// Call this from the event loop.
    pub fn pump(&mut self) -> Option<SyncReport> {
        self.sync.poll();
        self.drain_ready()
    }

    /// Waits for the current view's tiles, then redraws
    pub async fn sync_and_redraw(&mut self) -> Option<SyncReport> {
        let settled = self.sync.settle().await;
        self.drain_ready().or(settled)
    }

    fn drain_ready(&mut self) -> Option<SyncReport> {
        let report = self.ready_rx.try_iter().last()?;
        if report.is_degraded() {
            log::warn!(
                "{}: generation {} ready without {} tiles",
                self.id,
                report.generation,
                report.failed.len()
            );
        }
        self.redraw();
        Some(report)
    }

    /// Rebuilds every feature from the resident tiles
    pub fn redraw(&mut self) -> usize {
        let drawn = self.overlay.redraw(self.sync.current_data(), self.projection.as_ref());
        log::info!(
            "{}: {} features from {} tiles",
            self.id,
            drawn,
            self.sync.current_data().len()
        );
        drawn
    }

    /// User draw at a projected position
    pub fn draw_point(&mut self, position: ProjectedCoord) -> Option<FeatureId> {
        let id = self.overlay.add_feature(position, self.projection.as_ref());
        self.flush_outbox();
        id
    }

    pub fn draw_at_viewport_pixel(&mut self, map: &Map, pixel: ViewportPixel) -> Option<FeatureId> {
        self.draw_point(map.mapper().viewport_to_projected(pixel))
    }

    pub fn select(&mut self, id: FeatureId) -> Option<EditSurface> {
        let surface = self.overlay.select(id)?;
        self.publish_selected(&surface);
        Some(surface)
    }

    fn publish_selected(&mut self, surface: &EditSurface) {
        self.state.set(
            SELECTED_KEY,
            json!({
                "title": surface.title,
                "priority": surface.priority,
                "comment": surface.comment,
            }),
        );
        self.publish_draw_enabled();
    }

    pub fn unselect(&mut self, id: FeatureId) -> bool {
        if !self.overlay.unselect(id) {
            return false;
        }
        self.state.set(SELECTED_KEY, Value::Null);
        self.publish_draw_enabled();
        true
    }

    pub fn set_hovered(&mut self, id: FeatureId, hovered: bool) -> bool {
        self.overlay.set_hovered(id, hovered)
    }

    /// Starts a drag; the dragged feature becomes the published selection
    pub fn begin_drag(&mut self, id: FeatureId) -> bool {
        if !self.overlay.begin_drag(id) {
            return false;
        }
        if let Some(surface) = self.overlay.edit_surface(id) {
            self.publish_selected(&surface);
        }
        true
    }

    pub fn drag_to(&mut self, id: FeatureId, position: ProjectedCoord) -> bool {
        self.overlay.drag_to(id, position)
    }

    /// Drops a dragged feature and sends the modify of its cached record
    pub fn complete_drag(&mut self, id: FeatureId) -> bool {
        let queued = self.overlay.complete_drag(id, self.projection.as_ref());
        self.flush_outbox();
        queued
    }

    /// Forwards queued overlay mutations to the synchronizer
    pub fn flush_outbox(&mut self) -> usize {
        let mutations = self.overlay.take_mutations();
        let count = mutations.len();
        for mutation in mutations {
            self.sync.submit_mutation(mutation);
        }
        count
    }

    /// Waits until every submitted mutation reached the service
    pub async fn flush_mutations(&mut self) {
        self.sync.flush_mutations().await;
    }

    fn publish_draw_enabled(&mut self) {
        self.state.set(DRAW_ENABLED_KEY, json!(self.overlay.draw_enabled()));
    }

    pub fn tile_key_at(&self, map: &Map, pixel: ViewportPixel) -> TileKey {
        map.mapper().tile_key_at(pixel)
    }

    pub fn bin_key_at(&self, map: &Map, pixel: ViewportPixel) -> BinKey {
        map.mapper().bin_key_at(pixel, self.bin_grid)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn overlay(&self) -> &AnnotationOverlay {
        &self.overlay
    }

    pub fn synchronizer(&self) -> &TileSynchronizer<S> {
        &self.sync
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Mutable access, for registering listeners
    pub fn state_mut(&mut self) -> &mut SharedState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{bounds::Bounds, geo::GeoCoord};
    use crate::data::annotation::{Annotation, Mutation};
    use crate::service::MemoryAnnotationService;
    use std::sync::Mutex;

    fn setup() -> (Map, MapConfig, Arc<MemoryAnnotationService>) {
        let mut config = MapConfig::area_of_interest(Bounds::from_coords(0.0, 0.0, 100.0, 100.0));
        config.viewport.width = 512;
        config.viewport.height = 512;
        config.viewport.zoom = 1;
        config.sync = crate::tiles::sync::SyncConfig::for_testing();
        let map = Map::from_config(&config).unwrap();
        let service = Arc::new(
            MemoryAnnotationService::new(Arc::clone(map.pyramid()), Arc::clone(map.projection()), BinGrid::SINGLE)
                .with_annotations(vec![
                    Annotation::new(GeoCoord::new(10.0, 10.0), "P1", "low", ""),
                    Annotation::new(GeoCoord::new(60.0, 60.0), "P2", "high", "note"),
                ]),
        );
        (map, config, service)
    }

    #[tokio::test]
    async fn test_layer_draws_fetched_annotations() {
        let (map, config, service) = setup();
        let mut layer = AnnotationLayer::new("annotations", &map, service, &config).unwrap();
        assert!(layer.overlay().is_empty());
        assert_eq!(layer.state().get(TILE_COUNT_KEY), json!(4));

        let report = layer.sync_and_redraw().await.unwrap();
        assert!(!report.is_degraded());
        assert_eq!(layer.overlay().len(), 2);
    }

    #[tokio::test]
    async fn test_selection_is_published() {
        let (map, config, service) = setup();
        let mut layer = AnnotationLayer::new("annotations", &map, service, &config).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        layer.state_mut().add_listener(move |key| sink.lock().unwrap().push(key.to_string()));
        layer.sync_and_redraw().await;

        let high = layer
            .overlay()
            .features()
            .iter()
            .find(|f| f.attributes.as_ref().map(|a| a.annotation.title()) == Some("high"))
            .map(|f| f.id)
            .unwrap();
        let surface = layer.select(high).unwrap();
        assert_eq!(surface.comment, "note");
        assert_eq!(layer.state().get_field(SELECTED_KEY, "priority"), json!("P2"));
        assert_eq!(layer.state().get(DRAW_ENABLED_KEY), json!(false));

        assert!(layer.unselect(high));
        assert!(!layer.state().has(SELECTED_KEY));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SELECTED_KEY, DRAW_ENABLED_KEY, SELECTED_KEY, DRAW_ENABLED_KEY]
        );
    }

    #[tokio::test]
    async fn test_user_draw_reaches_service() {
        let (map, config, service) = setup();
        let mut layer = AnnotationLayer::new("annotations", &map, Arc::clone(&service), &config).unwrap();
        layer.sync_and_redraw().await;

        assert!(layer.draw_point(ProjectedCoord::new(30.0, 70.0)).is_some());
        layer.flush_mutations().await;
        match service.mutations().as_slice() {
            [Mutation::Create { annotation }] => assert_eq!((annotation.x, annotation.y), (30.0, 70.0)),
            other => panic!("unexpected mutations {:?}", other),
        }

        // a rebuild from fetched data sends nothing back
        layer.redraw();
        layer.flush_mutations().await;
        assert_eq!(service.mutations().len(), 1);
    }

    #[tokio::test]
    async fn test_zoom_reenables_drawing_and_refetches() {
        let (mut map, config, service) = setup();
        let mut layer = AnnotationLayer::new("annotations", &map, Arc::clone(&service), &config).unwrap();
        layer.sync_and_redraw().await;
        let first = layer.overlay().features()[0].id;
        layer.select(first);

        let event = map.zoom_in();
        layer.on_map_event(&map, event);
        assert!(layer.overlay().draw_enabled());
        assert_eq!(layer.state().get(DRAW_ENABLED_KEY), json!(true));

        layer.sync_and_redraw().await;
        assert_eq!(service.fetch_count(), 2);
        assert!(layer.synchronizer().is_settled());
    }
}
