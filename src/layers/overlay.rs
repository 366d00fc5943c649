//! Point features drawn from the resident annotation tiles.
//!
//! The overlay never touches the synchronizer. It reads a [`TileDataMap`]
//! snapshot when redrawing and queues the writes a user causes (draw, drag)
//! in an outbox that the owning layer forwards as fire-and-forget mutations.

use crate::{
    core::{config::OverlayConfig, geo::ProjectedCoord, projection::Projection},
    data::annotation::{Annotation, AnnotationRef, Mutation, TileDataMap},
    layers::style::{MarkerStyle, RenderIntent},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(u64);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureState {
    Rendered,
    Selected,
    Dragging,
}

/// The cached record a feature was built from
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureAttributes {
    pub source: AnnotationRef,
    pub annotation: Annotation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub position: ProjectedCoord,
    pub state: FeatureState,
    pub hovered: bool,
    /// `None` for features the user drew that no fetch has confirmed yet
    pub attributes: Option<FeatureAttributes>,
}

/// Text fields offered for editing when a feature is selected.
/// Absent fields come through as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSurface {
    pub title: String,
    pub priority: String,
    pub comment: String,
}

impl EditSurface {
    pub fn from_annotation(annotation: &Annotation) -> Self {
        Self {
            title: annotation.title().to_string(),
            priority: annotation.priority().to_string(),
            comment: annotation.comment().to_string(),
        }
    }
}

#[derive(Debug)]
pub struct AnnotationOverlay {
    config: OverlayConfig,
    features: Vec<Feature>,
    next_id: u64,
    rebuilding: bool,
    draw_enabled: bool,
    outbox: Vec<Mutation>,
}

impl AnnotationOverlay {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            features: Vec::new(),
            next_id: 0,
            rebuilding: false,
            draw_enabled: true,
            outbox: Vec::new(),
        }
    }

    /// Destroys every feature and re-creates one per annotation in `data`.
    /// A feature being dragged survives and is not drawn a second time.
    /// Returns the number of features drawn.
    pub fn redraw(&mut self, data: &TileDataMap, projection: &dyn Projection) -> usize {
        self.begin_rebuild();
        let mut awaiting_dragged = !self.features.is_empty();

        let mut tile_keys: Vec<_> = data.keys().copied().collect();
        tile_keys.sort();
        for tile_key in tile_keys {
            let Some(bins) = data.get(&tile_key) else { continue };
            let mut bin_keys: Vec<_> = bins.keys().copied().collect();
            bin_keys.sort();
            for bin_key in bin_keys {
                let Some(annotations) = bins.get(&bin_key) else { continue };
                for (index, annotation) in annotations.iter().enumerate() {
                    let source = AnnotationRef { tile_key, bin_key, index };
                    if awaiting_dragged && self.rebind_dragged(annotation, source) {
                        awaiting_dragged = false;
                        continue;
                    }
                    let position = projection.project(annotation.position());
                    if let Some(id) = self.add_feature(position, projection) {
                        self.attach(
                            id,
                            FeatureAttributes {
                                source,
                                annotation: annotation.clone(),
                            },
                        );
                    }
                }
            }
        }

        self.end_rebuild();
        log::debug!("overlay redrawn with {} features", self.features.len());
        self.features.len()
    }

    /// Clears all features except one being dragged, and marks the following
    /// adds as programmatic
    pub fn begin_rebuild(&mut self) {
        self.rebuilding = true;
        self.features.retain(|f| f.state == FeatureState::Dragging);
    }

    /// Points a dragged feature at the fresh location of its record.
    /// Returns true when `annotation` is that record.
    fn rebind_dragged(&mut self, annotation: &Annotation, source: AnnotationRef) -> bool {
        let dragged = self.features.iter_mut().find(|f| {
            f.state == FeatureState::Dragging
                && f.attributes.as_ref().map_or(false, |a| &a.annotation == annotation)
        });
        match dragged.and_then(|f| f.attributes.as_mut()) {
            Some(attributes) => {
                attributes.source = source;
                true
            }
            None => false,
        }
    }

    pub fn end_rebuild(&mut self) {
        self.rebuilding = false;
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding
    }

    /// Adds a point feature at `position`.
    ///
    /// Outside a rebuild this is a user draw: it needs the draw control to be
    /// active and queues a create for the annotation it stands for.
    pub fn add_feature(&mut self, position: ProjectedCoord, projection: &dyn Projection) -> Option<FeatureId> {
        if !self.rebuilding && !self.draw_enabled {
            log::debug!("draw control inactive, ignoring feature at {:?}", position);
            return None;
        }

        let id = FeatureId(self.next_id);
        self.next_id += 1;
        self.features.push(Feature {
            id,
            position,
            state: FeatureState::Rendered,
            hovered: false,
            attributes: None,
        });

        if !self.rebuilding {
            let annotation = Annotation::new(
                projection.unproject(position),
                &self.config.default_priority,
                &self.config.default_title,
                &self.config.default_comment,
            );
            self.outbox.push(Mutation::Create { annotation });
        }
        Some(id)
    }

    fn attach(&mut self, id: FeatureId, attributes: FeatureAttributes) {
        if let Some(feature) = self.feature_mut(id) {
            feature.attributes = Some(attributes);
        }
    }

    /// Selects `id` (unselecting any other) and turns drawing off
    pub fn select(&mut self, id: FeatureId) -> Option<EditSurface> {
        self.feature(id)?;
        // one selection, and at most one drag, at a time
        for feature in self.features.iter_mut() {
            feature.state = FeatureState::Rendered;
        }
        if let Some(feature) = self.feature_mut(id) {
            feature.state = FeatureState::Selected;
        }
        self.draw_enabled = false;
        self.edit_surface(id)
    }

    /// Edit fields of `id`, config defaults for a feature without a record
    pub fn edit_surface(&self, id: FeatureId) -> Option<EditSurface> {
        let feature = self.feature(id)?;
        Some(match feature.attributes.as_ref() {
            Some(attributes) => EditSurface::from_annotation(&attributes.annotation),
            None => EditSurface {
                title: self.config.default_title.clone(),
                priority: self.config.default_priority.clone(),
                comment: self.config.default_comment.clone(),
            },
        })
    }

    pub fn unselect(&mut self, id: FeatureId) -> bool {
        match self.feature_mut(id) {
            Some(feature) if feature.state == FeatureState::Selected => {
                feature.state = FeatureState::Rendered;
                self.draw_enabled = true;
                true
            }
            _ => false,
        }
    }

    pub fn selected(&self) -> Option<&Feature> {
        self.features.iter().find(|f| f.state == FeatureState::Selected)
    }

    pub fn set_hovered(&mut self, id: FeatureId, hovered: bool) -> bool {
        match self.feature_mut(id) {
            Some(feature) => {
                feature.hovered = hovered;
                true
            }
            None => false,
        }
    }

    /// Starts dragging `id`. The feature becomes the selection first, so the
    /// edit surface opens and drawing turns off.
    pub fn begin_drag(&mut self, id: FeatureId) -> bool {
        if self.select(id).is_none() {
            return false;
        }
        match self.feature_mut(id) {
            Some(feature) => {
                feature.state = FeatureState::Dragging;
                true
            }
            None => false,
        }
    }

    /// Moves a dragged feature; the new position shows immediately
    pub fn drag_to(&mut self, id: FeatureId, position: ProjectedCoord) -> bool {
        match self.feature_mut(id) {
            Some(feature) if feature.state == FeatureState::Dragging => {
                feature.position = position;
                true
            }
            _ => false,
        }
    }

    /// Ends a drag, leaving the feature selected, and queues a modify of the
    /// record it was drawn from. Returns whether a modify was queued.
    ///
    /// `old` is the record as it was cached when the feature was drawn, even
    /// if the tile was refetched or evicted during the drag. A feature the
    /// user drew that no fetch has confirmed yet has no record and is only
    /// moved.
    pub fn complete_drag(&mut self, id: FeatureId, projection: &dyn Projection) -> bool {
        let Some(feature) = self.feature_mut(id) else {
            log::warn!("{} vanished during the drag, drag not saved", id);
            return false;
        };
        if feature.state != FeatureState::Dragging {
            return false;
        }
        feature.state = FeatureState::Selected;

        let Some(attributes) = feature.attributes.as_ref() else {
            log::warn!("{} has no cached record yet, drag not saved", id);
            return false;
        };
        let old = attributes.annotation.clone();
        let new = old.moved_to(projection.unproject(feature.position));
        log::debug!(
            "{} moved from record {}/{}#{}",
            id,
            attributes.source.tile_key,
            attributes.source.bin_key,
            attributes.source.index
        );
        self.outbox.push(Mutation::Modify { old, new });
        true
    }

    /// Zooming ends any edit session, so drawing comes back
    pub fn on_zoom_end(&mut self) {
        self.draw_enabled = true;
    }

    pub fn draw_enabled(&self) -> bool {
        self.draw_enabled
    }

    pub fn style_for(&self, id: FeatureId) -> Option<&MarkerStyle> {
        let feature = self.feature(id)?;
        let intent = if feature.state != FeatureState::Rendered {
            RenderIntent::Select
        } else if feature.hovered {
            RenderIntent::Hover
        } else {
            RenderIntent::Default
        };
        Some(self.config.styles.for_intent(intent))
    }

    /// Removes and returns the queued mutations
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.outbox)
    }

    pub fn queued_mutations(&self) -> &[Mutation] {
        &self.outbox
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    fn feature_mut(&mut self, id: FeatureId) -> Option<&mut Feature> {
        self.features.iter_mut().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::GeoCoord;
    use crate::core::projection::{Identity, SphericalMercator};
    use crate::prelude::HashMap;
    use crate::tiles::address::{BinAddress, TileAddress};

    fn record(lon: f64, lat: f64, title: &str) -> Annotation {
        Annotation::new(GeoCoord::new(lon, lat), "P1", title, "")
    }

    fn sample_data() -> TileDataMap {
        let mut bins = HashMap::default();
        bins.insert(
            BinAddress::new(0, 0).key(),
            vec![record(10.0, 80.0, "a"), record(20.0, 70.0, "b")],
        );
        bins.insert(BinAddress::new(1, 1).key(), vec![record(40.0, 10.0, "c")]);
        let mut data = HashMap::default();
        data.insert(TileAddress::new(0, 0, 0).key(), bins);
        data
    }

    #[test]
    fn test_user_draw_queues_one_create() {
        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        let id = overlay.add_feature(ProjectedCoord::new(5.0, 6.0), &Identity).unwrap();

        assert_eq!(overlay.feature(id).unwrap().state, FeatureState::Rendered);
        let mutations = overlay.take_mutations();
        assert_eq!(mutations.len(), 1);
        match &mutations[0] {
            Mutation::Create { annotation } => {
                assert_eq!((annotation.x, annotation.y), (5.0, 6.0));
                assert_eq!(annotation.priority(), "P0");
            }
            other => panic!("unexpected mutation {:?}", other),
        }
        assert!(overlay.take_mutations().is_empty());
    }

    #[test]
    fn test_adds_during_rebuild_queue_nothing() {
        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        overlay.begin_rebuild();
        for i in 0..10 {
            overlay.add_feature(ProjectedCoord::new(f64::from(i), 0.0), &Identity);
        }
        overlay.end_rebuild();

        assert_eq!(overlay.len(), 10);
        assert!(overlay.queued_mutations().is_empty());
    }

    #[test]
    fn test_redraw_replaces_everything() {
        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        overlay.add_feature(ProjectedCoord::new(1.0, 1.0), &Identity);
        overlay.take_mutations();

        assert_eq!(overlay.redraw(&sample_data(), &Identity), 3);
        assert!(!overlay.is_rebuilding());
        assert!(overlay.queued_mutations().is_empty());
        assert!(overlay.features().iter().all(|f| f.attributes.is_some()));

        let second = &overlay.features()[1];
        let attributes = second.attributes.as_ref().unwrap();
        assert_eq!(attributes.source.bin_key.to_string(), "0,0");
        assert_eq!(attributes.source.index, 1);
        assert_eq!(second.position, ProjectedCoord::new(20.0, 70.0));

        assert_eq!(overlay.redraw(&TileDataMap::default(), &Identity), 0);
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_redraw_projects_positions() {
        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        overlay.redraw(&sample_data(), &SphericalMercator);
        let expected = SphericalMercator.project(GeoCoord::new(10.0, 80.0));
        assert_eq!(overlay.features()[0].position, expected);
    }

    #[test]
    fn test_selection_toggles_draw_control() {
        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        overlay.redraw(&sample_data(), &Identity);
        let first = overlay.features()[0].id;
        let second = overlay.features()[1].id;

        let surface = overlay.select(first).unwrap();
        assert_eq!(surface.title, "a");
        assert_eq!(surface.priority, "P1");
        assert!(!overlay.draw_enabled());
        assert!(overlay.add_feature(ProjectedCoord::new(0.0, 0.0), &Identity).is_none());

        overlay.select(second);
        assert_eq!(overlay.feature(first).unwrap().state, FeatureState::Rendered);
        assert_eq!(overlay.selected().map(|f| f.id), Some(second));

        assert!(overlay.unselect(second));
        assert!(overlay.draw_enabled());
        assert!(!overlay.unselect(second));
    }

    #[test]
    fn test_zoom_end_reenables_drawing() {
        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        overlay.redraw(&sample_data(), &Identity);
        overlay.select(overlay.features()[0].id);
        overlay.on_zoom_end();
        assert!(overlay.draw_enabled());
    }

    #[test]
    fn test_missing_fields_render_empty() {
        let mut data = TileDataMap::default();
        let bare: Annotation = serde_json::from_str(r#"{"x": 1.0, "y": 2.0}"#).unwrap();
        data.entry(TileAddress::new(0, 0, 0).key())
            .or_default()
            .insert(BinAddress::new(0, 0).key(), vec![bare]);

        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        overlay.redraw(&data, &Identity);
        let surface = overlay.select(overlay.features()[0].id).unwrap();
        assert_eq!(surface, EditSurface::default());
    }

    #[test]
    fn test_drag_queues_modify_of_cached_record() {
        let data = sample_data();
        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        overlay.redraw(&data, &Identity);
        let id = overlay.features()[2].id;

        assert!(!overlay.drag_to(id, ProjectedCoord::new(0.0, 0.0)));
        assert!(overlay.begin_drag(id));
        assert!(overlay.drag_to(id, ProjectedCoord::new(45.0, 15.0)));
        assert!(overlay.complete_drag(id, &Identity));
        assert_eq!(overlay.feature(id).unwrap().state, FeatureState::Selected);
        assert!(!overlay.draw_enabled());

        match overlay.take_mutations().as_slice() {
            [Mutation::Modify { old, new }] => {
                assert_eq!(old, &record(40.0, 10.0, "c"));
                assert_eq!((new.x, new.y), (45.0, 15.0));
                assert_eq!(new.data, old.data);
            }
            other => panic!("unexpected mutations {:?}", other),
        }
    }

    #[test]
    fn test_drag_without_record_is_not_saved() {
        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        let drawn = overlay.add_feature(ProjectedCoord::new(1.0, 1.0), &Identity).unwrap();
        overlay.take_mutations();

        assert!(overlay.begin_drag(drawn));
        assert!(overlay.drag_to(drawn, ProjectedCoord::new(2.0, 2.0)));
        assert!(!overlay.complete_drag(drawn, &Identity));
        assert_eq!(overlay.feature(drawn).unwrap().position, ProjectedCoord::new(2.0, 2.0));
        assert!(overlay.queued_mutations().is_empty());
    }

    #[test]
    fn test_drag_survives_redraw() {
        let data = sample_data();
        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        overlay.redraw(&data, &Identity);
        let id = overlay.features()[2].id;
        overlay.begin_drag(id);
        overlay.drag_to(id, ProjectedCoord::new(41.0, 11.0));

        // tiles land mid-drag
        assert_eq!(overlay.redraw(&data, &Identity), 3);
        assert_eq!(overlay.feature(id).unwrap().state, FeatureState::Dragging);
        assert_eq!(overlay.feature(id).unwrap().position, ProjectedCoord::new(41.0, 11.0));

        // and the tile is gone by the drop
        assert_eq!(overlay.redraw(&TileDataMap::default(), &Identity), 1);
        assert!(overlay.drag_to(id, ProjectedCoord::new(42.0, 12.0)));
        assert!(overlay.complete_drag(id, &Identity));

        match overlay.take_mutations().as_slice() {
            [Mutation::Modify { old, new }] => {
                assert_eq!(old, &record(40.0, 10.0, "c"));
                assert_eq!((new.x, new.y), (42.0, 12.0));
            }
            other => panic!("unexpected mutations {:?}", other),
        }
    }

    #[test]
    fn test_begin_drag_selects() {
        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        overlay.redraw(&sample_data(), &Identity);
        let first = overlay.features()[0].id;
        let second = overlay.features()[1].id;
        overlay.select(first);

        assert!(overlay.begin_drag(second));
        assert!(!overlay.draw_enabled());
        assert_eq!(overlay.feature(first).unwrap().state, FeatureState::Rendered);
        assert_eq!(overlay.edit_surface(second).unwrap().title, "b");
        assert!(!overlay.begin_drag(FeatureId(99)));
    }

    #[test]
    fn test_style_follows_state() {
        let mut overlay = AnnotationOverlay::new(OverlayConfig::default());
        overlay.redraw(&sample_data(), &Identity);
        let id = overlay.features()[0].id;
        let styles = overlay.config().styles.clone();

        assert_eq!(overlay.style_for(id), Some(&styles.default));
        overlay.set_hovered(id, true);
        assert_eq!(overlay.style_for(id), Some(&styles.hover));
        overlay.select(id);
        assert_eq!(overlay.style_for(id), Some(&styles.select));
    }
}
