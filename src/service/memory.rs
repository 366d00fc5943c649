use super::{AnnotationService, TileRequest};
use crate::core::projection::Projection;
use crate::data::annotation::{Annotation, BinData, Mutation, TileDataMap};
use crate::prelude::HashSet;
use crate::tiles::{address::BinGrid, pyramid::TilePyramid};
use crate::{MapError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-process annotation store.
///
/// Records are kept flat and bucketed into tiles and bins on every fetch, using
/// the same pyramid, projection and bin grid the map uses.
#[derive(Debug)]
pub struct MemoryAnnotationService {
    pyramid: Arc<dyn TilePyramid>,
    projection: Arc<dyn Projection>,
    grid: BinGrid,
    records: Mutex<Vec<Annotation>>,
    submitted: Mutex<Vec<Mutation>>,
    fetches: AtomicUsize,
}

impl MemoryAnnotationService {
    pub fn new(pyramid: Arc<dyn TilePyramid>, projection: Arc<dyn Projection>, grid: BinGrid) -> Self {
        Self {
            pyramid,
            projection,
            grid,
            records: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Builder-style seeding of stored records
    pub fn with_annotations(self, annotations: impl IntoIterator<Item = Annotation>) -> Self {
        if let Ok(mut records) = self.records.lock() {
            records.extend(annotations);
        }
        self
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Every mutation received, accepted or not
    pub fn mutations(&self) -> Vec<Mutation> {
        self.submitted.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Number of fetch requests served
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn bucket(&self, request: &TileRequest) -> Result<TileDataMap> {
        let records = self
            .records
            .lock()
            .map_err(|_| MapError::Service("annotation store lock poisoned".into()))?;

        let mut data = TileDataMap::default();
        for tile in &request.tiles {
            data.insert(tile.key(), BinData::default());
        }
        let levels: HashSet<u32> = request.tiles.iter().map(|t| t.level).collect();

        for annotation in records.iter() {
            let projected = self.projection.project(annotation.position());
            if !projected.is_finite() {
                continue;
            }
            for &level in &levels {
                let (tile, bin) = self.pyramid.coordinate_to_tile_and_bin(projected, level, self.grid);
                if let Some(bins) = data.get_mut(&tile.key()) {
                    bins.entry(bin.key()).or_default().push(annotation.clone());
                }
            }
        }
        Ok(data)
    }

    fn apply(&self, mutation: &Mutation) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| MapError::Service("annotation store lock poisoned".into()))?;
        match mutation {
            Mutation::Create { annotation } => {
                records.push(annotation.clone());
                Ok(())
            }
            Mutation::Modify { old, new } => match records.iter_mut().find(|r| *r == old) {
                Some(record) => {
                    *record = new.clone();
                    Ok(())
                }
                None => Err(MapError::Service(format!(
                    "no stored annotation matches ({}, {})",
                    old.x, old.y
                ))),
            },
        }
    }
}

#[async_trait]
impl AnnotationService for MemoryAnnotationService {
    async fn fetch_tiles(&self, request: TileRequest) -> Result<TileDataMap> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        log::debug!("memory service: fetching {} tiles", request.len());
        self.bucket(&request)
    }

    async fn submit(&self, mutation: Mutation) -> Result<()> {
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(mutation.clone());
        }
        self.apply(&mutation)
    }
}
