use crate::data::annotation::{BinData, TileDataMap};
use crate::prelude::HashSet;
use crate::tiles::address::TileKey;

/// Resident per-tile annotation data held by the synchronizer.
///
/// Unlike a bounded LRU, residency here is decided entirely by the desired tile
/// set: tiles stay until they are no longer wanted.
#[derive(Debug, Clone, Default)]
pub struct TileDataCache {
    tiles: TileDataMap,
}

impl TileDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TileKey) -> Option<&BinData> {
        self.tiles.get(key)
    }

    /// Insert (or replace) the data of one tile
    pub fn insert(&mut self, key: TileKey, bins: BinData) {
        self.tiles.insert(key, bins);
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.tiles.contains_key(key)
    }

    pub fn remove(&mut self, key: &TileKey) -> Option<BinData> {
        self.tiles.remove(key)
    }

    /// Drops every tile not in `keep`, returning the evicted keys
    pub fn retain_only(&mut self, keep: &HashSet<TileKey>) -> Vec<TileKey> {
        let evicted: Vec<TileKey> = self
            .tiles
            .keys()
            .filter(|key| !keep.contains(key))
            .copied()
            .collect();
        for key in &evicted {
            self.tiles.remove(key);
        }
        evicted
    }

    /// Keys in `wanted` that are not resident
    pub fn missing<'a, I>(&self, wanted: I) -> Vec<TileKey>
    where
        I: IntoIterator<Item = &'a TileKey>,
    {
        wanted
            .into_iter()
            .filter(|key| !self.tiles.contains_key(key))
            .copied()
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TileKey> {
        self.tiles.keys()
    }

    pub fn data(&self) -> &TileDataMap {
        &self.tiles
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
