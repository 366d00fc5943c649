//! The boundary to whatever stores annotations.
//!
//! The synchronizer only ever talks to an [`AnnotationService`]: one call to
//! fetch a batch of tiles and one to persist a create or modify.

#[cfg(feature = "http")]
pub mod http;
pub mod memory;

use crate::data::annotation::{Mutation, TileDataMap};
use crate::tiles::{address::TileAddress, iterator::TileRange};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "http")]
pub use http::HttpAnnotationService;
pub use memory::MemoryAnnotationService;

/// Payload of one tile fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRequest {
    pub tiles: Vec<TileAddress>,
    /// Enclosing index range, present when every tile shares a level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<TileRange>,
}

impl TileRequest {
    pub fn new(tiles: Vec<TileAddress>) -> Self {
        let range = TileRange::enclosing(&tiles);
        Self { tiles, range }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Fetches tile-partitioned annotations and persists mutations
#[async_trait]
pub trait AnnotationService: Send + Sync + 'static {
    /// Data for the requested tiles. Tiles absent from the answer are treated
    /// as failed by the caller.
    async fn fetch_tiles(&self, request: TileRequest) -> Result<TileDataMap>;

    /// Persist a create or modify
    async fn submit(&self, mutation: Mutation) -> Result<()>;
}
