pub mod address;
pub mod cache;
pub mod iterator;
pub mod pyramid;
pub mod sync;

// Re-exports for convenience
pub use address::{BinAddress, BinGrid, BinKey, TileAddress, TileKey};
pub use cache::TileDataCache;
pub use iterator::{TileIterator, TileRange};
pub use pyramid::{AoiPyramid, PyramidConfig, TilePyramid, WebPyramid};
pub use sync::{Generation, SyncConfig, SyncReport, TileSynchronizer};
