use crate::core::bounds::Bounds;
use crate::prelude::HashSet;
use crate::tiles::{address::TileAddress, pyramid::TilePyramid};
use serde::{Deserialize, Serialize};

/// Compact description of a rectangular block of tiles at one level.
///
/// This is the cache-request payload form of a tile set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileRange {
    pub level: u32,
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl TileRange {
    /// Smallest range enclosing `tiles`; `None` when empty or spread over levels
    pub fn enclosing<'a, I>(tiles: I) -> Option<TileRange>
    where
        I: IntoIterator<Item = &'a TileAddress>,
    {
        let mut tiles = tiles.into_iter();
        let first = tiles.next()?;
        let mut range = TileRange {
            level: first.level,
            min_x: first.x_index,
            max_x: first.x_index,
            min_y: first.y_index,
            max_y: first.y_index,
        };
        for tile in tiles {
            if tile.level != range.level {
                return None;
            }
            range.min_x = range.min_x.min(tile.x_index);
            range.max_x = range.max_x.max(tile.x_index);
            range.min_y = range.min_y.min(tile.y_index);
            range.max_y = range.max_y.max(tile.y_index);
        }
        Some(range)
    }

    pub fn contains(&self, tile: &TileAddress) -> bool {
        tile.level == self.level
            && (self.min_x..=self.max_x).contains(&tile.x_index)
            && (self.min_y..=self.max_y).contains(&tile.y_index)
    }

    /// Number of tiles in the range
    pub fn len(&self) -> usize {
        let width = u64::from(self.max_x - self.min_x) + 1;
        let height = u64::from(self.max_y - self.min_y) + 1;
        (width * height) as usize
    }

    /// A range always holds at least its minimum tile
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Fresh iterator over the range
    pub fn iter(&self) -> TileIterator {
        TileIterator::from_range(Some(*self))
    }
}

/// Lazily walks the tiles of one level that intersect a projected extent.
///
/// Tiles are produced row by row, x fastest, starting at the minimum tile.
/// Tiles touching the extent on an edge are included. Cloning (or building a
/// new iterator over the same inputs) restarts the identical sequence.
#[derive(Debug, Clone)]
pub struct TileIterator {
    range: Option<TileRange>,
    cursor: Option<(u32, u32)>,
}

impl TileIterator {
    /// Tiles of `pyramid` at `level` whose bounds intersect `extent`
    pub fn new(pyramid: &dyn TilePyramid, level: u32, extent: &Bounds) -> Self {
        Self::from_range(covered_range(pyramid, level, extent))
    }

    /// Same as [`TileIterator::new`] with the extent spelled out
    pub fn from_extent(
        pyramid: &dyn TilePyramid,
        level: u32,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Self {
        Self::new(pyramid, level, &Bounds::from_coords(min_x, min_y, max_x, max_y))
    }

    fn from_range(range: Option<TileRange>) -> Self {
        Self {
            range,
            cursor: range.map(|r| (r.min_x, r.min_y)),
        }
    }

    /// Covered index range, independent of iteration progress
    pub fn to_tile_range(&self) -> Option<TileRange> {
        self.range
    }

    /// Consumes the remaining sequence into a set
    pub fn rest(self) -> HashSet<TileAddress> {
        self.collect()
    }
}

impl Iterator for TileIterator {
    type Item = TileAddress;

    fn next(&mut self) -> Option<TileAddress> {
        let range = self.range?;
        let (x, y) = self.cursor?;
        self.cursor = if x < range.max_x {
            Some((x + 1, y))
        } else if y < range.max_y {
            Some((range.min_x, y + 1))
        } else {
            None
        };
        Some(TileAddress::new(range.level, x, y))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match (self.range, self.cursor) {
            (Some(range), Some((x, y))) => {
                let row_width = (range.max_x - range.min_x) as usize + 1;
                let full_rows_after = (range.max_y - y) as usize;
                full_rows_after * row_width + (range.max_x - x) as usize + 1
            }
            _ => 0,
        };
        (remaining, Some(remaining))
    }
}

/// Inclusive tile index range intersecting `extent`, or `None` when the extent
/// does not touch the domain
fn covered_range(pyramid: &dyn TilePyramid, level: u32, extent: &Bounds) -> Option<TileRange> {
    let domain = pyramid.bounds();
    if !extent.is_valid() || !domain.intersects(extent) {
        return None;
    }
    let count = pyramid.tile_count(level);
    let (min_x, max_x) = axis_span(extent.min.x, extent.max.x, domain.min.x, domain.width(), count);
    let (min_y, max_y) = axis_span(extent.min.y, extent.max.y, domain.min.y, domain.height(), count);
    Some(TileRange {
        level,
        min_x,
        max_x,
        min_y,
        max_y,
    })
}

/// First tile whose far edge reaches `lo`, last tile whose near edge reaches `hi`
fn axis_span(lo: f64, hi: f64, origin: f64, span: f64, count: u32) -> (u32, u32) {
    let divisions = f64::from(count);
    let last = divisions - 1.0;
    let first = ((divisions * (lo - origin) / span).ceil() - 1.0).clamp(0.0, last);
    let final_ = (divisions * (hi - origin) / span).floor().clamp(0.0, last);
    (first as u32, final_ as u32)
}
