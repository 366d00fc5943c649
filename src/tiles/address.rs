use crate::core::constants::MAX_LEVEL;
use crate::{MapError, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifies one quad-tree cell at a zoom level.
///
/// Index `(0, 0)` is the bottom-left tile of the pyramid domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileAddress {
    pub level: u32,
    pub x_index: u32,
    pub y_index: u32,
}

impl TileAddress {
    pub fn new(level: u32, x_index: u32, y_index: u32) -> Self {
        Self {
            level,
            x_index,
            y_index,
        }
    }

    /// Canonical mapping key for this tile
    pub fn key(&self) -> TileKey {
        TileKey(*self)
    }

    /// Gets the parent tile at the next lower level
    pub fn parent(&self) -> Option<TileAddress> {
        if self.level == 0 {
            None
        } else {
            Some(TileAddress::new(
                self.level - 1,
                self.x_index / 2,
                self.y_index / 2,
            ))
        }
    }

    /// Gets the four child tiles at the next higher level
    pub fn children(&self) -> Vec<TileAddress> {
        if self.level >= MAX_LEVEL {
            return Vec::new();
        }
        let (x, y, level) = (self.x_index * 2, self.y_index * 2, self.level + 1);
        vec![
            TileAddress::new(level, x, y),
            TileAddress::new(level, x + 1, y),
            TileAddress::new(level, x, y + 1),
            TileAddress::new(level, x + 1, y + 1),
        ]
    }

    /// Checks the indices against the `2^level` grid of a standard pyramid
    pub fn is_valid(&self) -> bool {
        if self.level > MAX_LEVEL {
            return false;
        }
        let max_coord = 1u32 << self.level;
        self.x_index < max_coord && self.y_index < max_coord
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.level, self.x_index, self.y_index)
    }
}

/// A cell within a tile. Bin `(0, 0)` is the tile's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BinAddress {
    pub x: u32,
    pub y: u32,
}

impl BinAddress {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Canonical mapping key for this bin
    pub fn key(&self) -> BinKey {
        BinKey(*self)
    }
}

impl fmt::Display for BinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Number of bins per tile axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinGrid {
    pub x: u32,
    pub y: u32,
}

impl BinGrid {
    /// One bin per tile: bin lookup degenerates to tile identity
    pub const SINGLE: BinGrid = BinGrid { x: 1, y: 1 };

    /// Creates a grid, bumping zero counts up to one
    pub fn new(x: u32, y: u32) -> Self {
        Self {
            x: x.max(1),
            y: y.max(1),
        }
    }

    pub fn square(n: u32) -> Self {
        Self::new(n, n)
    }

    pub fn contains(&self, bin: &BinAddress) -> bool {
        bin.x < self.x && bin.y < self.y
    }
}

impl Default for BinGrid {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Canonical `"level,xIndex,yIndex"` key of a [`TileAddress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey(TileAddress);

impl TileKey {
    pub fn address(&self) -> TileAddress {
        self.0
    }
}

impl From<TileAddress> for TileKey {
    fn from(address: TileAddress) -> Self {
        TileKey(address)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TileKey {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        let [level, x_index, y_index] = parse_fields::<3>(s, "tile key")?;
        Ok(TileKey(TileAddress::new(level, x_index, y_index)))
    }
}

/// Canonical `"x,y"` key of a [`BinAddress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinKey(BinAddress);

impl BinKey {
    pub fn address(&self) -> BinAddress {
        self.0
    }
}

impl From<BinAddress> for BinKey {
    fn from(address: BinAddress) -> Self {
        BinKey(address)
    }
}

impl fmt::Display for BinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for BinKey {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        let [x, y] = parse_fields::<2>(s, "bin key")?;
        Ok(BinKey(BinAddress::new(x, y)))
    }
}

/// Parses exactly `N` comma separated indices. Only the canonical spelling is
/// accepted so that string equality and address equality never disagree.
fn parse_fields<const N: usize>(s: &str, what: &str) -> Result<[u32; N]> {
    let mut fields = [0u32; N];
    let mut parts = s.split(',');
    for field in fields.iter_mut() {
        let part = parts
            .next()
            .ok_or_else(|| MapError::ParseError(format!("{} '{}' has too few fields", what, s)))?;
        let canonical = part == "0" || (!part.starts_with('0') && !part.starts_with('+'));
        *field = match part.parse::<u32>() {
            Ok(value) if canonical => value,
            _ => {
                return Err(MapError::ParseError(format!(
                    "{} '{}' has a non-canonical index '{}'",
                    what, s, part
                )))
            }
        };
    }
    if parts.next().is_some() {
        return Err(MapError::ParseError(format!(
            "{} '{}' has too many fields",
            what, s
        )));
    }
    Ok(fields)
}

macro_rules! string_key_serde {
    ($key:ty) => {
        impl Serialize for $key {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $key {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(de::Error::custom)
            }
        }
    };
}

string_key_serde!(TileKey);
string_key_serde!(BinKey);
