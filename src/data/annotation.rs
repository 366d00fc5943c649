use crate::core::geo::GeoCoord;
use crate::prelude::HashMap;
use crate::tiles::address::{BinKey, TileKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-text content of an annotation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Fields this client does not interpret, kept so a modify echoes them back
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A user-visible point record as stored by the annotation service.
///
/// `x`/`y` are geographic (longitude/latitude). Missing priority, title or
/// comment deserialize as `None` and render as empty text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default)]
    pub data: AnnotationData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Annotation {
    pub fn new(position: GeoCoord, priority: &str, title: &str, comment: &str) -> Self {
        Self {
            x: position.lon,
            y: position.lat,
            priority: Some(priority.to_string()),
            data: AnnotationData {
                title: Some(title.to_string()),
                comment: Some(comment.to_string()),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    pub fn position(&self) -> GeoCoord {
        GeoCoord::new(self.x, self.y)
    }

    /// Copy of this record with only the coordinate replaced
    pub fn moved_to(&self, position: GeoCoord) -> Annotation {
        Annotation {
            x: position.lon,
            y: position.lat,
            ..self.clone()
        }
    }

    pub fn title(&self) -> &str {
        self.data.title.as_deref().unwrap_or_default()
    }

    pub fn comment(&self) -> &str {
        self.data.comment.as_deref().unwrap_or_default()
    }

    pub fn priority(&self) -> &str {
        self.priority.as_deref().unwrap_or_default()
    }
}

/// Annotations of one tile, bucketed by bin
pub type BinData = HashMap<BinKey, Vec<Annotation>>;

/// Everything the synchronizer holds, keyed by tile then bin
pub type TileDataMap = HashMap<TileKey, BinData>;

/// Where a rendered annotation came from: tile, bin and position in the bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationRef {
    pub tile_key: TileKey,
    pub bin_key: BinKey,
    pub index: usize,
}

impl AnnotationRef {
    /// The referenced record in `data`, if it is still there
    pub fn resolve<'a>(&self, data: &'a TileDataMap) -> Option<&'a Annotation> {
        data.get(&self.tile_key)?.get(&self.bin_key)?.get(self.index)
    }
}

/// Total number of annotations across all tiles and bins
pub fn annotation_count(data: &TileDataMap) -> usize {
    data.values()
        .flat_map(|bins| bins.values())
        .map(Vec::len)
        .sum()
}

/// A write request sent to the annotation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Mutation {
    #[serde(rename = "WRITE")]
    Create { annotation: Annotation },
    #[serde(rename = "MODIFY")]
    Modify { old: Annotation, new: Annotation },
}

impl Mutation {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Create { .. } => "create",
            Mutation::Modify { .. } => "modify",
        }
    }
}
