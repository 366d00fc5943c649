use serde::{Deserialize, Serialize};

/// How a point feature is drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    /// Marker image path
    pub graphic: Option<String>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Vertical anchor offset in pixels (negative lifts the image above the point)
    pub y_offset: i32,
    pub cursor: Option<String>,
    pub visible: bool,
}

impl MarkerStyle {
    pub fn marker(graphic: &str) -> Self {
        Self {
            graphic: Some(graphic.to_string()),
            width: 26,
            height: 26,
            y_offset: -25,
            cursor: Some("pointer".to_string()),
            visible: true,
        }
    }

    pub fn hidden() -> Self {
        Self {
            graphic: None,
            width: 0,
            height: 0,
            y_offset: 0,
            cursor: None,
            visible: false,
        }
    }
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self::marker("./images/marker-purple.png")
    }
}

/// The four render intents of the annotation overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderIntent {
    Default,
    Hover,
    Select,
    Temporary,
}

/// Marker styles per render intent, built once and handed to the overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyles {
    pub default: MarkerStyle,
    pub hover: MarkerStyle,
    pub select: MarkerStyle,
    pub temporary: MarkerStyle,
}

impl OverlayStyles {
    pub fn for_intent(&self, intent: RenderIntent) -> &MarkerStyle {
        match intent {
            RenderIntent::Default => &self.default,
            RenderIntent::Hover => &self.hover,
            RenderIntent::Select => &self.select,
            RenderIntent::Temporary => &self.temporary,
        }
    }
}

impl Default for OverlayStyles {
    fn default() -> Self {
        Self {
            default: MarkerStyle::marker("./images/marker-purple.png"),
            hover: MarkerStyle::marker("./images/marker-green.png"),
            select: MarkerStyle::marker("./images/marker-blue.png"),
            temporary: MarkerStyle::hidden(),
        }
    }
}
