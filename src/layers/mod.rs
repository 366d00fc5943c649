pub mod annotation;
pub mod overlay;
pub mod style;

pub use annotation::AnnotationLayer;
pub use overlay::{AnnotationOverlay, EditSurface, Feature, FeatureAttributes, FeatureId, FeatureState};
pub use style::{MarkerStyle, OverlayStyles, RenderIntent};
