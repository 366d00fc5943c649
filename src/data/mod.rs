pub mod annotation;

pub use annotation::{
    annotation_count, Annotation, AnnotationData, AnnotationRef, BinData, Mutation, TileDataMap,
};
