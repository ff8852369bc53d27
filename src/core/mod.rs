//! Annotrack Core Engine
//!
//! Core annotation engine module.
//! Handles per-object keyframe timelines, multi-object frame
//! resolution, and frame-source management.

pub mod frames;
pub mod resolver;
pub mod timeline;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

pub use frames::{
    ArchiveFrameSource, DirFrameSource, ExtractionConfig, ExtractionProgress, FrameData,
    FrameImage, FrameSource, FrameSourceRegistry, ImageData, VideoFrameExtractor,
};
pub use resolver::{FrameResolver, ObjectAnnotation, ResolvedFrame};
pub use timeline::{AnnotatedFrame, BoundingBox, Timeline};
