//! Annotrack Core Library
//!
//! Engine for interactive annotation of moving objects across a video
//! frame sequence. A user marks bounding boxes on a sparse set of
//! frames (ground truth); an external tracking engine fills in the
//! frames in between. This library owns the per-object keyframe
//! timelines with cascading invalidation, the multi-object consistency
//! resolver, and the frame-source plumbing the resolver reads from.
//!
//! The tracking computation itself (optical flow or otherwise) is not
//! part of this crate: the resolver reports where tracking must resume
//! ([`core::FrameResolver::start_frame`]) and hands decoded pixels to
//! the tracking engine ([`core::FrameImage::image_data`]), nothing more.

pub mod core;

pub use crate::core::{
    AnnotatedFrame, ArchiveFrameSource, BoundingBox, CoreError, CoreResult, FrameData,
    FrameImage, FrameNumber, FrameResolver, FrameSource, FrameSourceRegistry, ImageData,
    ObjectAnnotation, ObjectId, ResolvedFrame, Timeline,
};
