//! Frame Source Module
//!
//! Provides access to the decoded frame sequence the resolver reads
//! from: the `FrameSource` capability trait, the process-wide registry
//! holding the active source, and two concrete providers (frames
//! pre-extracted into a zip archive; frames burst out of a video
//! container with FFmpeg).

use async_trait::async_trait;

use crate::core::{CoreError, CoreResult, FrameNumber};

pub mod archive;
pub mod image;
pub mod registry;
pub mod video;

pub use archive::ArchiveFrameSource;
pub use image::{FrameImage, ImageData};
pub use registry::FrameSourceRegistry;
pub use video::{DirFrameSource, ExtractionConfig, ExtractionProgress, VideoFrameExtractor};

/// Default file extension for stored frame images
pub const DEFAULT_IMAGE_EXT: &str = ".jpg";

// =============================================================================
// Frame Source Contract
// =============================================================================

/// Encoded frame payload fetched from a [`FrameSource`]
#[derive(Clone, Debug)]
pub struct FrameData {
    /// Frame index this payload belongs to
    pub frame_number: FrameNumber,
    /// Encoded image bytes (JPEG/PNG)
    pub bytes: Vec<u8>,
}

/// An addressable, finite, randomly-accessible sequence of frame images
///
/// Implemented by the archive and video-extraction providers; both obey
/// identical semantics: `total_frames` is stable for the lifetime of
/// the source, and `get_frame` fails with
/// [`CoreError::FrameOutOfRange`] outside `[0, total_frames)`.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Number of frames in the sequence
    fn total_frames(&self) -> u32;

    /// Fetches the encoded image for a single frame
    async fn get_frame(&self, frame_number: FrameNumber) -> CoreResult<FrameData>;
}

/// Source active before any sequence is loaded: zero frames, every
/// fetch out of range
pub(crate) struct EmptyFrameSource;

#[async_trait]
impl FrameSource for EmptyFrameSource {
    fn total_frames(&self) -> u32 {
        0
    }

    async fn get_frame(&self, frame_number: FrameNumber) -> CoreResult<FrameData> {
        Err(CoreError::FrameOutOfRange {
            frame: frame_number,
            total: 0,
        })
    }
}
