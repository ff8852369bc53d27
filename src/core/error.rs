//! Annotrack Error Definitions
//!
//! Defines error types used throughout the engine.

use thiserror::Error;

use super::FrameNumber;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Annotation State Errors
    // =========================================================================
    #[error("Corrupted annotation state: no frame at or before {0} has data for every tracked object")]
    CorruptedAnnotations(FrameNumber),

    #[error("Unknown tracked object: {0}")]
    ObjectNotFound(String),

    // =========================================================================
    // Frame Source Errors
    // =========================================================================
    #[error("Frame {frame} out of range: source has {total} frames")]
    FrameOutOfRange { frame: FrameNumber, total: u32 },

    #[error("Frame source replaced while a fetch was in flight")]
    SourceReplaced,

    #[error("Frame archive error: {0}")]
    Archive(String),

    #[error("Frame decode failed: {0}")]
    FrameDecode(String),

    // =========================================================================
    // Extraction Errors
    // =========================================================================
    #[error("FFmpeg not found. Install FFmpeg or set ANNOTRACK_FFMPEG to the binary path.")]
    FFmpegNotFound,

    #[error("FFmpeg execution failed: {0}")]
    FFmpegFailed(String),

    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;
