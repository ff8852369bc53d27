//! Archive Frame Source
//!
//! Serves a frame sequence from a pre-extracted zip archive. Frame `n`
//! is stored as `{n}{ext}` (e.g. `0.jpg`, `1.jpg`, ...); the total
//! frame count is discovered by probing consecutive names from 0 until
//! the first miss.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;
use zip::ZipArchive;

use super::{FrameData, FrameSource, DEFAULT_IMAGE_EXT};
use crate::core::{CoreError, CoreResult, FrameNumber};

// =============================================================================
// Archive Frame Source
// =============================================================================

/// Frame provider backed by a zip archive of numbered images
#[derive(Debug)]
pub struct ArchiveFrameSource {
    archive: Arc<Mutex<ZipArchive<File>>>,
    image_ext: String,
    total: u32,
}

impl ArchiveFrameSource {
    /// Opens an archive of `.jpg` frames
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_extension(path, DEFAULT_IMAGE_EXT)
    }

    /// Opens an archive whose frames use the given file extension
    pub fn open_with_extension(path: &Path, image_ext: &str) -> CoreResult<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)
            .map_err(|e| CoreError::Archive(format!("{}: {}", path.display(), e)))?;

        let mut total: u32 = 0;
        while archive
            .index_for_name(&format!("{}{}", total, image_ext))
            .is_some()
        {
            total += 1;
        }

        debug!(path = %path.display(), total, "opened frame archive");

        Ok(Self {
            archive: Arc::new(Mutex::new(archive)),
            image_ext: image_ext.to_string(),
            total,
        })
    }
}

#[async_trait]
impl FrameSource for ArchiveFrameSource {
    fn total_frames(&self) -> u32 {
        self.total
    }

    async fn get_frame(&self, frame_number: FrameNumber) -> CoreResult<FrameData> {
        if frame_number >= self.total {
            return Err(CoreError::FrameOutOfRange {
                frame: frame_number,
                total: self.total,
            });
        }

        let archive = Arc::clone(&self.archive);
        let name = format!("{}{}", frame_number, self.image_ext);

        // zip reads are synchronous; hop off the async executor.
        let bytes = tokio::task::spawn_blocking(move || -> CoreResult<Vec<u8>> {
            let mut archive = archive.lock().unwrap_or_else(PoisonError::into_inner);
            let mut entry = archive
                .by_name(&name)
                .map_err(|e| CoreError::Archive(format!("{}: {}", name, e)))?;
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            Ok(bytes)
        })
        .await
        .map_err(|e| CoreError::Archive(format!("archive read task failed: {e}")))??;

        Ok(FrameData {
            frame_number,
            bytes,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
