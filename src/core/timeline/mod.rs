//! Annotation Timeline
//!
//! Sparse per-object keyframe store. Holds one [`AnnotatedFrame`] per
//! annotated frame number, kept in ascending order, and cascades
//! invalidation over tracker-produced entries whenever an earlier
//! frame is edited.

use tracing::debug;

use crate::core::FrameNumber;

mod models;
pub use models::{AnnotatedFrame, BoundingBox};

// =============================================================================
// Timeline
// =============================================================================

/// Ordered, sparse annotation store for a single tracked object
///
/// Invariants maintained across every mutation:
/// - entries are strictly increasing by frame number (no duplicates);
/// - an entry at frame 0 always exists (a synthetic invisible,
///   non-ground-truth anchor if the user never placed one), so every
///   backward consistency scan has a base case.
#[derive(Clone, Debug)]
pub struct Timeline {
    frames: Vec<AnnotatedFrame>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    /// Creates a timeline containing only the synthetic anchor at frame 0
    pub fn new() -> Self {
        Self {
            frames: vec![AnnotatedFrame::invisible_anchor()],
        }
    }

    /// Records an annotation, replacing any existing entry at the same
    /// frame number
    ///
    /// After the entry lands, every contiguous tracker-produced entry
    /// downstream of it is removed (they were computed from data that
    /// just changed), stopping at the first ground-truth entry, which
    /// is preserved along with everything after it.
    pub fn add(&mut self, frame: AnnotatedFrame) {
        let next = match self
            .frames
            .binary_search_by_key(&frame.frame_number, |f| f.frame_number)
        {
            Ok(idx) => {
                self.frames[idx] = frame;
                idx + 1
            }
            Err(idx) => {
                self.frames.insert(idx, frame);
                idx + 1
            }
        };

        self.invalidate_from(next);
        self.ensure_anchor();
    }

    /// Exact-match lookup by frame number
    ///
    /// Returns `None` for any frame without a recorded entry, including
    /// frames lying between two stored entries: interpolation is the
    /// tracking engine's job, never the store's.
    pub fn get(&self, frame_number: FrameNumber) -> Option<&AnnotatedFrame> {
        self.frames
            .binary_search_by_key(&frame_number, |f| f.frame_number)
            .ok()
            .map(|idx| &self.frames[idx])
    }

    /// All entries in ascending frame order
    pub fn frames(&self) -> &[AnnotatedFrame] {
        &self.frames
    }

    /// Number of stored entries (including the anchor)
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if the timeline holds no entries (never, given the anchor)
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Removes the run of stale tracker-produced entries starting at
    /// `start`, stopping at the first ground-truth entry
    fn invalidate_from(&mut self, start: usize) {
        let count = self.frames[start..]
            .iter()
            .take_while(|f| !f.is_ground_truth)
            .count();

        if count > 0 {
            debug!(
                removed = count,
                from_frame = self.frames[start].frame_number,
                "invalidated stale tracked frames"
            );
            self.frames.drain(start..start + count);
        }
    }

    /// Re-asserts the frame-0 anchor after a mutation
    fn ensure_anchor(&mut self) {
        if self.frames.first().map_or(true, |f| f.frame_number > 0) {
            self.frames.insert(0, AnnotatedFrame::invisible_anchor());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
