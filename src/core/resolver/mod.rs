//! Multi-Object Frame Resolver
//!
//! Owns one [`Timeline`] per tracked object and reconciles them into a
//! single view: the consistency floor (the highest frame at or before
//! a query point where every object has recorded data, i.e. where
//! automatic tracking must resume) and the per-frame rendering payload
//! (decoded image plus each object's box at that exact frame).
//!
//! The resolver never interpolates and never invokes tracking itself;
//! the orchestration layer calls [`FrameResolver::start_frame`], drives
//! the external tracking engine forward, records each prediction with
//! [`FrameResolver::annotate`], and only then asks for the composite
//! frame.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, warn};

use crate::core::frames::{FrameImage, FrameSourceRegistry};
use crate::core::timeline::{AnnotatedFrame, Timeline};
use crate::core::{CoreError, CoreResult, FrameNumber, ObjectId};

// =============================================================================
// Result Types
// =============================================================================

/// One object's annotation at a resolved frame
#[derive(Clone, Debug)]
pub struct ObjectAnnotation {
    /// Identity of the tracked object
    pub object_id: ObjectId,
    /// The object's recorded entry at the resolved frame
    pub frame: AnnotatedFrame,
}

/// Composite payload for a single frame
#[derive(Debug)]
pub struct ResolvedFrame {
    /// The frame this payload describes
    pub frame_number: FrameNumber,
    /// Consistency floor at the time of resolution: where the external
    /// tracking engine must resume to reach `frame_number`
    pub resume_frame: FrameNumber,
    /// Decoded frame image
    pub image: FrameImage,
    /// Annotations for every object with exact data at this frame, in
    /// tracking order; objects without an entry are simply absent
    pub objects: Vec<ObjectAnnotation>,
}

// =============================================================================
// Frame Resolver
// =============================================================================

/// Per-object timeline owner and cross-object consistency resolver
///
/// Timelines live in insertion (tracking) order, which is also the
/// output order of [`frame_with_objects`](Self::frame_with_objects).
/// Replacing the source in the registry resets the resolver: all
/// timelines are discarded and lazily recreated on the next
/// [`annotate`](Self::annotate).
pub struct FrameResolver {
    registry: Arc<FrameSourceRegistry>,
    timelines: Mutex<Vec<(ObjectId, Timeline)>>,
}

impl FrameResolver {
    /// Creates a resolver wired to reset whenever `registry` is replaced
    pub fn new(registry: Arc<FrameSourceRegistry>) -> Arc<Self> {
        let resolver = Arc::new(Self {
            registry: Arc::clone(&registry),
            timelines: Mutex::new(Vec::new()),
        });

        let weak: Weak<FrameResolver> = Arc::downgrade(&resolver);
        registry.subscribe_on_reset(move || {
            if let Some(resolver) = weak.upgrade() {
                resolver.reset();
            }
        });

        resolver
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ObjectId, Timeline)>> {
        self.timelines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Records an annotation for an object, creating its timeline on
    /// first use
    pub fn annotate(&self, object_id: &str, frame: AnnotatedFrame) {
        let mut timelines = self.lock();
        match timelines.iter_mut().find(|(id, _)| id.as_str() == object_id) {
            Some((_, timeline)) => timeline.add(frame),
            None => {
                let mut timeline = Timeline::new();
                timeline.add(frame);
                timelines.push((object_id.to_string(), timeline));
            }
        }
    }

    /// Exact-match lookup of one object's entry at a frame
    pub fn get(&self, object_id: &str, frame_number: FrameNumber) -> Option<AnnotatedFrame> {
        self.lock()
            .iter()
            .find(|(id, _)| id == object_id)
            .and_then(|(_, timeline)| timeline.get(frame_number).copied())
    }

    /// IDs of all tracked objects, in tracking order
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    /// Removes a tracked object and its entire timeline
    ///
    /// Other objects' timelines are untouched.
    pub fn remove_object(&self, object_id: &str) -> CoreResult<()> {
        let mut timelines = self.lock();
        let before = timelines.len();
        timelines.retain(|(id, _)| id != object_id);
        if timelines.len() == before {
            return Err(CoreError::ObjectNotFound(object_id.to_string()));
        }
        Ok(())
    }

    /// Discards all timelines
    pub fn reset(&self) {
        let mut timelines = self.lock();
        if !timelines.is_empty() {
            debug!(objects = timelines.len(), "resolver reset, timelines discarded");
        }
        timelines.clear();
    }

    /// Computes the consistency floor for a frame
    ///
    /// Scans backward from `frame_number` (inclusive) and returns the
    /// first frame at which every tracked object has an exact entry.
    /// The frame-0 anchor in every timeline guarantees termination; if
    /// the scan still runs out, the annotation state is corrupted and
    /// the error is fatal for the current sequence.
    pub fn start_frame(&self, frame_number: FrameNumber) -> CoreResult<FrameNumber> {
        Self::start_frame_in(&self.lock(), frame_number)
    }

    fn start_frame_in(
        timelines: &[(ObjectId, Timeline)],
        frame_number: FrameNumber,
    ) -> CoreResult<FrameNumber> {
        let mut candidate = frame_number;
        loop {
            if timelines
                .iter()
                .all(|(_, timeline)| timeline.get(candidate).is_some())
            {
                return Ok(candidate);
            }
            if candidate == 0 {
                return Err(CoreError::CorruptedAnnotations(frame_number));
            }
            candidate -= 1;
        }
    }

    /// Assembles the composite payload for a frame
    ///
    /// Fetches and decodes the frame image from the current source and
    /// joins it with every object's exact entry at `frame_number`.
    /// Fetch failures propagate as-is; no retry, no placeholder. If the
    /// registry is replaced while the fetch is in flight, the stale
    /// result is discarded and [`CoreError::SourceReplaced`] returned.
    pub async fn frame_with_objects(&self, frame_number: FrameNumber) -> CoreResult<ResolvedFrame> {
        let resume_frame = self.start_frame(frame_number)?;

        let (source, epoch) = self.registry.snapshot();
        let data = source.get_frame(frame_number).await?;
        let image = tokio::task::spawn_blocking(move || FrameImage::decode(&data))
            .await
            .map_err(|e| CoreError::FrameDecode(format!("decode task failed: {e}")))??;

        if self.registry.epoch() != epoch {
            warn!(frame_number, "discarding frame fetched from a replaced source");
            return Err(CoreError::SourceReplaced);
        }

        let objects = self
            .lock()
            .iter()
            .filter_map(|(id, timeline)| {
                timeline.get(frame_number).map(|frame| ObjectAnnotation {
                    object_id: id.clone(),
                    frame: *frame,
                })
            })
            .collect();

        Ok(ResolvedFrame {
            frame_number,
            resume_frame,
            image,
            objects,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::core::frames::{FrameData, FrameSource};
    use crate::core::timeline::BoundingBox;

    fn bbox() -> BoundingBox {
        BoundingBox::new(2.0, 3.0, 20.0, 30.0)
    }

    /// Encodes a solid-color image as PNG bytes
    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 128, 255, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    /// In-memory source serving the same PNG for every frame
    struct PngSource {
        total: u32,
        bytes: Vec<u8>,
    }

    impl PngSource {
        fn new(total: u32) -> Self {
            Self {
                total,
                bytes: png_bytes(4, 4),
            }
        }
    }

    #[async_trait]
    impl FrameSource for PngSource {
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
            Ok(FrameData {
                frame_number,
                bytes: self.bytes.clone(),
            })
        }
    }

    fn resolver_with_source(total: u32) -> (Arc<FrameSourceRegistry>, Arc<FrameResolver>) {
        let registry = Arc::new(FrameSourceRegistry::new());
        let resolver = FrameResolver::new(Arc::clone(&registry));
        registry.set(Arc::new(PngSource::new(total)));
        (registry, resolver)
    }

    fn annotate_at(resolver: &FrameResolver, object_id: &str, frames: &[FrameNumber]) {
        for &n in frames {
            resolver.annotate(object_id, AnnotatedFrame::ground_truth(n, bbox()));
        }
    }

    // ========================================================================
    // Consistency Floor
    // ========================================================================

    #[test]
    fn test_start_frame_two_objects() {
        let (_registry, resolver) = resolver_with_source(10);
        annotate_at(&resolver, "a", &[1, 2, 5]);
        annotate_at(&resolver, "b", &[1, 3, 5]);

        // Both timelines carry the frame-0 anchor in addition to the
        // annotated frames.
        assert_eq!(resolver.start_frame(5).unwrap(), 5);
        assert_eq!(resolver.start_frame(4).unwrap(), 1);
        assert_eq!(resolver.start_frame(2).unwrap(), 1);
        assert_eq!(resolver.start_frame(0).unwrap(), 0);
    }

    #[test]
    fn test_start_frame_single_object() {
        let (_registry, resolver) = resolver_with_source(10);
        resolver.annotate("a", AnnotatedFrame::ground_truth(5, bbox()));

        assert_eq!(resolver.start_frame(5).unwrap(), 5);
        assert_eq!(resolver.start_frame(4).unwrap(), 0);
    }

    #[test]
    fn test_start_frame_without_objects_is_query_frame() {
        let (_registry, resolver) = resolver_with_source(10);
        assert_eq!(resolver.start_frame(7).unwrap(), 7);
    }

    // ========================================================================
    // Annotation Ownership
    // ========================================================================

    #[test]
    fn test_annotate_creates_timeline_lazily() {
        let (_registry, resolver) = resolver_with_source(10);
        assert!(resolver.object_ids().is_empty());

        resolver.annotate("car", AnnotatedFrame::ground_truth(5, bbox()));
        assert_eq!(resolver.object_ids(), vec!["car".to_string()]);

        // Anchor came with the fresh timeline.
        assert!(resolver.get("car", 0).is_some());
        assert!(resolver.get("car", 5).is_some());
        assert!(resolver.get("car", 3).is_none());
    }

    #[test]
    fn test_object_order_is_insertion_order() {
        let (_registry, resolver) = resolver_with_source(10);
        annotate_at(&resolver, "b", &[1]);
        annotate_at(&resolver, "a", &[1]);
        annotate_at(&resolver, "c", &[1]);

        assert_eq!(resolver.object_ids(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_remove_object_leaves_others() {
        let (_registry, resolver) = resolver_with_source(10);
        annotate_at(&resolver, "a", &[1]);
        annotate_at(&resolver, "b", &[2]);

        resolver.remove_object("a").unwrap();
        assert_eq!(resolver.object_ids(), vec!["b"]);
        assert!(resolver.get("b", 2).is_some());

        assert!(matches!(
            resolver.remove_object("a"),
            Err(CoreError::ObjectNotFound(_))
        ));
    }

    // ========================================================================
    // Reset Wiring
    // ========================================================================

    #[test]
    fn test_source_replacement_clears_timelines() {
        let (registry, resolver) = resolver_with_source(10);
        annotate_at(&resolver, "a", &[0, 1, 2]);
        assert!(resolver.get("a", 0).is_some());

        registry.set(Arc::new(PngSource::new(4)));

        assert!(resolver.object_ids().is_empty());
        assert!(resolver.get("a", 0).is_none());

        // Lazily recreated on the next annotate, anchor included.
        resolver.annotate("a", AnnotatedFrame::ground_truth(2, bbox()));
        assert!(resolver.get("a", 0).is_some());
    }

    // ========================================================================
    // Frame Assembly
    // ========================================================================

    #[tokio::test]
    async fn test_frame_with_objects_joins_exact_entries() {
        let (_registry, resolver) = resolver_with_source(10);
        annotate_at(&resolver, "a", &[1, 2, 5]);
        annotate_at(&resolver, "b", &[1, 3]);

        let resolved = resolver.frame_with_objects(5).await.unwrap();
        assert_eq!(resolved.frame_number, 5);
        assert_eq!(resolved.resume_frame, 1);
        assert_eq!(resolved.image.width(), 4);

        // Only "a" has exact data at frame 5; "b" is excluded, not
        // interpolated.
        assert_eq!(resolved.objects.len(), 1);
        assert_eq!(resolved.objects[0].object_id, "a");
        assert_eq!(resolved.objects[0].frame.frame_number, 5);
    }

    #[tokio::test]
    async fn test_frame_fetch_failure_propagates() {
        let (_registry, resolver) = resolver_with_source(3);
        let err = resolver.frame_with_objects(9).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::FrameOutOfRange { frame: 9, total: 3 }
        ));
    }

    #[tokio::test]
    async fn test_fetch_before_any_source_is_out_of_range() {
        let registry = Arc::new(FrameSourceRegistry::new());
        let resolver = FrameResolver::new(registry);
        let err = resolver.frame_with_objects(0).await.unwrap_err();
        assert!(matches!(err, CoreError::FrameOutOfRange { total: 0, .. }));
    }

    /// Source that replaces itself in the registry mid-fetch
    struct SwappingSource {
        registry: StdMutex<Option<Arc<FrameSourceRegistry>>>,
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl FrameSource for SwappingSource {
        fn total_frames(&self) -> u32 {
            10
        }

        async fn get_frame(&self, frame_number: FrameNumber) -> CoreResult<FrameData> {
            if let Some(registry) = self.registry.lock().unwrap().take() {
                registry.set(Arc::new(PngSource::new(4)));
            }
            Ok(FrameData {
                frame_number,
                bytes: self.bytes.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_stale_fetch_discarded_after_replacement() {
        let registry = Arc::new(FrameSourceRegistry::new());
        let resolver = FrameResolver::new(Arc::clone(&registry));
        registry.set(Arc::new(SwappingSource {
            registry: StdMutex::new(Some(Arc::clone(&registry))),
            bytes: png_bytes(2, 2),
        }));

        let err = resolver.frame_with_objects(0).await.unwrap_err();
        assert!(matches!(err, CoreError::SourceReplaced));
    }
}
