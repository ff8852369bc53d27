//! Frame Source Registry
//!
//! Holds the active [`FrameSource`] for the process and notifies
//! subscribers whenever it is replaced, so dependent state (the
//! resolver's per-object timelines) can reset. Passed by reference to
//! every component that needs the current source; there is no implicit
//! global lookup.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::info;

use super::{EmptyFrameSource, FrameSource};

type ResetObserver = Box<dyn Fn() + Send + Sync>;

struct ActiveSource {
    source: Arc<dyn FrameSource>,
    epoch: u64,
}

// =============================================================================
// Registry
// =============================================================================

/// Holder of the current frame sequence
///
/// Replacement protocol: [`set`](Self::set) atomically swaps the active
/// source, bumps the epoch, and then synchronously invokes every
/// registered reset observer in registration order before returning.
/// The epoch lets async callers detect that a fetch they started
/// belongs to a sequence that is no longer current.
pub struct FrameSourceRegistry {
    active: RwLock<ActiveSource>,
    observers: Mutex<Vec<ResetObserver>>,
}

impl FrameSourceRegistry {
    /// Creates a registry with the built-in empty source active
    pub fn new() -> Self {
        Self {
            active: RwLock::new(ActiveSource {
                source: Arc::new(EmptyFrameSource),
                epoch: 0,
            }),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the active source and notifies all reset observers
    pub fn set(&self, source: Arc<dyn FrameSource>) {
        {
            let mut active = self
                .active
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            active.epoch += 1;
            info!(
                epoch = active.epoch,
                total_frames = source.total_frames(),
                "frame source replaced"
            );
            active.source = source;
        }

        let observers = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for observer in observers.iter() {
            observer();
        }
    }

    /// Registers a callback invoked on every future [`set`](Self::set)
    pub fn subscribe_on_reset(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(observer));
    }

    /// Returns the active source
    pub fn current(&self) -> Arc<dyn FrameSource> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .source
            .clone()
    }

    /// Returns the current replacement epoch (0 until the first `set`)
    pub fn epoch(&self) -> u64 {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .epoch
    }

    /// Returns the active source together with its epoch, read under
    /// one lock so the pair is consistent
    pub fn snapshot(&self) -> (Arc<dyn FrameSource>, u64) {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner);
        (active.source.clone(), active.epoch)
    }
}

impl Default for FrameSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::core::{CoreResult, FrameData, FrameNumber};
    use async_trait::async_trait;

    struct StubSource(u32);

    #[async_trait]
    impl FrameSource for StubSource {
        fn total_frames(&self) -> u32 {
            self.0
        }

        async fn get_frame(&self, frame_number: FrameNumber) -> CoreResult<FrameData> {
            Ok(FrameData {
                frame_number,
                bytes: Vec::new(),
            })
        }
    }

    #[test]
    fn test_starts_empty_at_epoch_zero() {
        let registry = FrameSourceRegistry::new();
        assert_eq!(registry.epoch(), 0);
        assert_eq!(registry.current().total_frames(), 0);
    }

    #[test]
    fn test_set_replaces_source_and_bumps_epoch() {
        let registry = FrameSourceRegistry::new();
        registry.set(Arc::new(StubSource(42)));
        assert_eq!(registry.epoch(), 1);
        assert_eq!(registry.current().total_frames(), 42);

        registry.set(Arc::new(StubSource(7)));
        assert_eq!(registry.epoch(), 2);
        assert_eq!(registry.current().total_frames(), 7);
    }

    #[test]
    fn test_observers_run_in_registration_order() {
        let registry = FrameSourceRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3u32 {
            let order = Arc::clone(&order);
            registry.subscribe_on_reset(move || {
                order.lock().unwrap().push(tag);
            });
        }

        registry.set(Arc::new(StubSource(1)));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_observers_fire_on_every_set() {
        let registry = FrameSourceRegistry::new();
        let count = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&count);
        registry.subscribe_on_reset(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.set(Arc::new(StubSource(1)));
        registry.set(Arc::new(StubSource(2)));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let registry = FrameSourceRegistry::new();
        registry.set(Arc::new(StubSource(5)));

        let (source, epoch) = registry.snapshot();
        assert_eq!(source.total_frames(), 5);
        assert_eq!(epoch, 1);
    }
}
