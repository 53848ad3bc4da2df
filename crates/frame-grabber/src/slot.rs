use crate::Frame;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Latest-frame cell. One writer swaps in whole frames, readers clone the handle.
#[derive(Debug)]
pub(crate) struct FrameSlot {
    latest: RwLock<Arc<Frame>>,
    published: AtomicU64,
}

impl FrameSlot {
    /// Seed the slot with the priming frame.
    pub(crate) fn new(initial: Frame) -> Self {
        Self {
            latest: RwLock::new(Arc::new(initial)),
            published: AtomicU64::new(1),
        }
    }

    pub(crate) fn publish(&self, frame: Frame) {
        let frame = Arc::new(frame);
        *self.latest.write() = frame;
        self.published.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn snapshot(&self) -> Arc<Frame> {
        self.latest.read().clone()
    }

    /// Frames published so far, priming frame included.
    pub(crate) fn published(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelFormat;

    #[test]
    fn snapshot_returns_initial_frame() {
        let slot = FrameSlot::new(Frame::filled(2, 2, PixelFormat::Gray8, 1));
        assert_eq!(slot.snapshot().data, vec![1; 4]);
        assert_eq!(slot.published(), 1);
    }

    #[test]
    fn publish_replaces_and_keeps_old_handles_valid() {
        let slot = FrameSlot::new(Frame::filled(2, 2, PixelFormat::Gray8, 1));
        let before = slot.snapshot();
        slot.publish(Frame::filled(2, 2, PixelFormat::Gray8, 9));
        assert_eq!(before.data, vec![1; 4]);
        assert_eq!(slot.snapshot().data, vec![9; 4]);
        assert_eq!(slot.published(), 2);
    }
}
