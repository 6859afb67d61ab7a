use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::shared::frame::Frame;

/// The render surface: holds the most recently rendered frame.
///
/// The engine publishes into it on every render and the capture service
/// clones out of it, so the lock is only ever held for a single frame copy.
/// The epoch marks when the current playback session started and is used
/// to stamp captured frames.
#[derive(Clone, Debug)]
pub struct FrameSlot {
    inner: Arc<Mutex<SlotState>>,
}

#[derive(Debug)]
struct SlotState {
    frame: Option<Frame>,
    epoch: Instant,
}

impl FrameSlot {
    pub fn new(epoch: Instant) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotState { frame: None, epoch })),
        }
    }

    /// Drops the current frame and starts a new session epoch.
    pub fn reset(&self, epoch: Instant) {
        let mut state = self.lock();
        state.frame = None;
        state.epoch = epoch;
    }

    pub fn publish(&self, frame: Frame) {
        self.lock().frame = Some(frame);
    }

    /// Index of the published frame, if any, without copying pixels.
    pub fn current_index(&self) -> Option<usize> {
        self.lock().frame.as_ref().map(Frame::index)
    }

    /// Copies the latest frame together with the session epoch.
    pub fn snapshot(&self) -> Option<(Frame, Instant)> {
        let state = self.lock();
        state.frame.clone().map(|frame| (frame, state.epoch))
    }

    pub fn epoch(&self) -> Instant {
        self.lock().epoch
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn frame(index: usize) -> Frame {
        Frame::new(vec![index as u8; 3], 1, 1, 3, index)
    }

    #[test]
    fn test_empty_slot_has_no_snapshot() {
        let slot = FrameSlot::new(Instant::now());
        assert!(slot.snapshot().is_none());
        assert_eq!(slot.current_index(), None);
    }

    #[test]
    fn test_publish_replaces_frame() {
        let slot = FrameSlot::new(Instant::now());
        slot.publish(frame(1));
        slot.publish(frame(2));
        let (latest, _) = slot.snapshot().unwrap();
        assert_eq!(latest.index(), 2);
    }

    #[test]
    fn test_reset_clears_frame_and_moves_epoch() {
        let start = Instant::now();
        let slot = FrameSlot::new(start);
        slot.publish(frame(1));
        let later = start + Duration::from_secs(1);
        slot.reset(later);
        assert!(slot.snapshot().is_none());
        assert_eq!(slot.epoch(), later);
    }

    #[test]
    fn test_clones_share_state() {
        let slot = FrameSlot::new(Instant::now());
        let reader = slot.clone();
        slot.publish(frame(7));
        assert_eq!(reader.current_index(), Some(7));
    }
}
