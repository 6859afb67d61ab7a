use std::sync::Arc;

use crate::capture::domain::still_image_encoder::{CapturedFrame, EncodedImage, StillImageEncoder};
use crate::shared::clock::Clock;
use crate::shared::error::PlayerError;
use crate::shared::frame_slot::FrameSlot;

/// Extracts the currently displayed frame from the render surface.
///
/// Capturing only reads the [`FrameSlot`]; it never touches playback state.
/// Clones share the slot, clock and encoder.
#[derive(Clone)]
pub struct FrameCaptureService {
    slot: FrameSlot,
    clock: Arc<dyn Clock>,
    encoder: Arc<dyn StillImageEncoder>,
}

impl FrameCaptureService {
    pub fn new(slot: FrameSlot, clock: Arc<dyn Clock>, encoder: Arc<dyn StillImageEncoder>) -> Self {
        Self {
            slot,
            clock,
            encoder,
        }
    }

    pub fn slot(&self) -> &FrameSlot {
        &self.slot
    }

    /// Copies the last rendered frame, stamped with the time elapsed since
    /// the playback session started.
    pub fn capture_frame(&self) -> Result<CapturedFrame, PlayerError> {
        let (frame, epoch) = self.slot.snapshot().ok_or(PlayerError::NoFrameAvailable)?;
        let presentation_time = self.clock.now().saturating_duration_since(epoch);
        Ok(CapturedFrame {
            frame,
            presentation_time,
        })
    }

    pub fn capture_frame_as_image(&self) -> Result<EncodedImage, PlayerError> {
        let captured = self.capture_frame()?;
        encode(self.encoder.as_ref(), &captured)
    }

    /// Captures now and encodes on a background thread, handing the result
    /// to `completion` there.
    pub fn capture_frame_as_image_with<F>(&self, completion: F)
    where
        F: FnOnce(Result<EncodedImage, PlayerError>) + Send + 'static,
    {
        let captured = match self.capture_frame() {
            Ok(captured) => captured,
            Err(e) => {
                completion(Err(e));
                return;
            }
        };
        let encoder = Arc::clone(&self.encoder);
        std::thread::spawn(move || completion(encode(encoder.as_ref(), &captured)));
    }
}

fn encode(
    encoder: &dyn StillImageEncoder,
    captured: &CapturedFrame,
) -> Result<EncodedImage, PlayerError> {
    if captured.frame.is_black() {
        log::warn!(
            "Captured frame {} is entirely black",
            captured.frame.index()
        );
    }
    encoder
        .encode(&captured.frame)
        .map_err(|e| PlayerError::EncodingFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::still_image_encoder::StillImageFormat;
    use crate::capture::infrastructure::image_crate_encoder::ImageCrateEncoder;
    use crate::shared::clock::ManualClock;
    use crate::shared::frame::Frame;
    use std::time::Duration;

    struct FailingEncoder;

    impl StillImageEncoder for FailingEncoder {
        fn encode(&self, _: &Frame) -> Result<EncodedImage, Box<dyn std::error::Error>> {
            Err("codec unavailable".into())
        }
    }

    fn service(encoder: Arc<dyn StillImageEncoder>) -> (FrameCaptureService, ManualClock) {
        let clock = ManualClock::new();
        let slot = FrameSlot::new(clock.now());
        (
            FrameCaptureService::new(slot, Arc::new(clock.clone()), encoder),
            clock,
        )
    }

    fn frame(index: usize, value: u8) -> Frame {
        Frame::new(vec![value; 4 * 4 * 3], 4, 4, 3, index)
    }

    #[test]
    fn test_nothing_rendered_is_no_frame() {
        let (capture, _) = service(Arc::new(ImageCrateEncoder::png()));
        assert!(matches!(
            capture.capture_frame(),
            Err(PlayerError::NoFrameAvailable)
        ));
        assert!(matches!(
            capture.capture_frame_as_image(),
            Err(PlayerError::NoFrameAvailable)
        ));
    }

    #[test]
    fn test_capture_is_stamped_from_session_epoch() {
        let (capture, clock) = service(Arc::new(ImageCrateEncoder::png()));
        capture.slot().publish(frame(3, 10));
        clock.advance(Duration::from_millis(750));

        let captured = capture.capture_frame().unwrap();
        assert_eq!(captured.frame.index(), 3);
        assert_eq!(captured.presentation_time, Duration::from_millis(750));
    }

    #[test]
    fn test_capture_leaves_slot_intact() {
        let (capture, _) = service(Arc::new(ImageCrateEncoder::png()));
        capture.slot().publish(frame(1, 10));
        capture.capture_frame().unwrap();
        assert_eq!(capture.slot().current_index(), Some(1));
    }

    #[test]
    fn test_capture_as_png() {
        let (capture, _) = service(Arc::new(ImageCrateEncoder::png()));
        capture.slot().publish(frame(0, 90));
        let image = capture.capture_frame_as_image().unwrap();
        assert_eq!(image.format, StillImageFormat::Png);
        assert!(image.data_uri().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_black_frame_still_encodes() {
        let (capture, _) = service(Arc::new(ImageCrateEncoder::png()));
        capture.slot().publish(frame(0, 0));
        assert!(capture.capture_frame_as_image().is_ok());
    }

    #[test]
    fn test_encoder_failure_maps_to_encoding_failed() {
        let (capture, _) = service(Arc::new(FailingEncoder));
        capture.slot().publish(frame(0, 5));
        assert!(matches!(
            capture.capture_frame_as_image(),
            Err(PlayerError::EncodingFailed(_))
        ));
    }

    #[test]
    fn test_completion_runs_with_encoded_image() {
        let (capture, _) = service(Arc::new(ImageCrateEncoder::png()));
        capture.slot().publish(frame(0, 42));
        let (tx, rx) = crossbeam_channel::bounded(1);
        capture.capture_frame_as_image_with(move |result| {
            tx.send(result.map(|img| img.width)).unwrap();
        });
        let width = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(width, 4);
    }

    #[test]
    fn test_completion_gets_no_frame_error_immediately() {
        let (capture, _) = service(Arc::new(ImageCrateEncoder::png()));
        let (tx, rx) = crossbeam_channel::bounded(1);
        capture.capture_frame_as_image_with(move |result| {
            tx.send(result.is_err()).unwrap();
        });
        assert!(rx.try_recv().unwrap());
    }
}
