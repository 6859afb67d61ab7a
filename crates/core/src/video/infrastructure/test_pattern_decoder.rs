use std::time::Duration;

use crate::shared::frame::Frame;
use crate::shared::media_locator::MediaLocator;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_decoder::VideoDecoder;

const DEFAULT_DURATION_SECS: f64 = 10.0;
const DEFAULT_FPS: f64 = 30.0;
const DEFAULT_WIDTH: u32 = 320;
const DEFAULT_HEIGHT: u32 = 240;

/// Generates deterministic RGB frames for `testsrc://` locators.
///
/// Query parameters: `duration` (seconds, `0` for an open-ended stream),
/// `fps`, `width`, `height`, and `fail_at` (seconds) to simulate a decode
/// error at a given position.
pub struct TestPatternDecoder {
    metadata: Option<VideoMetadata>,
    total_frames: Option<usize>,
    fail_at: Option<Duration>,
    next_index: usize,
}

impl TestPatternDecoder {
    pub fn new() -> Self {
        Self {
            metadata: None,
            total_frames: None,
            fail_at: None,
            next_index: 0,
        }
    }

    fn render(&self, meta: &VideoMetadata, index: usize) -> Frame {
        let (w, h) = (meta.width as usize, meta.height as usize);
        let shift = (index % 256) as u8;
        let mut data = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                // Eight vertical color bars scrolling one step per frame.
                let bar = ((x * 8 / w.max(1)) as u8).wrapping_add(shift) % 8;
                let luma = (y * 255 / h.max(1)) as u8;
                data.push(if bar & 1 != 0 { 255 } else { luma / 4 });
                data.push(if bar & 2 != 0 { 255 } else { luma / 4 });
                data.push(if bar & 4 != 0 { 255 } else { luma / 4 });
            }
        }
        let timestamp =
            Duration::try_from_secs_f64(index as f64 / meta.fps).unwrap_or(Duration::MAX);
        Frame::new(data, meta.width, meta.height, 3, index).with_timestamp(timestamp)
    }
}

impl Default for TestPatternDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn param<T: std::str::FromStr>(
    locator: &MediaLocator,
    key: &str,
    default: T,
) -> Result<T, Box<dyn std::error::Error>> {
    match locator.query_param(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("invalid test pattern parameter {key}={raw}").into()),
    }
}

impl VideoDecoder for TestPatternDecoder {
    fn open(&mut self, locator: &MediaLocator) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let MediaLocator::TestPattern { name, .. } = locator else {
            return Err(format!("not a test pattern: {locator}").into());
        };

        let duration_secs: f64 = param(locator, "duration", DEFAULT_DURATION_SECS)?;
        let fps: f64 = param(locator, "fps", DEFAULT_FPS)?;
        let width: u32 = param(locator, "width", DEFAULT_WIDTH)?;
        let height: u32 = param(locator, "height", DEFAULT_HEIGHT)?;
        let fail_at: Option<f64> = match locator.query_param("fail_at") {
            None => None,
            Some(_) => Some(param(locator, "fail_at", 0.0)?),
        };

        if !(fps.is_finite() && fps > 0.0) || width == 0 || height == 0 {
            return Err(format!("unsupported test pattern geometry: {locator}").into());
        }
        if !(duration_secs.is_finite() && duration_secs >= 0.0) {
            return Err(format!("invalid test pattern duration: {duration_secs}").into());
        }

        let duration = match duration_secs {
            secs if secs > 0.0 => Some(
                Duration::try_from_secs_f64(secs)
                    .map_err(|_| format!("test pattern duration out of range: {secs}"))?,
            ),
            _ => None,
        };
        let fail_at = fail_at
            .map(|secs| match secs {
                secs if secs.is_finite() => Duration::try_from_secs_f64(secs.max(0.0))
                    .map_err(|_| format!("test pattern fail_at out of range: {secs}")),
                secs => Err(format!("invalid test pattern fail_at: {secs}")),
            })
            .transpose()?;
        let metadata = VideoMetadata {
            width,
            height,
            fps,
            duration,
            codec: format!("testsrc/{name}"),
            source: Some(locator.to_string()),
        };

        self.total_frames = duration.map(|_| (duration_secs * fps).ceil() as usize);
        self.fail_at = fail_at;
        self.next_index = 0;
        self.metadata = Some(metadata.clone());
        Ok(metadata)
    }

    fn next_frame(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let Some(meta) = self.metadata.as_ref() else {
            return Some(Err("TestPatternDecoder: not opened".into()));
        };
        if self.total_frames.is_some_and(|total| self.next_index >= total) {
            return None;
        }

        let frame = self.render(meta, self.next_index);
        if let Some(fail_at) = self.fail_at {
            if frame.timestamp() >= fail_at {
                return Some(Err(format!(
                    "simulated decode failure at {:.3}s",
                    frame.timestamp().as_secs_f64()
                )
                .into()));
            }
        }
        self.next_index += 1;
        Some(Ok(frame))
    }

    fn seek(&mut self, position: Duration) -> Result<(), Box<dyn std::error::Error>> {
        let meta = self
            .metadata
            .as_ref()
            .ok_or("TestPatternDecoder: not opened")?;
        let mut index = (position.as_secs_f64() * meta.fps).floor() as usize;
        if let Some(total) = self.total_frames {
            index = index.min(total);
        }
        self.next_index = index;
        Ok(())
    }

    fn close(&mut self) {
        self.metadata = None;
        self.total_frames = None;
        self.fail_at = None;
        self.next_index = 0;
    }
}
