use std::path::Path;
use std::time::Duration;

use crate::shared::frame::Frame;
use crate::shared::media_locator::MediaLocator;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_decoder::VideoDecoder;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Converts each decoded frame to RGB24, stamps it with its presentation
/// time and wraps it in a [`Frame`]. Remote URLs are opened by FFmpeg's own
/// protocol handlers.
pub struct FfmpegDecoder {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    decoder: Option<ffmpeg_next::decoder::Video>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    video_stream_index: usize,
    time_base: ffmpeg_next::Rational,
    start_ts: i64,
    frame_interval: Duration,
    width: u32,
    height: u32,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

// Safety: FfmpegDecoder is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegDecoder {}

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            decoder: None,
            scaler: None,
            video_stream_index: 0,
            time_base: ffmpeg_next::Rational(1, 1),
            start_ts: 0,
            frame_interval: Duration::ZERO,
            width: 0,
            height: 0,
            frame_index: 0,
            flushing: false,
            done: false,
        }
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn open(&mut self, locator: &MediaLocator) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.close();

        let ictx = match locator {
            MediaLocator::File(path) => ffmpeg_next::format::input(path)?,
            MediaLocator::Url(url) => ffmpeg_next::format::input(&Path::new(url.as_str()))?,
            MediaLocator::TestPattern { .. } => {
                return Err("test patterns are not decoded by FFmpeg".into())
            }
        };

        let (video_stream_index, time_base, start_ts, fps, stream_duration, parameters) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or("No video stream found")?;
            let rate = stream.rate();
            let fps = if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            };
            (
                stream.index(),
                stream.time_base(),
                stream.start_time().max(0),
                fps,
                stream.duration(),
                stream.parameters(),
            )
        };

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(parameters)?;
        let decoder = codec_ctx.decoder().video()?;
        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        // Container duration is in AV_TIME_BASE (microseconds).
        let duration = if ictx.duration() > 0 {
            Some(Duration::from_micros(ictx.duration() as u64))
        } else if stream_duration > 0 {
            Some(ts_to_duration(stream_duration, time_base))
        } else {
            None
        };

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            duration,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source: Some(locator.to_string()),
        };

        self.video_stream_index = video_stream_index;
        self.time_base = time_base;
        self.start_ts = start_ts;
        self.frame_interval = metadata.frame_interval();
        self.width = width;
        self.height = height;
        self.frame_index = 0;
        self.flushing = false;
        self.done = false;
        self.input_ctx = Some(ictx);
        self.decoder = Some(decoder);
        self.scaler = Some(scaler);

        Ok(metadata)
    }

    fn next_frame(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let (Some(ictx), Some(decoder), Some(scaler)) = (
            self.input_ctx.as_mut(),
            self.decoder.as_mut(),
            self.scaler.as_mut(),
        ) else {
            return Some(Err("FfmpegDecoder: not opened".into()));
        };

        if self.done {
            return None;
        }

        loop {
            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            if decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
                if let Err(e) = scaler.run(&decoded, &mut rgb_frame) {
                    return Some(Err(e.into()));
                }

                let timestamp = match decoded.timestamp() {
                    Some(ts) => ts_to_duration(ts - self.start_ts, self.time_base),
                    None => self.frame_interval.saturating_mul(
                        u32::try_from(self.frame_index).unwrap_or(u32::MAX),
                    ),
                };
                let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
                let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index)
                    .with_timestamp(timestamp);
                self.frame_index += 1;
                return Some(Ok(frame));
            }

            if self.flushing {
                self.done = true;
                return None;
            }

            match ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.video_stream_index {
                        continue;
                    }
                    if decoder.send_packet(&packet).is_err() {
                        continue;
                    }
                }
                None => {
                    let _ = decoder.send_eof();
                    self.flushing = true;
                }
            }
        }
    }

    fn seek(&mut self, position: Duration) -> Result<(), Box<dyn std::error::Error>> {
        let ictx = self.input_ctx.as_mut().ok_or("FfmpegDecoder: not opened")?;
        let ts = position.as_micros() as i64;
        ictx.seek(ts, ..ts)?;
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.flush();
        }
        let interval = self.frame_interval.as_secs_f64();
        self.frame_index = if interval > 0.0 {
            (position.as_secs_f64() / interval) as usize
        } else {
            0
        };
        self.flushing = false;
        self.done = false;
        Ok(())
    }

    fn close(&mut self) {
        self.scaler = None;
        self.decoder = None;
        self.input_ctx = None;
    }
}

fn ts_to_duration(ts: i64, time_base: ffmpeg_next::Rational) -> Duration {
    if ts <= 0 || time_base.denominator() == 0 {
        return Duration::ZERO;
    }
    let secs = ts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
/// This function strips that padding to produce a tightly-packed pixel buffer.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::video_writer::VideoWriter;
    use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;
    use std::path::PathBuf;

    fn create_test_video(dir: &Path, frames: usize) -> PathBuf {
        let path = dir.join("source.mp4");
        let meta = VideoMetadata {
            width: 160,
            height: 120,
            fps: 30.0,
            duration: None,
            codec: String::new(),
            source: None,
        };
        let mut writer = FfmpegWriter::new(30);
        writer.open(&path, &meta).unwrap();
        for i in 0..frames {
            let frame = Frame::new(vec![128u8; 160 * 120 * 3], 160, 120, 3, i);
            writer
                .write(&frame, Duration::from_millis(i as u64 * 33))
                .unwrap();
        }
        writer.close().unwrap();
        path
    }

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_video(dir.path(), 10);

        let mut decoder = FfmpegDecoder::new();
        let meta = decoder.open(&MediaLocator::File(path)).unwrap();
        assert_eq!(meta.width, 160);
        assert_eq!(meta.height, 120);
        assert!(meta.duration.is_some());
    }

    #[test]
    fn test_open_nonexistent_returns_error() {
        let mut decoder = FfmpegDecoder::new();
        let result = decoder.open(&MediaLocator::File(PathBuf::from("/nonexistent.mp4")));
        assert!(result.is_err());
    }

    #[test]
    fn test_open_test_pattern_is_rejected() {
        let mut decoder = FfmpegDecoder::new();
        let locator = MediaLocator::TestPattern {
            name: "bars".into(),
            query: String::new(),
        };
        assert!(decoder.open(&locator).is_err());
    }

    #[test]
    fn test_frames_are_timestamped_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_video(dir.path(), 5);

        let mut decoder = FfmpegDecoder::new();
        decoder.open(&MediaLocator::File(path)).unwrap();

        let mut frames = Vec::new();
        while let Some(frame) = decoder.next_frame() {
            frames.push(frame.unwrap());
        }
        assert_eq!(frames.len(), 5);
        assert!(frames.iter().all(|f| f.channels() == 3));
        for pair in frames.windows(2) {
            assert!(pair[1].timestamp() > pair[0].timestamp());
        }
    }

    #[test]
    fn test_seek_to_start_replays_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_video(dir.path(), 5);

        let mut decoder = FfmpegDecoder::new();
        decoder.open(&MediaLocator::File(path)).unwrap();
        while decoder.next_frame().is_some() {}

        decoder.seek(Duration::ZERO).unwrap();
        let first = decoder.next_frame().unwrap().unwrap();
        assert_eq!(first.timestamp(), Duration::ZERO);
    }

    #[test]
    fn test_next_frame_without_open_returns_error() {
        let mut decoder = FfmpegDecoder::new();
        assert!(matches!(decoder.next_frame(), Some(Err(_))));
    }

    #[test]
    fn test_close_idempotent() {
        let mut decoder = FfmpegDecoder::new();
        decoder.close();
        decoder.close();
    }

    #[test]
    fn test_ts_to_duration() {
        let base = ffmpeg_next::Rational::new(1, 90_000);
        assert_eq!(ts_to_duration(45_000, base), Duration::from_millis(500));
        assert_eq!(ts_to_duration(-1, base), Duration::ZERO);
        assert_eq!(ts_to_duration(1, ffmpeg_next::Rational::new(1, 0)), Duration::ZERO);
        assert_eq!(
            ts_to_duration(i64::MAX, ffmpeg_next::Rational::new(i32::MAX, 1)),
            Duration::MAX
        );
    }
}
