use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Frames carry wall-clock timestamps, so the encoder counts in milliseconds.
const TIME_BASE: ffmpeg_next::Rational = ffmpeg_next::Rational(1, 1000);

/// Encodes RGB24 frames to MPEG-4 Part 2 via ffmpeg-next.
///
/// The container is picked by FFmpeg from the output extension. Each frame
/// is stamped with the timestamp it was appended with rather than its index,
/// so recordings stay in sync with real playback time even when ticks are
/// skipped.
pub struct FfmpegWriter {
    output_path: Option<PathBuf>,
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    frame_rate: u32,
    last_pts: Option<i64>,
    video_stream_index: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    /// `frame_rate` is the nominal rate advertised in the stream header.
    pub fn new(frame_rate: u32) -> Self {
        Self {
            output_path: None,
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            frame_rate: frame_rate.max(1),
            last_pts: None,
            video_stream_index: 0,
        }
    }

    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        let ost_time_base = octx
            .stream(self.video_stream_index)
            .ok_or("FfmpegWriter: output stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.video_stream_index);
            encoded.rescale_ts(TIME_BASE, ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }

    fn release(&mut self) {
        self.octx = None;
        self.encoder = None;
        self.scaler = None;
        self.last_pts = None;
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new(crate::shared::constants::DEFAULT_RECORDING_FPS)
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.release();

        if metadata.width == 0 || metadata.height == 0 {
            return Err("FfmpegWriter: frame dimensions must be non-zero".into());
        }
        self.width = metadata.width;
        self.height = metadata.height;
        self.output_path = Some(path.to_path_buf());

        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        // Use MPEG4 as a widely compatible encoder
        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(self.width);
        encoder_ctx.set_height(self.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(TIME_BASE);
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(self.frame_rate as i32, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(TIME_BASE);
        self.video_stream_index = ost.index();

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
            ffmpeg_next::format::Pixel::YUV420P,
            self.width,
            self.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.last_pts = None;

        log::debug!(
            "Opened MPEG-4 writer {}x{} -> {}",
            self.width,
            self.height,
            path.display()
        );
        Ok(())
    }

    fn write(
        &mut self,
        frame: &Frame,
        timestamp: Duration,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(scaler)) = (self.encoder.as_mut(), self.scaler.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        if frame.channels() != 3 {
            return Err(format!(
                "FfmpegWriter: expected RGB24, got {} channels",
                frame.channels()
            )
            .into());
        }
        if frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "FfmpegWriter: frame is {}x{}, writer expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        let stride = rgb_frame.stride(0);
        let row_bytes = self.width as usize * 3;
        let data = rgb_frame.data_mut(0);
        let src = frame.data();

        // Copy pixel data, respecting stride
        for row in 0..self.height as usize {
            let src_start = row * row_bytes;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;

        // Sub-millisecond spacing would collide after quantization.
        let mut pts = timestamp.as_millis() as i64;
        if let Some(last) = self.last_pts {
            pts = pts.max(last + 1);
        }
        yuv_frame.set_pts(Some(pts));
        encoder.send_frame(&yuv_frame)?;
        self.last_pts = Some(pts);

        self.drain_packets()
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.encoder.is_none() {
            return Ok(());
        }

        let result = (|| -> Result<(), Box<dyn std::error::Error>> {
            if let Some(encoder) = self.encoder.as_mut() {
                encoder.send_eof()?;
            }
            self.drain_packets()?;
            if let Some(octx) = self.octx.as_mut() {
                octx.write_trailer()?;
            }
            Ok(())
        })();

        self.release();
        if result.is_ok() {
            if let Some(path) = self.output_path.take() {
                log::debug!("Finished writing {}", path.display());
            }
        }
        result
    }

    fn abort(&mut self) {
        self.release();
        if let Some(path) = self.output_path.take() {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    log::warn!("Could not remove partial output {}: {e}", path.display());
                }
            }
        }
    }
}
