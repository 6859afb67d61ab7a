use crate::shared::media_locator::MediaLocator;
use crate::video::domain::video_decoder::VideoDecoder;

use super::ffmpeg_decoder::FfmpegDecoder;
use super::test_pattern_decoder::TestPatternDecoder;

/// Picks a decoder for the locator: synthetic sources get the pattern
/// generator, everything else goes through FFmpeg.
pub fn create_decoder(locator: &MediaLocator) -> Box<dyn VideoDecoder> {
    if locator.is_test_pattern() {
        log::debug!("Using test pattern decoder for {locator}");
        Box::new(TestPatternDecoder::new())
    } else {
        log::debug!("Using FFmpeg decoder for {locator}");
        Box::new(FfmpegDecoder::new())
    }
}
