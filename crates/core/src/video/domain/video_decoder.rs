use std::time::Duration;

use crate::shared::frame::Frame;
use crate::shared::media_locator::MediaLocator;
use crate::shared::video_metadata::VideoMetadata;

/// Decodes frames from a media source in presentation order.
///
/// Implementations handle I/O details (codec, container format, etc.)
/// while the playback engine works with the abstract `Frame` and
/// `VideoMetadata` types. Every frame carries its media timestamp.
pub trait VideoDecoder: Send {
    /// Opens the source and returns its metadata.
    fn open(&mut self, locator: &MediaLocator) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Decodes the next frame. `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>>;

    /// Repositions so that subsequent frames start at or before `position`.
    fn seek(&mut self, position: Duration) -> Result<(), Box<dyn std::error::Error>>;

    /// Releases any resources held by the decoder.
    fn close(&mut self);
}
