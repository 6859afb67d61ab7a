use std::path::Path;
use std::time::Duration;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Abstracts video encoding so recording can write output without
/// depending on a specific codec library.
///
/// A writer is the encoder session plus its pixel-buffer sink: frames are
/// appended with an explicit presentation timestamp, which callers keep
/// strictly increasing.
pub trait VideoWriter: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Whether an append right now would be accepted without waiting.
    fn is_ready_for_input(&self) -> bool {
        true
    }

    fn write(&mut self, frame: &Frame, timestamp: Duration)
        -> Result<(), Box<dyn std::error::Error>>;

    /// Signals end of input and finishes the container.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Stops without finishing the container and deletes partial output.
    fn abort(&mut self);
}
