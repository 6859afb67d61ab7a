use std::time::Duration;

use crate::shared::frame_slot::FrameSlot;
use crate::shared::media_locator::MediaLocator;
use crate::shared::video_metadata::VideoMetadata;

/// Asynchronous notifications from the decode/render engine.
///
/// The engine queues these as they happen; the controller drains them once
/// per tick via [`MediaEngine::poll_events`].
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// The item is playable. May be reported more than once per load.
    ItemReady(VideoMetadata),
    BufferingStarted,
    BufferingEnded,
    SeekCompleted,
    ReachedEnd,
    /// Unrecoverable decode error.
    Failed(String),
}

/// Abstracts the framework that decodes and renders the media item, so the
/// playback state machine can be driven without a real decoder.
///
/// Rates, positions and durations are in media time. A rate of `0.0`
/// means paused.
pub trait MediaEngine: Send {
    /// Opens `locator` and starts preparing it. Readiness is reported later
    /// through [`EngineEvent::ItemReady`].
    fn load(&mut self, locator: &MediaLocator) -> Result<(), Box<dyn std::error::Error>>;

    /// Releases the current item. Safe to call when nothing is loaded.
    fn unload(&mut self);

    fn set_rate(&mut self, rate: f64);

    fn rate(&self) -> f64;

    /// Requests a seek; completion is reported via
    /// [`EngineEvent::SeekCompleted`].
    fn seek(&mut self, position: Duration);

    fn position(&self) -> Duration;

    /// `None` until known, or for open-ended streams.
    fn duration(&self) -> Option<Duration>;

    /// True while the engine cannot keep up with the playhead.
    fn is_buffering(&self) -> bool;

    /// Advances decoding and publishes the frame for the current position.
    fn render(&mut self, slot: &FrameSlot);

    fn poll_events(&mut self) -> Vec<EngineEvent>;
}
