use std::time::Duration;

use crate::shared::media_locator::MediaLocator;
use crate::shared::video_metadata::VideoMetadata;

use super::player_state::PlayerState;

/// Per-load state owned by the playback controller.
///
/// A fresh session is created by every `load` and dropped on `unload`, so
/// nothing here leaks from one source to the next except what the
/// controller copies over explicitly (rate and loop flag).
#[derive(Clone, Debug)]
pub struct PlaybackSession {
    /// The locator string exactly as the host passed it.
    pub source: String,
    /// `None` when the locator was malformed.
    pub locator: Option<MediaLocator>,
    pub metadata: Option<VideoMetadata>,
    pub playback_rate: f64,
    pub loop_enabled: bool,
    pub state: PlayerState,
    pub ready_emitted: bool,
    pub completion_emitted: bool,
    /// Rate to resume at once an in-flight seek completes.
    pub pending_seek_rate: Option<f64>,
    pub thumbnail: Option<MediaLocator>,
}

impl PlaybackSession {
    pub fn new(source: &str, playback_rate: f64, loop_enabled: bool) -> Self {
        Self {
            source: source.to_string(),
            locator: None,
            metadata: None,
            playback_rate,
            loop_enabled,
            state: PlayerState::Loading,
            ready_emitted: false,
            completion_emitted: false,
            pending_seek_rate: None,
            thumbnail: None,
        }
    }

    /// The duration hint, once the item is ready.
    pub fn duration(&self) -> Option<Duration> {
        self.metadata.as_ref().and_then(|m| m.duration)
    }
}
