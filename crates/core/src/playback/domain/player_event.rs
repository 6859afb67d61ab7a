use std::path::PathBuf;

use serde::Serialize;

use crate::shared::error::PlayerError;

/// Named notifications delivered to the host.
///
/// Serializes as `{"event": "<kebab-case name>", ...fields}` so a host can
/// forward events as JSON without another mapping layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum PlayerEvent {
    LoadStart,
    Ready {
        duration: f64,
    },
    Error {
        code: String,
        message: String,
    },
    Progress {
        current_time: f64,
        duration: f64,
    },
    Stalled,
    Resumed,
    Playing,
    Paused,
    PlaybackComplete,
    FullscreenChanged {
        is_fullscreen: bool,
    },
    RecordingStarted {
        output_path: PathBuf,
    },
    RecordingFinalizing {
        frame_count: usize,
    },
    RecordingAborted,
}

impl PlayerEvent {
    pub fn error(err: &PlayerError) -> Self {
        PlayerEvent::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    /// The event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::LoadStart => "load-start",
            PlayerEvent::Ready { .. } => "ready",
            PlayerEvent::Error { .. } => "error",
            PlayerEvent::Progress { .. } => "progress",
            PlayerEvent::Stalled => "stalled",
            PlayerEvent::Resumed => "resumed",
            PlayerEvent::Playing => "playing",
            PlayerEvent::Paused => "paused",
            PlayerEvent::PlaybackComplete => "playback-complete",
            PlayerEvent::FullscreenChanged { .. } => "fullscreen-changed",
            PlayerEvent::RecordingStarted { .. } => "recording-started",
            PlayerEvent::RecordingFinalizing { .. } => "recording-finalizing",
            PlayerEvent::RecordingAborted => "recording-aborted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_progress_serializes_with_tag() {
        let json = serde_json::to_value(PlayerEvent::Progress {
            current_time: 1.5,
            duration: 10.0,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "progress", "current_time": 1.5, "duration": 10.0})
        );
    }

    #[test]
    fn test_error_event_carries_code() {
        let event = PlayerEvent::error(&PlayerError::SourceUnavailable("gone".into()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["code"], "SOURCE_ERROR");
        assert_eq!(json["message"], "source unavailable: gone");
    }

    #[rstest]
    #[case(PlayerEvent::LoadStart)]
    #[case(PlayerEvent::PlaybackComplete)]
    #[case(PlayerEvent::FullscreenChanged { is_fullscreen: true })]
    #[case(PlayerEvent::RecordingFinalizing { frame_count: 3 })]
    fn test_name_matches_serialized_tag(#[case] event: PlayerEvent) {
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
    }
}
