use std::sync::Arc;

use crate::capture::frame_capture_service::FrameCaptureService;
use crate::capture::infrastructure::image_crate_encoder::ImageCrateEncoder;
use crate::playback::domain::event_sink::EventSink;
use crate::playback::playback_controller::PlaybackController;
use crate::recording::recording_engine::{RecordingEngine, WriterFactory};
use crate::shared::clock::{Clock, SystemClock};
use crate::shared::config::PlayerConfig;
use crate::shared::frame_slot::FrameSlot;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use crate::video::infrastructure::queued_video_writer::QueuedVideoWriter;

use super::decoding_engine::DecodingEngine;

/// Builds a player backed by the FFmpeg decoding engine, the `image` crate
/// still encoder and a queued FFmpeg writer for recordings.
pub fn create_player(config: PlayerConfig, events: Arc<dyn EventSink>) -> PlaybackController {
    create_player_with_clock(config, Arc::new(SystemClock), events)
}

/// Same as [`create_player`] with an injected clock.
pub fn create_player_with_clock(
    config: PlayerConfig,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
) -> PlaybackController {
    let engine = DecodingEngine::new(
        Arc::clone(&clock),
        config.stall_threshold(),
        config.decode_budget,
    );

    let encoder = ImageCrateEncoder::new(config.capture.image_format, config.capture.jpeg_quality);
    let slot = FrameSlot::new(clock.now());
    let capture = FrameCaptureService::new(slot, Arc::clone(&clock), Arc::new(encoder));

    let frame_rate = config.recording.frame_rate;
    let capacity = config.recording.writer_queue_capacity;
    let writer_factory: WriterFactory = Box::new(move || -> Box<dyn VideoWriter> {
        Box::new(QueuedVideoWriter::new(
            Box::new(FfmpegWriter::new(frame_rate)),
            capacity,
        ))
    });
    let recorder = RecordingEngine::new(
        writer_factory,
        capture.clone(),
        Arc::clone(&clock),
        Arc::clone(&events),
    );

    log::info!(
        "Player ready (tick {:?}, stall threshold {:?}, recording at {} fps)",
        config.tick_interval(),
        config.stall_threshold(),
        frame_rate
    );
    PlaybackController::new(Box::new(engine), capture, recorder, clock, events, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::domain::event_sink::MemoryEventSink;
    use crate::playback::domain::player_event::PlayerEvent;
    use crate::playback::domain::player_state::PlayerState;
    use crate::recording::domain::recording_state::RecordingState;
    use crate::shared::clock::ManualClock;
    use std::time::Duration;

    const SOURCE: &str = "testsrc://bars?duration=2&fps=10&width=64&height=48";

    fn player(config: PlayerConfig) -> (PlaybackController, ManualClock, Arc<MemoryEventSink>) {
        let clock = ManualClock::new();
        let sink = Arc::new(MemoryEventSink::new());
        let player = create_player_with_clock(config, Arc::new(clock.clone()), sink.clone());
        (player, clock, sink)
    }

    fn step(player: &mut PlaybackController, clock: &ManualClock, ms: u64) {
        clock.advance(Duration::from_millis(ms));
        player.tick();
    }

    #[test]
    fn test_plays_test_pattern_to_completion() {
        let (mut player, clock, sink) = player(PlayerConfig::default());
        player.load(SOURCE);
        assert_eq!(player.state(), PlayerState::Playing);

        for _ in 0..30 {
            step(&mut player, &clock, 100);
        }

        assert_eq!(player.state(), PlayerState::Completed);
        assert_eq!(
            sink.names(),
            vec!["load-start", "ready", "playing", "playback-complete"]
        );
        assert!(sink.count("progress") > 0);
    }

    #[test]
    fn test_capture_after_render() {
        let (mut player, clock, _) = player(PlayerConfig::default());
        player.load(SOURCE);
        step(&mut player, &clock, 100);

        let image = player.capture_frame_as_image().unwrap();
        assert_eq!((image.width, image.height), (64, 48));
        assert!(image.data_uri().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_records_playback_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let (mut player, clock, sink) = player(PlayerConfig::default());
        player.load(SOURCE);

        assert!(player.start_recording(path.to_str().unwrap()));
        for _ in 0..5 {
            step(&mut player, &clock, 100);
            // Give the writer thread a chance to drain its single slot.
            std::thread::sleep(Duration::from_millis(20));
        }

        let summary = player
            .stop_recording()
            .unwrap()
            .wait_timeout(Duration::from_secs(30))
            .expect("finalizer did not finish")
            .unwrap();
        assert_eq!(summary.output_path, path);
        assert!(summary.frame_count >= 1);
        assert!(path.metadata().unwrap().len() > 0);
        assert_eq!(player.recording_state(), RecordingState::Idle);
        assert_eq!(sink.count("recording-started"), 1);
        assert_eq!(sink.count("recording-finalizing"), 1);
    }

    #[test]
    fn test_unreadable_file_fails() {
        let (mut player, _, sink) = player(PlayerConfig::default());
        player.load("/nonexistent/clip.mp4");
        assert_eq!(player.state(), PlayerState::Failed);
        assert_eq!(sink.count("error"), 1);
    }

    #[test]
    fn test_oversized_test_pattern_fails_with_source_error() {
        let (mut player, _, sink) = player(PlayerConfig::default());
        player.load("testsrc://bars?duration=1e30");
        assert_eq!(player.state(), PlayerState::Failed);
        assert!(sink.events().iter().any(|e| matches!(
            e,
            PlayerEvent::Error { code, .. } if code == "SOURCE_ERROR"
        )));
    }
}
