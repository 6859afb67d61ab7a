use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::capture::domain::still_image_encoder::{CapturedFrame, EncodedImage};
use crate::capture::frame_capture_service::FrameCaptureService;
use crate::playback::domain::event_sink::EventSink;
use crate::playback::domain::media_engine::{EngineEvent, MediaEngine};
use crate::playback::domain::playback_session::PlaybackSession;
use crate::playback::domain::player_event::PlayerEvent;
use crate::playback::domain::player_state::PlayerState;
use crate::playback::time_source::{TimeSample, TimeSource};
use crate::recording::domain::recording_state::{
    FrameAppendOutcome, RecordingOutcome, RecordingState,
};
use crate::recording::recording_engine::{generate_output_path, FinalizeHandle, RecordingEngine};
use crate::shared::clock::Clock;
use crate::shared::config::PlayerConfig;
use crate::shared::error::PlayerError;
use crate::shared::frame_slot::FrameSlot;
use crate::shared::media_locator::MediaLocator;
use crate::shared::video_metadata::VideoMetadata;

/// Drives a [`MediaEngine`] through the player state machine and reports
/// lifecycle changes to an [`EventSink`].
///
/// All methods take `&mut self`; the host owns the controller on one thread
/// and calls [`tick`](Self::tick) periodically, typically from
/// [`TimeSource::subscribe`]. Calls that make no sense in the current state
/// are ignored rather than reported as errors.
pub struct PlaybackController {
    engine: Box<dyn MediaEngine>,
    session: Option<PlaybackSession>,
    time_source: TimeSource,
    slot: FrameSlot,
    clock: Arc<dyn Clock>,
    capture: FrameCaptureService,
    recorder: RecordingEngine,
    events: Arc<dyn EventSink>,
    config: PlayerConfig,
    /// Survives loads and loop restarts.
    playback_rate: f64,
    loop_enabled: bool,
    is_fullscreen: bool,
}

impl PlaybackController {
    pub fn new(
        engine: Box<dyn MediaEngine>,
        capture: FrameCaptureService,
        recorder: RecordingEngine,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
        config: PlayerConfig,
    ) -> Self {
        let playback_rate = if config.speed.is_finite() && config.speed > 0.0 {
            config.speed
        } else {
            log::warn!("Invalid configured speed {}, using 1.0", config.speed);
            1.0
        };
        Self {
            engine,
            session: None,
            time_source: TimeSource::new(config.tick_interval()),
            slot: capture.slot().clone(),
            clock,
            capture,
            recorder,
            events,
            loop_enabled: config.loop_playback,
            config,
            playback_rate,
            is_fullscreen: false,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.session.as_ref().map_or(PlayerState::Idle, |s| s.state)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn time_source(&self) -> &TimeSource {
        &self.time_source
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn is_loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    // --- lifecycle ---------------------------------------------------------

    /// Replaces the current item. Any recording in progress is discarded.
    pub fn load(&mut self, source: &str) {
        self.teardown();
        self.session = Some(PlaybackSession::new(
            source,
            self.playback_rate,
            self.loop_enabled,
        ));
        log::info!("Loading {source}");
        self.emit(PlayerEvent::LoadStart);

        let locator = match MediaLocator::parse(source) {
            Ok(locator) => locator,
            Err(e) => {
                self.fail(e);
                return;
            }
        };
        if let Err(e) = self.engine.load(&locator) {
            self.fail(PlayerError::SourceUnavailable(format!("{locator}: {e}")));
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.locator = Some(locator);
        }
        // Engines that open synchronously report readiness right away.
        self.process_engine_events();
    }

    /// Tears the session down and returns to `Idle`.
    pub fn unload(&mut self) {
        if self.session.is_none() {
            return;
        }
        self.teardown();
        self.transition(PlayerState::Idle);
        self.session = None;
    }

    fn teardown(&mut self) {
        self.recorder.abort();
        self.engine.unload();
        self.slot.reset(self.clock.now());
    }

    // --- transport ---------------------------------------------------------

    pub fn play(&mut self) {
        match self.state() {
            PlayerState::Ready | PlayerState::Paused => self.start_playing(),
            PlayerState::Stalled if !self.engine.is_buffering() => self.start_playing(),
            PlayerState::Completed if self.loop_enabled => {
                log::info!("Restarting completed item");
                self.restart_from_zero();
                if let Some(session) = self.session.as_mut() {
                    session.completion_emitted = false;
                }
                self.transition(PlayerState::Playing);
                self.emit(PlayerEvent::Playing);
            }
            state => log::debug!("play() ignored while {state}"),
        }
    }

    fn start_playing(&mut self) {
        if self.transition(PlayerState::Playing) {
            self.engine.set_rate(self.playback_rate);
            self.emit(PlayerEvent::Playing);
        }
    }

    pub fn pause(&mut self) {
        if !self.state().is_active() {
            log::debug!("pause() ignored while {}", self.state());
            return;
        }
        if self.transition(PlayerState::Paused) {
            self.engine.set_rate(0.0);
            self.emit(PlayerEvent::Paused);
        }
    }

    /// Jumps to `seconds`, clamped to the item. Playback resumes at the
    /// current rate once the engine has finished seeking.
    pub fn seek(&mut self, seconds: f64) {
        let state = self.state();
        if state == PlayerState::Idle || state.is_terminal() {
            log::debug!("seek() ignored while {state}");
            return;
        }
        if !seconds.is_finite() {
            log::warn!("Ignoring seek to {seconds}");
            return;
        }
        let mut target = seconds.max(0.0);
        let duration = self.engine.duration();
        if let Some(duration) = duration {
            target = target.min(duration.as_secs_f64());
        }
        let Ok(position) = Duration::try_from_secs_f64(target) else {
            log::warn!("Ignoring seek to {target}s, out of range");
            return;
        };

        let resume_rate = if state.is_active() {
            self.playback_rate
        } else {
            0.0
        };
        if let Some(session) = self.session.as_mut() {
            session.pending_seek_rate = Some(resume_rate);
        }
        log::debug!("Seeking to {target:.3}s");
        self.engine.set_rate(0.0);
        self.engine.seek(position);
        self.emit(PlayerEvent::Progress {
            current_time: target,
            duration: duration.map_or(0.0, |d| d.as_secs_f64()),
        });
    }

    /// `0` pauses; negative and non-finite rates are rejected.
    pub fn set_speed(&mut self, rate: f64) {
        if !rate.is_finite() || rate < 0.0 {
            log::warn!("Ignoring invalid playback rate {rate}");
            return;
        }
        if rate == 0.0 {
            self.pause();
            return;
        }
        self.playback_rate = rate;
        let active = self.state().is_active();
        if let Some(session) = self.session.as_mut() {
            session.playback_rate = rate;
            if let Some(pending) = session.pending_seek_rate.as_mut() {
                if *pending > 0.0 {
                    *pending = rate;
                }
            }
        }
        if active && !self.seek_in_flight() {
            self.engine.set_rate(rate);
        }
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
        if let Some(session) = self.session.as_mut() {
            session.loop_enabled = enabled;
        }
    }

    pub fn toggle_fullscreen(&mut self, is_fullscreen: bool) {
        if self.is_fullscreen != is_fullscreen {
            self.is_fullscreen = is_fullscreen;
            self.emit(PlayerEvent::FullscreenChanged { is_fullscreen });
        }
    }

    /// Validates and remembers the poster image for the current item.
    pub fn setup_thumbnail(&mut self, source: &str) -> Result<(), PlayerError> {
        let locator = MediaLocator::parse(source)?;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| PlayerError::Playback("no media loaded".to_string()))?;
        log::debug!("Thumbnail set to {locator}");
        session.thumbnail = Some(locator);
        Ok(())
    }

    // --- time --------------------------------------------------------------

    pub fn current_time(&self) -> f64 {
        self.sample().map_or(0.0, |s| s.current_time)
    }

    pub fn duration(&self) -> f64 {
        self.sample().map_or(0.0, |s| s.duration)
    }

    fn sample(&self) -> Option<TimeSample> {
        self.session
            .as_ref()
            .map(|_| self.time_source.sample(self.engine.as_ref()))
    }

    /// Advances one step: render, react to the engine, report progress and
    /// feed the recorder.
    pub fn tick(&mut self) {
        if self.session.is_none() {
            return;
        }
        self.engine.render(&self.slot);
        self.process_engine_events();
        self.check_completion();

        let state = self.state();
        if matches!(
            state,
            PlayerState::Ready | PlayerState::Playing | PlayerState::Paused | PlayerState::Stalled
        ) {
            if let Some(sample) = self.sample().filter(|s| s.duration > 0.0) {
                self.emit(PlayerEvent::Progress {
                    current_time: sample.current_time,
                    duration: sample.duration,
                });
            }
        }

        // Append failures end the recording, not playback; no error event.
        if self.recorder.is_recording() {
            match self.recorder.capture_frame_for_recording() {
                Ok(FrameAppendOutcome::Dropped(reason)) => {
                    if let Some(e) = reason.as_error() {
                        log::trace!("Frame not recorded: {}", e.code());
                    }
                }
                Ok(_) => {}
                Err(e) => log::warn!("Recording stopped during playback: {e}"),
            }
        }
    }

    fn process_engine_events(&mut self) {
        for event in self.engine.poll_events() {
            match event {
                EngineEvent::ItemReady(metadata) => self.on_item_ready(metadata),
                EngineEvent::BufferingStarted => {
                    if self.state() == PlayerState::Playing && self.transition(PlayerState::Stalled)
                    {
                        log::info!("Playback stalled at {:.3}s", self.current_time());
                        self.emit(PlayerEvent::Stalled);
                    }
                }
                EngineEvent::BufferingEnded => {
                    if self.state() == PlayerState::Stalled && self.transition(PlayerState::Playing)
                    {
                        log::info!("Playback resumed at {:.3}s", self.current_time());
                        self.emit(PlayerEvent::Resumed);
                    }
                }
                EngineEvent::SeekCompleted => self.on_seek_completed(),
                EngineEvent::ReachedEnd => self.on_reached_end(),
                EngineEvent::Failed(message) => self.fail(PlayerError::Playback(message)),
            }
        }
    }

    fn on_item_ready(&mut self, metadata: VideoMetadata) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state != PlayerState::Loading || session.ready_emitted {
            log::debug!("Duplicate ready signal ignored");
            return;
        }
        session.ready_emitted = true;
        // A seek issued while loading may never be acknowledged by the engine.
        session.pending_seek_rate = None;
        let duration = metadata.duration_secs();
        session.metadata = Some(metadata);
        if self.transition(PlayerState::Ready) {
            self.emit(PlayerEvent::Ready { duration });
            if self.config.autoplay {
                self.play();
            }
        }
    }

    fn on_seek_completed(&mut self) {
        let Some(resume_rate) = self
            .session
            .as_mut()
            .and_then(|s| s.pending_seek_rate.take())
        else {
            return;
        };
        if resume_rate > 0.0 && self.state().is_active() {
            self.engine.set_rate(self.playback_rate);
        }
    }

    fn seek_in_flight(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.pending_seek_rate.is_some())
    }

    fn check_completion(&mut self) {
        if self.state() != PlayerState::Playing {
            return;
        }
        let Some(duration) = self.engine.duration() else {
            return;
        };
        if !self.seek_in_flight() && self.engine.position() >= duration {
            self.on_reached_end();
        }
    }

    fn on_reached_end(&mut self) {
        if self.state() != PlayerState::Playing {
            return;
        }
        if self.loop_enabled {
            log::debug!("Looping back to start");
            self.restart_from_zero();
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.completion_emitted {
            return;
        }
        session.completion_emitted = true;
        self.engine.set_rate(0.0);
        if self.transition(PlayerState::Completed) {
            log::info!("Playback complete");
            self.emit(PlayerEvent::PlaybackComplete);
        }
    }

    fn restart_from_zero(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.pending_seek_rate = Some(self.playback_rate);
        }
        self.engine.set_rate(0.0);
        self.engine.seek(Duration::ZERO);
    }

    fn fail(&mut self, error: PlayerError) {
        log::error!("{error}");
        self.engine.set_rate(0.0);
        self.transition(PlayerState::Failed);
        self.emit(PlayerEvent::error(&error));
    }

    /// Moves the session to `next` if the edge is legal.
    fn transition(&mut self, next: PlayerState) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let current = session.state;
        if !current.can_transition_to(next) {
            log::warn!("Ignoring illegal transition {current} -> {next}");
            return false;
        }
        if current != next {
            log::debug!("{current} -> {next}");
        }
        session.state = next;
        true
    }

    fn emit(&self, event: PlayerEvent) {
        self.events.emit(&event);
    }

    // --- capture and recording ----------------------------------------------

    pub fn capture_frame(&self) -> Result<CapturedFrame, PlayerError> {
        self.capture.capture_frame()
    }

    pub fn capture_frame_as_image(&self) -> Result<EncodedImage, PlayerError> {
        self.capture.capture_frame_as_image()
    }

    /// Captures now and delivers the encoded image to `completion` from a
    /// background thread.
    pub fn capture_frame_with<F>(&self, completion: F)
    where
        F: FnOnce(Result<EncodedImage, PlayerError>) + Send + 'static,
    {
        self.capture.capture_frame_as_image_with(completion);
    }

    pub fn capture_frame_for_recording(&mut self) -> Result<FrameAppendOutcome, PlayerError> {
        self.recorder.capture_frame_for_recording()
    }

    /// Boolean form of [`try_start_recording`](Self::try_start_recording).
    pub fn start_recording(&mut self, output_path: &str) -> bool {
        match self.try_start_recording(output_path) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Cannot start recording: {e}");
                false
            }
        }
    }

    /// Starts recording the rendered stream. An empty path records to a
    /// generated file in the recordings directory.
    pub fn try_start_recording(&mut self, output_path: &str) -> Result<PathBuf, PlayerError> {
        let metadata = self
            .session
            .as_ref()
            .filter(|s| s.state != PlayerState::Failed)
            .and_then(|s| s.metadata.clone())
            .ok_or_else(|| PlayerError::Playback("no playable item to record".to_string()))?;

        let path = if output_path.trim().is_empty() {
            generate_output_path(self.config.recording.directory.as_deref())
        } else {
            PathBuf::from(output_path)
        };
        self.recorder.start_recording(&path, &metadata)?;
        Ok(path)
    }

    pub fn stop_recording(&mut self) -> Result<FinalizeHandle, PlayerError> {
        self.recorder.stop_recording()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    pub fn recorded_frame_count(&self) -> usize {
        self.recorder.frame_count()
    }

    pub fn last_recording_outcome(&self) -> Option<RecordingOutcome> {
        self.recorder.last_outcome()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.unload();
    }
}
