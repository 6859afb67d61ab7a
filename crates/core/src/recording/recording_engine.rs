use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::capture::frame_capture_service::FrameCaptureService;
use crate::playback::domain::event_sink::EventSink;
use crate::playback::domain::player_event::PlayerEvent;
use crate::recording::domain::recording_state::{
    DropReason, FrameAppendOutcome, RecordingOutcome, RecordingState, RecordingSummary,
};
use crate::shared::clock::Clock;
use crate::shared::constants::{RECORDINGS_DIR_NAME, RECORDING_EXTENSION, RECORDING_FILE_PREFIX};
use crate::shared::error::PlayerError;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

pub type WriterFactory = Box<dyn Fn() -> Box<dyn VideoWriter> + Send>;

type FinalizeResult = Result<RecordingSummary, PlayerError>;

struct RecordingSession {
    output_path: PathBuf,
    writer: Box<dyn VideoWriter>,
    frame_count: usize,
    start_wall_time: Instant,
    last_timestamp: Option<Duration>,
}

#[derive(Debug)]
struct Status {
    state: RecordingState,
    last_outcome: Option<RecordingOutcome>,
}

/// Shared between the engine and its finalizer thread.
#[derive(Clone, Debug)]
struct StatusCell(Arc<Mutex<Status>>);

impl StatusCell {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Status {
            state: RecordingState::Idle,
            last_outcome: None,
        })))
    }

    fn lock(&self) -> MutexGuard<'_, Status> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state(&self) -> RecordingState {
        self.lock().state
    }

    fn transition(&self, next: RecordingState) {
        let mut status = self.lock();
        if status.state.can_transition_to(next) {
            log::debug!("Recording {} -> {next}", status.state);
            status.state = next;
        } else {
            log::error!("Ignoring illegal recording transition {} -> {next}", status.state);
        }
    }

    /// Records a terminal outcome and returns to `Idle`.
    fn settle(&self, outcome: RecordingOutcome) {
        let terminal = match outcome {
            RecordingOutcome::Completed(_) => Some(RecordingState::Completed),
            RecordingOutcome::Failed(_) => Some(RecordingState::Failed),
            RecordingOutcome::Aborted => None,
        };
        if let Some(terminal) = terminal {
            self.transition(terminal);
        }
        self.transition(RecordingState::Idle);
        self.lock().last_outcome = Some(outcome);
    }
}

/// Delivers the result of an asynchronous finalization.
///
/// The result can be taken once; after `wait_timeout` or `poll` has
/// returned it, later calls return `None`.
#[derive(Debug)]
pub struct FinalizeHandle {
    rx: crossbeam_channel::Receiver<FinalizeResult>,
}

impl FinalizeHandle {
    /// Blocks until finalization finishes.
    pub fn wait(self) -> FinalizeResult {
        self.rx.recv().unwrap_or_else(|_| {
            Err(PlayerError::FinalizationFailed(
                "finalizer exited without a result".to_string(),
            ))
        })
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<FinalizeResult> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn poll(&self) -> Option<FinalizeResult> {
        self.rx.try_recv().ok()
    }
}

/// Re-encodes captured frames into a new video file.
///
/// At most one session exists at a time. Frames are stamped with wall-clock
/// time since the session started, and each append must be strictly later
/// than the previous one. When the writer is busy the sample is skipped,
/// never queued or retried.
pub struct RecordingEngine {
    session: Option<RecordingSession>,
    status: StatusCell,
    writer_factory: WriterFactory,
    capture: FrameCaptureService,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl RecordingEngine {
    pub fn new(
        writer_factory: WriterFactory,
        capture: FrameCaptureService,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            session: None,
            status: StatusCell::new(),
            writer_factory,
            capture,
            clock,
            events,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.status.state()
    }

    pub fn last_outcome(&self) -> Option<RecordingOutcome> {
        self.status.lock().last_outcome.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Frames appended to the active session, 0 without one.
    pub fn frame_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.frame_count)
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.output_path.as_path())
    }

    pub fn start_recording(
        &mut self,
        output_path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), PlayerError> {
        if self.state().is_busy() {
            return Err(PlayerError::AlreadyRecording);
        }
        if metadata.width == 0 || metadata.height == 0 {
            return Err(PlayerError::Unsupported(format!(
                "cannot record {}x{} frames",
                metadata.width, metadata.height
            )));
        }
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PlayerError::OutputNotWritable {
                path: output_path.to_path_buf(),
                source,
            })?;
        }

        let mut writer = (self.writer_factory)();
        writer
            .open(output_path, metadata)
            .map_err(|e| PlayerError::EncodingFailed(format!("cannot open writer: {e}")))?;

        self.status.transition(RecordingState::Preparing);
        self.session = Some(RecordingSession {
            output_path: output_path.to_path_buf(),
            writer,
            frame_count: 0,
            start_wall_time: self.clock.now(),
            last_timestamp: None,
        });
        self.status.transition(RecordingState::Recording);

        log::info!(
            "Recording {}x{} to {}",
            metadata.width,
            metadata.height,
            output_path.display()
        );
        self.events.emit(&PlayerEvent::RecordingStarted {
            output_path: output_path.to_path_buf(),
        });
        Ok(())
    }

    /// Samples the render surface once and appends the frame if the writer
    /// can take it.
    pub fn capture_frame_for_recording(&mut self) -> Result<FrameAppendOutcome, PlayerError> {
        if self.state() != RecordingState::Recording {
            return Ok(FrameAppendOutcome::NotRecording);
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(FrameAppendOutcome::NotRecording);
        };

        if !session.writer.is_ready_for_input() {
            log::debug!("Writer busy, skipping frame");
            return Ok(FrameAppendOutcome::Dropped(DropReason::WriterNotReady));
        }
        let captured = match self.capture.capture_frame() {
            Ok(captured) => captured,
            Err(PlayerError::NoFrameAvailable) => {
                return Ok(FrameAppendOutcome::Dropped(DropReason::NoFrame))
            }
            Err(e) => return Err(e),
        };

        let timestamp = self
            .clock
            .now()
            .saturating_duration_since(session.start_wall_time);
        if session.last_timestamp.is_some_and(|last| timestamp <= last) {
            log::debug!("Clock did not advance past {timestamp:?}, skipping frame");
            return Ok(FrameAppendOutcome::Dropped(DropReason::NonMonotonic));
        }

        if let Err(e) = session.writer.write(&captured.frame, timestamp) {
            let message = format!("append at {timestamp:?} failed: {e}");
            log::error!("Recording failed: {message}");
            if let Some(mut session) = self.session.take() {
                session.writer.abort();
            }
            self.status.settle(RecordingOutcome::Failed(message.clone()));
            return Err(PlayerError::EncodingFailed(message));
        }

        session.frame_count += 1;
        session.last_timestamp = Some(timestamp);
        Ok(FrameAppendOutcome::Appended(timestamp))
    }

    /// Ends the session and finalizes the file on a background thread.
    pub fn stop_recording(&mut self) -> Result<FinalizeHandle, PlayerError> {
        if self.state() != RecordingState::Recording {
            return Err(PlayerError::NotRecording);
        }
        let session = self.session.take().ok_or(PlayerError::NotRecording)?;

        self.status.transition(RecordingState::Finalizing);
        log::info!(
            "Finalizing {} ({} frames)",
            session.output_path.display(),
            session.frame_count
        );
        self.events.emit(&PlayerEvent::RecordingFinalizing {
            frame_count: session.frame_count,
        });

        let (tx, rx) = crossbeam_channel::bounded(1);
        let status = self.status.clone();
        std::thread::spawn(move || {
            let result = finalize(session);
            match &result {
                Ok(summary) => {
                    log::info!(
                        "Recording saved to {} ({} frames, {:.2}s)",
                        summary.output_path.display(),
                        summary.frame_count,
                        summary.duration.as_secs_f64()
                    );
                    status.settle(RecordingOutcome::Completed(summary.clone()));
                }
                Err(e) => {
                    log::error!("{e}");
                    status.settle(RecordingOutcome::Failed(e.to_string()));
                }
            }
            let _ = tx.send(result);
        });

        Ok(FinalizeHandle { rx })
    }

    /// Discards a live session and its partial output.
    pub fn abort(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        log::info!(
            "Aborting recording to {} after {} frames",
            session.output_path.display(),
            session.frame_count
        );
        session.writer.abort();
        self.status.settle(RecordingOutcome::Aborted);
        self.events.emit(&PlayerEvent::RecordingAborted);
    }
}

impl Drop for RecordingEngine {
    fn drop(&mut self) {
        self.abort();
    }
}

fn finalize(mut session: RecordingSession) -> FinalizeResult {
    if session.frame_count == 0 {
        session.writer.abort();
        return Err(PlayerError::FinalizationFailed(format!(
            "no frames were recorded to {}",
            session.output_path.display()
        )));
    }
    if let Err(e) = session.writer.close() {
        if session.output_path.exists() {
            let _ = std::fs::remove_file(&session.output_path);
        }
        return Err(PlayerError::FinalizationFailed(format!(
            "cannot finish {}: {e}",
            session.output_path.display()
        )));
    }
    Ok(RecordingSummary {
        output_path: session.output_path,
        frame_count: session.frame_count,
        duration: session.last_timestamp.unwrap_or(Duration::ZERO),
    })
}

/// Picks `recording_<unix millis>.mp4` inside `directory`, or inside the
/// user's video folder (temp dir as a last resort) when none is configured.
pub fn generate_output_path(directory: Option<&Path>) -> PathBuf {
    let dir = match directory {
        Some(dir) => dir.to_path_buf(),
        None => dirs::video_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(RECORDINGS_DIR_NAME),
    };
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    dir.join(format!("{RECORDING_FILE_PREFIX}{millis}.{RECORDING_EXTENSION}"))
}
