use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::shared::error::PlayerError;

/// Lifecycle of the recording engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordingState {
    Idle,
    Preparing,
    Recording,
    Finalizing,
    Completed,
    Failed,
}

impl RecordingState {
    /// A session exists or is being finalized; a new one cannot start.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            RecordingState::Preparing | RecordingState::Recording | RecordingState::Finalizing
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RecordingState::Completed | RecordingState::Failed)
    }

    /// Terminal outcomes are transient: the engine reports them and goes
    /// back to `Idle`. Aborting a live session also returns to `Idle`.
    pub fn can_transition_to(self, next: RecordingState) -> bool {
        use RecordingState::*;
        matches!(
            (self, next),
            (Idle, Preparing)
                | (Preparing, Recording)
                | (Recording, Finalizing)
                | (Finalizing, Completed)
                | (Preparing, Failed)
                | (Recording, Failed)
                | (Finalizing, Failed)
                | (Completed, Idle)
                | (Failed, Idle)
                | (Preparing, Idle)
                | (Recording, Idle)
        )
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingState::Idle => "idle",
            RecordingState::Preparing => "preparing",
            RecordingState::Recording => "recording",
            RecordingState::Finalizing => "finalizing",
            RecordingState::Completed => "completed",
            RecordingState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a finished recording produced.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordingSummary {
    pub output_path: PathBuf,
    pub frame_count: usize,
    /// Timestamp of the last appended frame.
    pub duration: Duration,
}

/// How the most recent session ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordingOutcome {
    Completed(RecordingSummary),
    Failed(String),
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// The encoder still has work queued.
    WriterNotReady,
    /// Nothing has been rendered yet.
    NoFrame,
    /// The clock did not advance since the previous append.
    NonMonotonic,
}

impl DropReason {
    /// The error a caller would have seen had the drop been surfaced.
    /// Clock hiccups have no error counterpart.
    pub fn as_error(self) -> Option<PlayerError> {
        match self {
            DropReason::WriterNotReady => Some(PlayerError::WriterNotReady),
            DropReason::NoFrame => Some(PlayerError::NoFrameAvailable),
            DropReason::NonMonotonic => None,
        }
    }
}

/// Result of one recording sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameAppendOutcome {
    Appended(Duration),
    Dropped(DropReason),
    NotRecording,
}
