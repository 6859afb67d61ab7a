use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the playback, capture and recording services.
///
/// Wrong-state calls are not errors for the playback controller (they are
/// no-ops); only the recording engine reports `AlreadyRecording` and
/// `NotRecording` so callers can tell why a request was refused.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("unsupported media: {0}")]
    Unsupported(String),

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("no frame available")]
    NoFrameAvailable,

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    /// Never returned by the recorder, which drops the frame instead; see
    /// `DropReason::as_error`.
    #[error("writer is not ready for more input")]
    WriterNotReady,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error("output path {path} is not writable: {source}")]
    OutputNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("finalization failed: {0}")]
    FinalizationFailed(String),
}

impl PlayerError {
    /// Stable code carried by `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            PlayerError::SourceUnavailable(_) => "SOURCE_ERROR",
            PlayerError::Unsupported(_) => "UNSUPPORTED",
            PlayerError::Playback(_) => "PLAYBACK_ERROR",
            PlayerError::NoFrameAvailable => "NO_FRAME",
            PlayerError::EncodingFailed(_) => "ENCODING_ERROR",
            PlayerError::WriterNotReady => "WRITER_NOT_READY",
            PlayerError::AlreadyRecording => "ALREADY_RECORDING",
            PlayerError::NotRecording => "NOT_RECORDING",
            PlayerError::OutputNotWritable { .. } => "OUTPUT_NOT_WRITABLE",
            PlayerError::FinalizationFailed(_) => "FINALIZATION_ERROR",
        }
    }
}
