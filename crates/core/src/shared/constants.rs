/// Progress tick cadence (the player reports progress four times a second).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 250;

/// How far decoding may fall behind the playhead before playback stalls.
pub const DEFAULT_STALL_THRESHOLD_MS: u64 = 500;

/// Upper bound on frames decoded during a single render.
pub const DEFAULT_DECODE_BUDGET: usize = 32;

pub const DEFAULT_RECORDING_FPS: u32 = 30;
pub const DEFAULT_WRITER_QUEUE_CAPACITY: usize = 1;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

pub const RECORDINGS_DIR_NAME: &str = "recordings";
pub const RECORDING_FILE_PREFIX: &str = "recording_";
pub const RECORDING_EXTENSION: &str = "mp4";

pub const CONFIG_DIR_NAME: &str = "playrec";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Scheme for synthetic sources, e.g. `testsrc://bars?duration=10&fps=30`.
pub const TEST_PATTERN_SCHEME: &str = "testsrc";
