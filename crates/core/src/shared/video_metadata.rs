use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// `None` when the container does not report a duration (live streams).
    pub duration: Option<Duration>,
    pub codec: String,
    pub source: Option<String>,
}

impl VideoMetadata {
    /// Duration of one frame, falling back to 30 fps when unknown.
    pub fn frame_interval(&self) -> Duration {
        let fps = if self.fps > 0.0 { self.fps } else { 30.0 };
        Duration::try_from_secs_f64(1.0 / fps).unwrap_or(Duration::MAX)
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.map(|d| d.as_secs_f64()).unwrap_or(0.0)
    }
}
