use std::time::Duration;

use crate::playback::domain::media_engine::MediaEngine;

/// Position and duration in seconds, as reported in `progress` events.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeSample {
    pub current_time: f64,
    /// `0.0` while unknown.
    pub duration: f64,
}

/// Reads the engine clock and paces the host's tick loop.
#[derive(Clone, Copy, Debug)]
pub struct TimeSource {
    interval: Duration,
}

impl TimeSource {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current position, clamped to `[0, duration]` when the duration is
    /// known.
    pub fn sample(&self, engine: &dyn MediaEngine) -> TimeSample {
        let duration = engine.duration().map(|d| d.as_secs_f64()).unwrap_or(0.0);
        let mut current_time = engine.position().as_secs_f64();
        if duration > 0.0 {
            current_time = current_time.min(duration);
        }
        TimeSample {
            current_time: current_time.max(0.0),
            duration,
        }
    }

    /// A channel that yields once per interval; hosts call `tick()` on the
    /// controller for each message.
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<std::time::Instant> {
        crossbeam_channel::tick(self.interval)
    }
}
