use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::shared::clock::Clock;

/// Media-time position driven by a wall clock.
///
/// The position is `anchor + elapsed * rate` while running. Any change to
/// rate, hold or position re-anchors first, so time spent paused or held
/// never counts.
pub struct Playhead {
    clock: Arc<dyn Clock>,
    anchor_position: Duration,
    anchor_instant: Instant,
    rate: f64,
    held: bool,
    limit: Option<Duration>,
}

impl Playhead {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            anchor_position: Duration::ZERO,
            anchor_instant: now,
            rate: 0.0,
            held: false,
            limit: None,
        }
    }

    /// Back to zero, stopped, with the given upper bound.
    pub fn reset(&mut self, limit: Option<Duration>) {
        self.anchor_position = Duration::ZERO;
        self.anchor_instant = self.clock.now();
        self.rate = 0.0;
        self.held = false;
        self.limit = limit;
    }

    pub fn position(&self) -> Duration {
        let mut position = self.anchor_position;
        if self.is_advancing() {
            let elapsed = self
                .clock
                .now()
                .saturating_duration_since(self.anchor_instant);
            // Saturates instead of overflowing at extreme rates.
            let advanced = Duration::try_from_secs_f64(elapsed.as_secs_f64() * self.rate)
                .unwrap_or(Duration::MAX);
            position = position.saturating_add(advanced);
        }
        match self.limit {
            Some(limit) => position.min(limit),
            None => position,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Non-finite rates are ignored; negative ones stop the playhead.
    pub fn set_rate(&mut self, rate: f64) {
        if !rate.is_finite() {
            log::warn!("Ignoring non-finite playhead rate {rate}");
            return;
        }
        self.rebase();
        self.rate = rate.max(0.0);
    }

    /// Freezes or releases the position without touching the rate.
    pub fn hold(&mut self, held: bool) {
        if self.held != held {
            self.rebase();
            self.held = held;
        }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn seek(&mut self, position: Duration) {
        self.anchor_position = match self.limit {
            Some(limit) => position.min(limit),
            None => position,
        };
        self.anchor_instant = self.clock.now();
    }

    fn is_advancing(&self) -> bool {
        !self.held && self.rate > 0.0
    }

    fn rebase(&mut self) {
        self.anchor_position = self.position();
        self.anchor_instant = self.clock.now();
    }
}
