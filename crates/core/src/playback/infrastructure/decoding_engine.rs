use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::playback::domain::media_engine::{EngineEvent, MediaEngine};
use crate::shared::clock::Clock;
use crate::shared::frame::Frame;
use crate::shared::frame_slot::FrameSlot;
use crate::shared::media_locator::MediaLocator;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_decoder::VideoDecoder;
use crate::video::infrastructure::decoder_factory::create_decoder;

use super::playhead::Playhead;

pub type DecoderFactory = Box<dyn Fn(&MediaLocator) -> Box<dyn VideoDecoder> + Send>;

/// A [`MediaEngine`] that pulls frames from a [`VideoDecoder`] to follow a
/// clock-driven [`Playhead`].
///
/// Each `render` decodes at most `decode_budget` frames and publishes the
/// newest one whose timestamp is not past the playhead. If the decoder is
/// still more than `stall_threshold` behind after spending its budget, the
/// engine reports buffering and holds the playhead until decoding catches
/// up. Seeks also hold the playhead until the target frame is on screen.
/// The end is reported once the playhead reaches the duration, or when an
/// open-ended stream runs dry.
pub struct DecodingEngine {
    decoder_factory: DecoderFactory,
    decoder: Option<Box<dyn VideoDecoder>>,
    metadata: Option<VideoMetadata>,
    playhead: Playhead,
    stall_threshold: Duration,
    decode_budget: usize,
    /// Decoded but not yet due.
    pending: Option<Frame>,
    decoded_until: Option<Duration>,
    buffering: bool,
    seeking: bool,
    exhausted: bool,
    ended: bool,
    failed: bool,
    events: VecDeque<EngineEvent>,
}

impl DecodingEngine {
    pub fn new(clock: Arc<dyn Clock>, stall_threshold: Duration, decode_budget: usize) -> Self {
        Self {
            playhead: Playhead::new(clock),
            decoder_factory: Box::new(create_decoder),
            decoder: None,
            metadata: None,
            stall_threshold,
            decode_budget: decode_budget.max(1),
            pending: None,
            decoded_until: None,
            buffering: false,
            seeking: false,
            exhausted: false,
            ended: false,
            failed: false,
            events: VecDeque::new(),
        }
    }

    pub fn with_decoder_factory(mut self, factory: DecoderFactory) -> Self {
        self.decoder_factory = factory;
        self
    }

    pub fn metadata(&self) -> Option<&VideoMetadata> {
        self.metadata.as_ref()
    }

    fn reset_progress(&mut self) {
        self.pending = None;
        self.decoded_until = None;
        self.buffering = false;
        self.seeking = false;
        self.exhausted = false;
        self.ended = false;
    }

    fn fail(&mut self, message: String) {
        log::error!("Decoding failed: {message}");
        self.failed = true;
        self.playhead.hold(true);
        self.events.push_back(EngineEvent::Failed(message));
    }

    fn reach_end(&mut self) {
        if !self.ended {
            self.ended = true;
            log::debug!("Reached end at {:?}", self.playhead.position());
            self.events.push_back(EngineEvent::ReachedEnd);
        }
    }

    /// Decodes up to the budget towards `target`. Returns the newest due
    /// frame and whether the decoder has caught up with the target.
    fn decode_towards(&mut self, target: Duration) -> Result<(Option<Frame>, bool), String> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok((None, false));
        };

        let mut latest = None;
        for _ in 0..self.decode_budget {
            let next = match self.pending.take() {
                Some(frame) => Some(Ok(frame)),
                None => decoder.next_frame(),
            };
            match next {
                None => {
                    self.exhausted = true;
                    return Ok((latest, true));
                }
                Some(Err(e)) => return Err(e.to_string()),
                Some(Ok(frame)) => {
                    self.decoded_until = Some(frame.timestamp());
                    if frame.timestamp() <= target {
                        latest = Some(frame);
                    } else {
                        self.pending = Some(frame);
                        return Ok((latest, true));
                    }
                }
            }
        }
        Ok((latest, false))
    }
}

impl MediaEngine for DecodingEngine {
    fn load(&mut self, locator: &MediaLocator) -> Result<(), Box<dyn std::error::Error>> {
        self.unload();

        let mut decoder = (self.decoder_factory)(locator);
        let metadata = decoder.open(locator)?;
        log::info!(
            "Loaded {locator}: {}x{} @ {:.2} fps, duration {:?}",
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.duration
        );

        self.playhead.reset(metadata.duration);
        self.decoder = Some(decoder);
        self.metadata = Some(metadata.clone());
        self.events.push_back(EngineEvent::ItemReady(metadata));
        Ok(())
    }

    fn unload(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            decoder.close();
        }
        self.metadata = None;
        self.failed = false;
        self.events.clear();
        self.reset_progress();
        self.playhead.reset(None);
    }

    fn set_rate(&mut self, rate: f64) {
        self.playhead.set_rate(rate);
    }

    fn rate(&self) -> f64 {
        self.playhead.rate()
    }

    fn seek(&mut self, position: Duration) {
        if self.failed {
            return;
        }
        let Some(decoder) = self.decoder.as_mut() else {
            return;
        };
        if let Err(e) = decoder.seek(position) {
            self.fail(format!("seek to {position:?} failed: {e}"));
            return;
        }
        self.reset_progress();
        self.playhead.seek(position);
        self.seeking = true;
        self.playhead.hold(true);
    }

    fn position(&self) -> Duration {
        self.playhead.position()
    }

    fn duration(&self) -> Option<Duration> {
        self.metadata.as_ref().and_then(|m| m.duration)
    }

    fn is_buffering(&self) -> bool {
        self.buffering
    }

    fn render(&mut self, slot: &FrameSlot) {
        if self.failed || self.decoder.is_none() {
            return;
        }

        let target = self.playhead.position();
        let (due, caught_up) = match self.decode_towards(target) {
            Ok(result) => result,
            Err(message) => {
                self.fail(message);
                return;
            }
        };
        if let Some(frame) = due {
            slot.publish(frame);
        }

        if self.seeking {
            if caught_up {
                self.seeking = false;
                self.playhead.hold(self.buffering);
                self.events.push_back(EngineEvent::SeekCompleted);
            }
            return;
        }

        let past_end = match self.duration() {
            Some(duration) => target >= duration,
            None => self.exhausted,
        };
        if past_end {
            self.reach_end();
            return;
        }

        let lag = target.saturating_sub(self.decoded_until.unwrap_or(Duration::ZERO));
        if !self.buffering && !caught_up && self.playhead.rate() > 0.0 && lag > self.stall_threshold
        {
            log::debug!("Decoder {lag:?} behind the playhead, buffering");
            self.buffering = true;
            self.playhead.hold(true);
            self.events.push_back(EngineEvent::BufferingStarted);
        } else if self.buffering && caught_up {
            log::debug!("Decoder caught up at {target:?}");
            self.buffering = false;
            self.playhead.hold(false);
            self.events.push_back(EngineEvent::BufferingEnded);
        }
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }
}

impl std::fmt::Debug for DecodingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodingEngine")
            .field("metadata", &self.metadata)
            .field("position", &self.playhead.position())
            .field("buffering", &self.buffering)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}
