use crate::playback::domain::event_sink::EventSink;
use crate::playback::domain::player_event::PlayerEvent;

/// Forwards events over a crossbeam channel so another thread can consume
/// them. Events emitted after the receiver is gone are dropped.
#[derive(Clone, Debug)]
pub struct ChannelEventSink {
    tx: crossbeam_channel::Sender<PlayerEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: crossbeam_channel::Sender<PlayerEvent>) -> Self {
        Self { tx }
    }

    /// Creates a sink with an unbounded channel and returns its receiver.
    pub fn unbounded() -> (Self, crossbeam_channel::Receiver<PlayerEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: &PlayerEvent) {
        if self.tx.send(event.clone()).is_err() {
            log::debug!("Event receiver gone, dropping {}", event.name());
        }
    }
}
