use std::sync::Mutex;

use super::player_event::PlayerEvent;

/// Receives player notifications.
///
/// Events are emitted synchronously on the thread that caused them, so
/// implementations should return quickly.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PlayerEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: &PlayerEvent) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<PlayerEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Wire names of the recorded events, skipping `progress` noise.
    pub fn names(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .filter(|e| !matches!(e, PlayerEvent::Progress { .. }))
            .map(PlayerEvent::name)
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &PlayerEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemoryEventSink::new();
        sink.emit(&PlayerEvent::LoadStart);
        sink.emit(&PlayerEvent::Progress {
            current_time: 0.0,
            duration: 1.0,
        });
        sink.emit(&PlayerEvent::Ready { duration: 1.0 });

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.names(), vec!["load-start", "ready"]);
        assert_eq!(sink.count("progress"), 1);

        sink.clear();
        assert!(sink.events().is_empty());
    }
}
