use std::sync::{Arc, Mutex, PoisonError};

use simpledex_core::DexEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Receives every event the engine emits
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &DexEvent);
}

/// Discards events
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &DexEvent) {}
}

/// Records events in memory, in emission order
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<DexEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }

    pub fn events(&self) -> Vec<DexEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<DexEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take all recorded events, leaving the log empty
    pub fn drain(&self) -> Vec<DexEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: &DexEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Fans events out to async subscribers
pub struct EventBroadcaster {
    sender: broadcast::Sender<DexEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        EventBroadcaster { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DexEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl EventSink for EventBroadcaster {
    fn emit(&self, event: &DexEvent) {
        // Sending with no subscribers is not an error for us
        if let Ok(count) = self.sender.send(event.clone()) {
            debug!("Broadcast {} to {} subscribers", event.name(), count);
        }
    }
}

/// Forwards each event to several sinks
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanOut {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        FanOut { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

impl EventSink for FanOut {
    fn emit(&self, event: &DexEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
