//! A `TransportSink` that records every call.

use faye_transport::TransportSink;
use parking_lot::Mutex;

/// One sink callback, with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Connected,
    Disconnected,
    Text(String),
    Data(Vec<u8>),
    Error(String),
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: &SinkEvent) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().push(event);
    }
}

impl TransportSink for RecordingSink {
    fn on_connected(&self) {
        self.push(SinkEvent::Connected);
    }

    fn on_disconnected(&self) {
        self.push(SinkEvent::Disconnected);
    }

    fn on_text_received(&self, text: &str) {
        self.push(SinkEvent::Text(text.to_owned()));
    }

    fn on_data_received(&self, data: &[u8]) {
        self.push(SinkEvent::Data(data.to_vec()));
    }

    fn on_error(&self, message: &str) {
        self.push(SinkEvent::Error(message.to_owned()));
    }
}
