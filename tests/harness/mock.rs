//! Socket double: records calls and lets a test post events by hand.

use std::sync::Arc;

use faye_transport::socket::{EventSender, Socket, SocketEvent};
use parking_lot::Mutex;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Subscribe,
    Unsubscribe,
    Open(String),
    Close,
    SendText(String),
    SendBinary(Vec<u8>),
    /// Chain length, or `None` when cleared.
    SetLocalCertificate(Option<usize>),
    /// Whether a key was given.
    SetPrivateKey(bool),
    AddCaCertificates(usize),
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<MockCall>,
    subscriber: Option<EventSender>,
    error: String,
}

/// Cloning shares the state, so a test keeps a handle after the transport
/// takes ownership of its copy.
#[derive(Debug, Clone, Default)]
pub struct MockSocket {
    state: Arc<Mutex<MockState>>,
}

impl MockSocket {
    /// Post `event` if a subscriber is registered. Returns whether it was posted.
    pub fn post(&self, event: SocketEvent) -> bool {
        match &self.state.lock().subscriber {
            Some(subscriber) => subscriber.send(event).is_ok(),
            None => false,
        }
    }

    pub fn set_error(&self, error: &str) {
        self.state.lock().error = error.to_owned();
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.lock().subscriber.is_some()
    }

    /// Number of live handles, including the one held by a transport.
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.state)
    }

    fn record(&self, call: MockCall) {
        self.state.lock().calls.push(call);
    }
}

impl Socket for MockSocket {
    fn subscribe(&mut self, events: EventSender) {
        let mut state = self.state.lock();
        state.subscriber = Some(events);
        state.calls.push(MockCall::Subscribe);
    }

    fn unsubscribe(&mut self) {
        let mut state = self.state.lock();
        state.subscriber = None;
        state.calls.push(MockCall::Unsubscribe);
    }

    fn open(&mut self, url: &Url) {
        self.record(MockCall::Open(url.to_string()));
    }

    fn close(&mut self) {
        self.record(MockCall::Close);
    }

    fn send_text(&mut self, text: &str) {
        self.record(MockCall::SendText(text.to_owned()));
    }

    fn send_binary(&mut self, data: &[u8]) {
        self.record(MockCall::SendBinary(data.to_vec()));
    }

    fn error_string(&self) -> String {
        self.state.lock().error.clone()
    }

    fn set_local_certificate(&mut self, chain: Option<Vec<CertificateDer<'static>>>) {
        self.record(MockCall::SetLocalCertificate(chain.map(|c| c.len())));
    }

    fn set_private_key(&mut self, key: Option<PrivateKeyDer<'static>>) {
        self.record(MockCall::SetPrivateKey(key.is_some()));
    }

    fn add_ca_certificates(&mut self, certs: Vec<CertificateDer<'static>>) {
        self.record(MockCall::AddCaCertificates(certs.len()));
    }
}
