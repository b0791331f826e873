//! The transport contract a pub/sub client programs against.
//!
//! A [`Transport`] owns one socket and turns its events into calls on a single
//! [`TransportSink`]. Socket events are queued; the sink is only called from
//! [`Transport::dispatch_pending`] or [`dispatch_next`](WebSocketTransport::dispatch_next),
//! so it always runs on the owner's thread.

mod state;
mod websocket;

use std::future::poll_fn;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use tracing::debug;
use url::Url;

use crate::tls::TlsCredentialSource;

pub use state::TransportState;
pub use websocket::{UNKNOWN_ERROR, WebSocketTransport};

/// Name of the WebSocket transport.
pub const WEBSOCKET_TRANSPORT_NAME: &str = "websocket";

/// Receiver of transport notifications; usually the protocol client.
///
/// Every method is called at most once per underlying occurrence, in the
/// order the socket observed them.
pub trait TransportSink: Send + Sync {
    /// The connection is established and ready for sends.
    fn on_connected(&self);

    /// The connection is gone, including after an error.
    fn on_disconnected(&self);

    /// A nonempty text message arrived.
    fn on_text_received(&self, text: &str);

    /// A nonempty binary message arrived.
    fn on_data_received(&self, data: &[u8]);

    /// The connection failed. `message` is never empty.
    fn on_error(&self, message: &str);
}

/// Operations a protocol client needs from any transport.
pub trait Transport: Send {
    /// Fixed identifier of the transport kind.
    fn name(&self) -> &'static str;

    /// The server URL this transport connects to.
    fn url(&self) -> &Url;

    /// Start connecting. Ignored unless idle.
    fn connect_to_server(&mut self);

    /// Start a graceful close. Ignored when idle.
    fn disconnect_from_server(&mut self);

    /// Send a text message and record the send time.
    fn send_text(&mut self, text: &str);

    /// Send a binary message and record the send time.
    fn send_data(&mut self, data: &[u8]);

    /// When `send_text` or `send_data` was last called.
    fn last_send_time(&self) -> Option<Instant>;

    /// Current lifecycle state.
    fn state(&self) -> TransportState;

    /// Whether the connection is open.
    fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Deliver every queued socket event to the sink. Returns how many were handled.
    fn dispatch_pending(&mut self) -> usize;

    /// Deliver the next socket event once one is queued.
    ///
    /// Resolves to `false` if the event queue is closed.
    fn poll_dispatch(&mut self, cx: &mut Context<'_>) -> Poll<bool>;
}

impl dyn Transport {
    /// Wait for the next socket event and deliver it to the sink.
    pub async fn dispatch_next(&mut self) -> bool {
        poll_fn(|cx| self.poll_dispatch(cx)).await
    }
}

/// Names accepted by [`create_transport`].
#[must_use]
pub fn supported_transports() -> &'static [&'static str] {
    &[WEBSOCKET_TRANSPORT_NAME]
}

/// Build the transport registered under `name` (case-insensitive).
///
/// Returns `None` for an unknown name.
///
/// ```
/// use std::sync::Arc;
/// use faye_transport::transport::{TransportSink, create_transport};
///
/// struct Quiet;
/// impl TransportSink for Quiet {
///     fn on_connected(&self) {}
///     fn on_disconnected(&self) {}
///     fn on_text_received(&self, _: &str) {}
///     fn on_data_received(&self, _: &[u8]) {}
///     fn on_error(&self, _: &str) {}
/// }
///
/// let url = url::Url::parse("ws://localhost:8000/faye").unwrap();
/// let transport = create_transport("websocket", url, Arc::new(Quiet), None).unwrap();
/// assert_eq!(transport.name(), "websocket");
/// ```
pub fn create_transport(
    name: &str,
    url: Url,
    sink: Arc<dyn TransportSink>,
    credentials: Option<Arc<dyn TlsCredentialSource>>,
) -> Option<Box<dyn Transport>> {
    if !name.eq_ignore_ascii_case(WEBSOCKET_TRANSPORT_NAME) {
        debug!(name, "unsupported transport requested");
        return None;
    }

    let mut transport = WebSocketTransport::new(url, sink);
    if let Some(credentials) = credentials {
        transport = transport.with_credentials(credentials);
    }
    Some(Box::new(transport))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quiet;

    impl TransportSink for Quiet {
        fn on_connected(&self) {}
        fn on_disconnected(&self) {}
        fn on_text_received(&self, _: &str) {}
        fn on_data_received(&self, _: &[u8]) {}
        fn on_error(&self, _: &str) {}
    }

    fn url() -> Url {
        Url::parse("ws://localhost:8000/faye").unwrap()
    }

    #[test]
    fn test_supported_transports() {
        assert_eq!(supported_transports(), &["websocket"]);
    }

    #[test]
    fn test_create_websocket_transport() {
        let transport = create_transport("WebSocket", url(), Arc::new(Quiet), None).unwrap();
        assert_eq!(transport.name(), WEBSOCKET_TRANSPORT_NAME);
        assert_eq!(transport.url(), &url());
        assert_eq!(transport.state(), TransportState::Idle);
        assert!(!transport.is_connected());
        assert!(transport.last_send_time().is_none());
    }

    #[test]
    fn test_unknown_transport() {
        assert!(create_transport("long-polling", url(), Arc::new(Quiet), None).is_none());
    }
}
