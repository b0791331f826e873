//! WebSocket transport: bridges a [`Socket`] to a [`TransportSink`].

use std::future::poll_fn;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use tracing::{debug, trace};
use url::Url;

use crate::config::Config;
use crate::socket::{EventReceiver, Socket, SocketEvent, WebSocketSocket, event_queue};
use crate::tls::{TlsConfig, TlsCredentialSource};
use crate::transport::{Transport, TransportSink, TransportState, WEBSOCKET_TRANSPORT_NAME};

/// Error text reported when the socket has no description of its failure.
pub const UNKNOWN_ERROR: &str = "unknown websocket error";

/// A [`Transport`] over one exclusively owned socket.
///
/// The socket is subscribed at construction and unsubscribed, closed and
/// released, in that order, when the transport is dropped.
pub struct WebSocketTransport<S: Socket = WebSocketSocket> {
    url: Url,
    sink: Arc<dyn TransportSink>,
    credentials: Option<Arc<dyn TlsCredentialSource>>,
    last_send: Option<Instant>,
    state: TransportState,
    events: EventReceiver,
    socket: S,
}

impl WebSocketTransport {
    /// Transport over a [`WebSocketSocket`] with default engine settings.
    #[must_use]
    pub fn new(url: Url, sink: Arc<dyn TransportSink>) -> Self {
        Self::with_socket(url, sink, WebSocketSocket::new())
    }

    /// Transport over a [`WebSocketSocket`] built from `config`.
    #[must_use]
    pub fn with_config(url: Url, sink: Arc<dyn TransportSink>, config: Config) -> Self {
        Self::with_socket(url, sink, WebSocketSocket::with_config(config))
    }

    /// Name this transport registers under.
    #[must_use]
    pub const fn transport_name() -> &'static str {
        WEBSOCKET_TRANSPORT_NAME
    }
}

impl<S: Socket> WebSocketTransport<S> {
    /// Transport over a caller-supplied socket.
    pub fn with_socket(url: Url, sink: Arc<dyn TransportSink>, mut socket: S) -> Self {
        let (sender, events) = event_queue();
        socket.subscribe(sender);
        Self {
            url,
            sink,
            credentials: None,
            last_send: None,
            state: TransportState::Idle,
            events,
            socket,
        }
    }

    /// Load TLS material from `credentials` on every connect attempt.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn TlsCredentialSource>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// The owned socket.
    #[must_use]
    pub fn socket(&self) -> &S {
        &self.socket
    }

    /// Wait for the next socket event and deliver it to the sink.
    ///
    /// Resolves to `false` if the event queue is closed.
    pub async fn dispatch_next(&mut self) -> bool {
        poll_fn(|cx| self.poll_dispatch(cx)).await
    }

    fn transition(&mut self, next: TransportState) {
        if self.state != next {
            debug!(url = %self.url, from = %self.state, to = %next, "transport state");
            self.state = next;
        }
    }

    fn handle(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Connected => {
                if self.state != TransportState::Closing {
                    self.transition(TransportState::Open);
                }
                self.sink.on_connected();
            }
            SocketEvent::Disconnected => {
                let error = self.socket.error_string();
                if !error.is_empty() {
                    debug!(url = %self.url, %error, "disconnected after error");
                }
                self.transition(TransportState::Idle);
                self.sink.on_disconnected();
            }
            SocketEvent::TextReceived(text) => {
                if text.is_empty() {
                    trace!("empty text message dropped");
                } else {
                    self.sink.on_text_received(&text);
                }
            }
            SocketEvent::BinaryReceived(data) => {
                if data.is_empty() {
                    trace!("empty binary message dropped");
                } else {
                    self.sink.on_data_received(&data);
                }
            }
            SocketEvent::Error(kind) => {
                let mut message = self.socket.error_string();
                if message.is_empty() {
                    message = UNKNOWN_ERROR.to_owned();
                }
                debug!(url = %self.url, %kind, error = %message, "transport error");
                if self.state != TransportState::Idle {
                    self.transition(TransportState::Closing);
                }
                self.sink.on_error(&message);
            }
        }
    }
}

impl<S: Socket> Transport for WebSocketTransport<S> {
    fn name(&self) -> &'static str {
        WEBSOCKET_TRANSPORT_NAME
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn connect_to_server(&mut self) {
        if !self.state.can_connect() {
            debug!(url = %self.url, state = %self.state, "connect ignored");
            return;
        }

        if let Some(credentials) = &self.credentials {
            TlsConfig::assemble(credentials.as_ref()).apply_to(&mut self.socket);
        }

        debug!(url = %self.url, "connecting");
        self.transition(TransportState::Connecting);
        self.socket.open(&self.url);
    }

    fn disconnect_from_server(&mut self) {
        if !self.state.is_active() {
            trace!(state = %self.state, "disconnect ignored");
            return;
        }
        self.transition(TransportState::Closing);
        self.socket.close();
    }

    fn send_text(&mut self, text: &str) {
        self.last_send = Some(Instant::now());
        self.socket.send_text(text);
    }

    fn send_data(&mut self, data: &[u8]) {
        self.last_send = Some(Instant::now());
        self.socket.send_binary(data);
    }

    fn last_send_time(&self) -> Option<Instant> {
        self.last_send
    }

    fn state(&self) -> TransportState {
        self.state
    }

    fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    fn poll_dispatch(&mut self, cx: &mut Context<'_>) -> Poll<bool> {
        match self.events.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                self.handle(event);
                Poll::Ready(true)
            }
            Poll::Ready(None) => Poll::Ready(false),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: Socket> Drop for WebSocketTransport<S> {
    fn drop(&mut self) {
        self.socket.unsubscribe();
        self.events.close();
        while self.events.try_recv().is_ok() {}
        self.socket.close();
        self.state = TransportState::Closed;
        debug!(url = %self.url, "transport released");
    }
}

impl<S: Socket> std::fmt::Debug for WebSocketTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("url", &self.url.as_str())
            .field("state", &self.state)
            .field("last_send", &self.last_send)
            .field("has_credentials", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}
