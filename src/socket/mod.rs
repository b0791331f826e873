//! The socket abstraction a transport drives, and its WebSocket implementation.
//!
//! A socket owns the network connection. It never calls back into its owner;
//! instead it posts [`SocketEvent`]s to the queue given to
//! [`Socket::subscribe`], and the owner drains that queue on its own thread.

mod codec;
mod event;
mod stream;
mod websocket;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use url::Url;

pub use event::{EventReceiver, EventSender, SocketErrorKind, SocketEvent, event_queue};
pub use websocket::WebSocketSocket;

/// Capabilities a transport needs from its network socket.
///
/// Every operation returns immediately; outcomes arrive as events.
pub trait Socket: Send {
    /// Start posting events to `events`, replacing any previous subscriber.
    fn subscribe(&mut self, events: EventSender);

    /// Stop posting events. Events already queued stay queued.
    fn unsubscribe(&mut self);

    /// Begin connecting to `url`. An open or opening connection is closed first.
    fn open(&mut self, url: &Url);

    /// Begin closing. A no-op when nothing is open.
    fn close(&mut self);

    /// Send a text message. Dropped when not connected.
    fn send_text(&mut self, text: &str);

    /// Send a binary message. Dropped when not connected.
    fn send_binary(&mut self, data: &[u8]);

    /// Description of the most recent failure; empty if none.
    fn error_string(&self) -> String;

    /// Client certificate for future TLS connects. `None` clears it.
    fn set_local_certificate(&mut self, chain: Option<Vec<CertificateDer<'static>>>);

    /// Client private key for future TLS connects. `None` clears it.
    fn set_private_key(&mut self, key: Option<PrivateKeyDer<'static>>);

    /// Trust `certs` in addition to what is already trusted.
    fn add_ca_certificates(&mut self, certs: Vec<CertificateDer<'static>>);
}
