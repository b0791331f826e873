//! Notifications a socket posts to its subscriber.

use tokio::sync::mpsc;

use crate::error::Error;

/// One notification from the underlying connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The upgrade handshake completed; sends are accepted.
    Connected,
    /// The connection is gone, whatever the cause.
    Disconnected,
    /// A complete text message arrived. May be empty.
    TextReceived(String),
    /// A complete binary message arrived. May be empty.
    BinaryReceived(Vec<u8>),
    /// A failure occurred; the description is available from
    /// [`Socket::error_string`](crate::socket::Socket::error_string).
    Error(SocketErrorKind),
}

/// Sending half of a socket's event queue.
pub type EventSender = mpsc::UnboundedSender<SocketEvent>;

/// Receiving half of a socket's event queue.
pub type EventReceiver = mpsc::UnboundedReceiver<SocketEvent>;

/// Create the queue a transport drains socket events from.
#[must_use]
pub fn event_queue() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Coarse classification of a socket failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SocketErrorKind {
    /// The server refused the TCP connection.
    ConnectionRefused,
    /// The peer dropped the connection without a close handshake.
    RemoteHostClosed,
    /// Name resolution failed.
    HostNotFound,
    /// Connect or close took too long.
    Timeout,
    /// Any other I/O failure.
    Network,
    /// TLS setup or handshake failed.
    Tls,
    /// The server did not accept the HTTP upgrade.
    Handshake,
    /// The peer violated RFC 6455 or a configured limit.
    Protocol,
    /// The URL cannot be used for a WebSocket connection.
    InvalidUrl,
    /// No async runtime was available to run the connection.
    Runtime,
}

impl From<&Error> for SocketErrorKind {
    fn from(err: &Error) -> Self {
        use std::io::ErrorKind;

        match err {
            Error::Io { kind, .. } => match kind {
                ErrorKind::ConnectionRefused => SocketErrorKind::ConnectionRefused,
                ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe
                | ErrorKind::UnexpectedEof => SocketErrorKind::RemoteHostClosed,
                ErrorKind::TimedOut => SocketErrorKind::Timeout,
                ErrorKind::NotFound => SocketErrorKind::HostNotFound,
                _ => SocketErrorKind::Network,
            },
            Error::ConnectionClosed(_) => SocketErrorKind::RemoteHostClosed,
            Error::InvalidHandshake(_)
            | Error::HandshakeTooLarge { .. }
            | Error::InvalidHeaderValue { .. } => SocketErrorKind::Handshake,
            Error::InvalidUrl(_) => SocketErrorKind::InvalidUrl,
            Error::Tls(_) => SocketErrorKind::Tls,
            Error::Timeout(_) => SocketErrorKind::Timeout,
            Error::Runtime(_) => SocketErrorKind::Runtime,
            _ => SocketErrorKind::Protocol,
        }
    }
}

impl std::fmt::Display for SocketErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SocketErrorKind::ConnectionRefused => "connection refused",
            SocketErrorKind::RemoteHostClosed => "remote host closed",
            SocketErrorKind::HostNotFound => "host not found",
            SocketErrorKind::Timeout => "timeout",
            SocketErrorKind::Network => "network error",
            SocketErrorKind::Tls => "TLS error",
            SocketErrorKind::Handshake => "handshake rejected",
            SocketErrorKind::Protocol => "protocol error",
            SocketErrorKind::InvalidUrl => "invalid URL",
            SocketErrorKind::Runtime => "no runtime",
        };
        f.write_str(name)
    }
}
