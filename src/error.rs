//! Error types for the WebSocket client engine.
//!
//! These errors never reach a [`TransportSink`](crate::transport::TransportSink)
//! directly. The socket driver records their `Display` text as the socket's
//! error string and reports a [`SocketErrorKind`](crate::socket::SocketErrorKind)
//! derived from them.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while establishing or running a WebSocket connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Invalid frame structure or header.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Protocol violation detected.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Invalid UTF-8 in text frame.
    #[error("Invalid UTF-8 in text frame")]
    InvalidUtf8,

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Too many fragments in a single message.
    #[error("Too many fragments: {count} (max: {max})")]
    TooManyFragments {
        /// Actual fragment count.
        count: usize,
        /// Maximum allowed fragments.
        max: usize,
    },

    /// Connection has been closed.
    #[error("Connection closed: {0:?}")]
    ConnectionClosed(Option<u16>),

    /// Invalid WebSocket handshake.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Handshake response exceeds configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Header value contains characters that would break the request.
    #[error("Invalid header value for {header}: {reason}")]
    InvalidHeaderValue {
        /// Header name.
        header: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// I/O error occurred.
    #[error("{message}")]
    Io {
        /// Kind of the originating `std::io::Error`.
        kind: std::io::ErrorKind,
        /// Human-readable description.
        message: String,
    },

    /// The target URL cannot be used for a WebSocket connection.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// TLS setup or handshake failure.
    #[error("TLS error: {0}")]
    Tls(String),

    /// An operation did not complete in time.
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// No tokio runtime is available to drive the connection.
    #[error("No async runtime available: {0}")]
    Runtime(String),

    /// Reserved opcode used.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Control frame fragmented (RFC violation).
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload too large (>125 bytes).
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Masked server frame (security violation).
    #[error("Server frame must not be masked")]
    MaskedServerFrame,

    /// Reserved bits set without extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Incomplete frame data.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },

    /// Invalid opcode value.
    #[error("Invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    /// Payload length does not fit in `usize` on this platform.
    #[error("Payload too large for platform: {size} bytes (max: {max})")]
    PayloadTooLargeForPlatform {
        /// Declared payload size.
        size: u64,
        /// Largest representable size.
        max: u64,
    },
}

impl Error {
    /// Returns the close code to send to the peer when this error ends a connection.
    ///
    /// `None` means the connection is already unusable and no close frame should be sent.
    #[must_use]
    pub const fn close_code(&self) -> Option<u16> {
        match self {
            Error::InvalidUtf8 => Some(1007),
            Error::FrameTooLarge { .. }
            | Error::MessageTooLarge { .. }
            | Error::TooManyFragments { .. } => Some(1009),
            Error::InvalidFrame(_)
            | Error::ProtocolViolation(_)
            | Error::ReservedOpcode(_)
            | Error::InvalidOpcode(_)
            | Error::FragmentedControlFrame
            | Error::ControlFrameTooLarge(_)
            | Error::MaskedServerFrame
            | Error::ReservedBitsSet => Some(1002),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::FrameTooLarge {
            size: 20_000_000,
            max: 16_000_000,
        };
        assert_eq!(
            err.to_string(),
            "Frame too large: 20000000 bytes (max: 16000000)"
        );
    }

    #[test]
    fn test_error_from_io_keeps_kind_and_text() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let ws_err: Error = io_err.into();
        assert_eq!(
            ws_err,
            Error::Io {
                kind: std::io::ErrorKind::ConnectionRefused,
                message: "refused".into(),
            }
        );
        assert_eq!(ws_err.to_string(), "refused");
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(Error::Timeout("connect").to_string(), "connect timed out");
    }

    #[test]
    fn test_close_codes() {
        assert_eq!(Error::InvalidUtf8.close_code(), Some(1007));
        assert_eq!(
            Error::MessageTooLarge { size: 2, max: 1 }.close_code(),
            Some(1009)
        );
        assert_eq!(Error::MaskedServerFrame.close_code(), Some(1002));
        assert_eq!(Error::Timeout("close").close_code(), None);
    }
}
