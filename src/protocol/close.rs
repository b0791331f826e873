//! Close frame payloads (RFC 6455 section 5.5.1).

use crate::error::{Error, Result};

/// Status code sent when the client closes the connection on its own.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Decoded close frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// Status code chosen by the peer.
    pub code: u16,
    /// UTF-8 reason, possibly empty.
    pub reason: String,
}

impl CloseFrame {
    /// Decode a close payload. An empty payload carries no status.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolViolation` for a one-byte payload or a code that may not be sent
    /// - `Error::InvalidUtf8` if the reason is not UTF-8
    pub fn parse(payload: &[u8]) -> Result<Option<Self>> {
        match payload {
            [] => Ok(None),
            [_] => Err(Error::ProtocolViolation(
                "close payload of one byte".into(),
            )),
            [hi, lo, reason @ ..] => {
                let code = u16::from_be_bytes([*hi, *lo]);
                if !is_sendable(code) {
                    return Err(Error::ProtocolViolation(format!(
                        "invalid close code {code}"
                    )));
                }
                let reason = std::str::from_utf8(reason)?.to_owned();
                Ok(Some(Self { code, reason }))
            }
        }
    }
}

/// Whether an endpoint may put `code` on the wire.
#[must_use]
pub const fn is_sendable(code: u16) -> bool {
    matches!(code, 1000..=1003 | 1007..=1014 | 3000..=4999)
}
