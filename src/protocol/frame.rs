//! Frame parsing and serialization (RFC 6455 section 5.2).

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask;

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Decoded fixed part of a frame header.
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    /// Final fragment flag.
    pub fin: bool,
    /// RSV1-3 packed into the low three bits.
    pub rsv: u8,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Masking key, present on client-to-server frames.
    pub mask: Option<[u8; 4]>,
    /// Declared payload length.
    pub payload_len: usize,
    /// Bytes occupied by the header, including the masking key.
    pub header_len: usize,
}

impl FrameHeader {
    /// Parse the header at the start of `buf`.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` if `buf` does not hold the whole header yet
    /// - opcode errors from [`OpCode::from_u8`]
    /// - `Error::PayloadTooLargeForPlatform` if the 64-bit length overflows `usize`
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < 2 {
            return Err(Error::IncompleteFrame {
                needed: 2 - buf.len(),
            });
        }

        let fin = buf[0] & 0x80 != 0;
        let rsv = (buf[0] >> 4) & 0x07;
        let opcode = OpCode::from_u8(buf[0] & 0x0F)?;
        let masked = buf[1] & 0x80 != 0;

        let (payload_len, len_end) = match buf[1] & 0x7F {
            126 => {
                need(buf, 4)?;
                (u16::from_be_bytes([buf[2], buf[3]]) as usize, 4)
            }
            127 => {
                need(buf, 10)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&buf[2..10]);
                let len = u64::from_be_bytes(raw);
                let len = usize::try_from(len).map_err(|_| Error::PayloadTooLargeForPlatform {
                    size: len,
                    max: usize::MAX as u64,
                })?;
                (len, 10)
            }
            short => (short as usize, 2),
        };

        let (mask, header_len) = if masked {
            need(buf, len_end + 4)?;
            let mut key = [0u8; 4];
            key.copy_from_slice(&buf[len_end..len_end + 4]);
            (Some(key), len_end + 4)
        } else {
            (None, len_end)
        };

        Ok(Self {
            fin,
            rsv,
            opcode,
            mask,
            payload_len,
            header_len,
        })
    }
}

fn need(buf: &[u8], len: usize) -> Result<()> {
    if buf.len() < len {
        Err(Error::IncompleteFrame {
            needed: len - buf.len(),
        })
    } else {
        Ok(())
    }
}

/// A single WebSocket frame with an unmasked payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. True if this is the last fragment of a message.
    pub fin: bool,
    /// RSV1-3 packed into the low three bits. Must be 0 without extensions.
    pub rsv: u8,
    /// Frame opcode defining the interpretation of payload data.
    pub opcode: OpCode,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            rsv: 0,
            opcode,
            payload,
        }
    }

    /// Create a final text frame.
    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Text, data.into())
    }

    /// Create a final binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Binary, data.into())
    }

    /// Create a close frame with optional status code and reason.
    #[must_use]
    pub fn close(code: Option<u16>, reason: &str) -> Self {
        let payload = match code {
            Some(code) => {
                let mut data = code.to_be_bytes().to_vec();
                data.extend_from_slice(reason.as_bytes());
                data
            }
            None => Vec::new(),
        };
        Self::new(true, OpCode::Close, payload)
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, data.into())
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Pong, data.into())
    }

    /// Payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Parse one frame from `buf`, unmasking the payload if a key is present.
    ///
    /// Returns the frame and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` if not enough data is available
    /// - header errors from [`FrameHeader::parse`]
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        let header = FrameHeader::parse(buf)?;
        let total = header.header_len.checked_add(header.payload_len).ok_or(
            Error::PayloadTooLargeForPlatform {
                size: header.payload_len as u64,
                max: usize::MAX as u64,
            },
        )?;
        need(buf, total)?;

        let mut payload = buf[header.header_len..total].to_vec();
        if let Some(mask) = header.mask {
            apply_mask(&mut payload, mask);
        }

        let frame = Frame {
            fin: header.fin,
            rsv: header.rsv,
            opcode: header.opcode,
            payload,
        };
        Ok((frame, total))
    }

    /// Check the RFC 6455 rules that do not depend on the connection role.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedBitsSet` if RSV bits are set (no extensions are negotiated)
    /// - `Error::FragmentedControlFrame` if a control frame has FIN=0
    /// - `Error::ControlFrameTooLarge` if a control frame payload exceeds 125 bytes
    pub fn validate(&self) -> Result<()> {
        if self.rsv != 0 {
            return Err(Error::ReservedBitsSet);
        }
        if self.opcode.is_control() {
            if !self.fin {
                return Err(Error::FragmentedControlFrame);
            }
            if self.payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
                return Err(Error::ControlFrameTooLarge(self.payload.len()));
            }
        }
        Ok(())
    }

    /// Serialize the frame onto `out`, masking the payload when `mask` is given.
    pub fn encode(&self, mask: Option<[u8; 4]>, out: &mut BytesMut) {
        let len = self.payload.len();
        out.reserve(self.wire_size(mask.is_some()));

        let mut byte0 = self.opcode.as_u8() | ((self.rsv & 0x07) << 4);
        if self.fin {
            byte0 |= 0x80;
        }
        out.put_u8(byte0);

        let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
        if len <= 125 {
            out.put_u8(mask_bit | len as u8);
        } else if len <= usize::from(u16::MAX) {
            out.put_u8(mask_bit | 126);
            out.put_u16(len as u16);
        } else {
            out.put_u8(mask_bit | 127);
            out.put_u64(len as u64);
        }

        match mask {
            Some(key) => {
                out.put_slice(&key);
                let start = out.len();
                out.put_slice(&self.payload);
                apply_mask(&mut out[start..], key);
            }
            None => out.put_slice(&self.payload),
        }
    }

    /// Number of bytes [`encode`](Self::encode) will append.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        let len = self.payload.len();
        let extended = if len <= 125 {
            0
        } else if len <= usize::from(u16::MAX) {
            2
        } else {
            8
        };
        2 + extended + if masked { 4 } else { 0 } + len
    }
}
