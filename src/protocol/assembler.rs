//! Reassembly of fragmented data messages.

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::{Frame, OpCode};

/// A complete data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembledMessage {
    /// Text message, already checked to be UTF-8.
    Text(String),
    /// Binary message.
    Binary(Vec<u8>),
}

/// Collects data frames until FIN and enforces message limits.
#[derive(Debug)]
pub struct MessageAssembler {
    buffer: Vec<u8>,
    fragment_count: usize,
    opcode: Option<OpCode>,
    limits: Limits,
}

impl MessageAssembler {
    /// Create an assembler bounded by `limits`.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: Vec::new(),
            fragment_count: 0,
            opcode: None,
            limits,
        }
    }

    /// Add a data frame to the message being assembled.
    ///
    /// Returns `Some` once the final fragment arrives. Control frames are ignored.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolViolation` for an unexpected or missing continuation
    /// - limit errors from [`Limits`]
    /// - `Error::InvalidUtf8` if a completed text message is not UTF-8
    pub fn push(&mut self, frame: Frame) -> Result<Option<AssembledMessage>> {
        if frame.opcode.is_control() {
            return Ok(None);
        }

        match (frame.opcode, self.opcode) {
            (OpCode::Continuation, None) => {
                return Err(Error::ProtocolViolation(
                    "Unexpected continuation frame".into(),
                ));
            }
            (OpCode::Continuation, Some(_)) => {}
            (_, Some(_)) => {
                return Err(Error::ProtocolViolation(
                    "Expected continuation frame".into(),
                ));
            }
            (opcode, None) => self.opcode = Some(opcode),
        }

        self.limits
            .check_fragment_count(self.fragment_count + 1)?;
        self.limits
            .check_message_size(self.buffer.len() + frame.payload().len())?;

        let fin = frame.fin;
        self.buffer.extend_from_slice(frame.payload());
        self.fragment_count += 1;

        if !fin {
            return Ok(None);
        }

        let payload = std::mem::take(&mut self.buffer);
        let opcode = self.opcode.take();
        self.fragment_count = 0;

        match opcode {
            Some(OpCode::Text) => String::from_utf8(payload)
                .map(|text| Some(AssembledMessage::Text(text)))
                .map_err(|_| Error::InvalidUtf8),
            _ => Ok(Some(AssembledMessage::Binary(payload))),
        }
    }

    /// Whether a fragmented message is in progress.
    #[must_use]
    pub fn is_assembling(&self) -> bool {
        self.opcode.is_some()
    }
}
