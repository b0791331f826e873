//! Frame I/O over the two halves of an established stream.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::{Frame, FrameHeader, MaskGenerator};

/// Reads server frames, enforcing client-side rules and frame limits.
pub(crate) struct FrameReader<R> {
    io: R,
    buf: BytesMut,
    limits: Limits,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// `buffered` holds bytes already read past the handshake response.
    pub(crate) fn new(io: R, buffered: BytesMut, limits: Limits) -> Self {
        Self {
            io,
            buf: buffered,
            limits,
        }
    }

    /// Read the next complete frame.
    ///
    /// Cancel safe: bytes read before cancellation stay buffered.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` if the peer closed the stream
    /// - `Error::MaskedServerFrame` for a masked frame
    /// - `Error::FrameTooLarge` if the declared payload exceeds the limit
    /// - header and validation errors from [`Frame`]
    pub(crate) async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match FrameHeader::parse(&self.buf) {
                Ok(header) => {
                    if header.mask.is_some() {
                        return Err(Error::MaskedServerFrame);
                    }
                    self.limits.check_frame_size(header.payload_len)?;
                    if self.buf.len() - header.header_len >= header.payload_len {
                        let (frame, consumed) = Frame::parse(&self.buf)?;
                        self.buf.advance(consumed);
                        frame.validate()?;
                        return Ok(frame);
                    }
                }
                Err(Error::IncompleteFrame { .. }) => {}
                Err(e) => return Err(e),
            }

            if self.io.read_buf(&mut self.buf).await? == 0 {
                return Err(Error::ConnectionClosed(None));
            }
        }
    }
}

/// Writes masked client frames.
pub(crate) struct FrameWriter<W> {
    io: W,
    buf: BytesMut,
    masks: MaskGenerator,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub(crate) fn new(io: W) -> Self {
        Self {
            io,
            buf: BytesMut::new(),
            masks: MaskGenerator::new(),
        }
    }

    /// Encode and flush one frame.
    pub(crate) async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        frame.encode(Some(self.masks.next_mask()), &mut self.buf);
        self.io.write_all(&self.buf).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Shut down the write side; for TLS this sends close_notify.
    pub(crate) async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }
}
