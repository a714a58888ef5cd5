use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use cosmo_transport::CosmoStream;

use crate::codec::{decode_message, Frame, FrameConfig, MessageHeader, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::writer::transport_to_frame_error;

/// Smallest read attempted; several small messages often arrive together.
const MIN_READ: usize = 4 * 1024;

/// Reads complete messages from any `Read` stream.
///
/// Bytes past the end of one message stay buffered for the next call, so
/// callers always get whole frames regardless of how the stream splits them.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            config,
        }
    }

    /// Block until the next complete message is available.
    ///
    /// EOF, including EOF partway through a message, is
    /// [`FrameError::ConnectionClosed`]. An expired read timeout surfaces as
    /// [`FrameError::Io`] and keeps any partial message buffered.
    pub fn read_frame(&mut self) -> Result<Frame> {
        while !self.message_ready()? {
            if self.pull()? == 0 {
                return Err(FrameError::ConnectionClosed);
            }
        }
        decode_message(&mut self.buf, self.config.max_payload_size)?
            .ok_or(FrameError::ConnectionClosed)
    }

    /// Whether the buffer already holds a whole message. Validates the
    /// header (tag and size cap) as soon as it is readable.
    fn message_ready(&self) -> Result<bool> {
        match MessageHeader::parse(&self.buf)? {
            Some(header) => {
                let plen = header.plen as usize;
                if plen > self.config.max_payload_size {
                    return Err(FrameError::PayloadTooLarge {
                        size: plen,
                        max: self.config.max_payload_size,
                    });
                }
                Ok(self.buf.len() >= HEADER_SIZE + plen)
            }
            None => Ok(false),
        }
    }

    /// Read once into the buffer's tail. Returns the byte count, 0 at EOF.
    fn pull(&mut self) -> Result<usize> {
        let missing = match MessageHeader::parse(&self.buf)? {
            Some(header) => (HEADER_SIZE + header.plen as usize).saturating_sub(self.buf.len()),
            None => HEADER_SIZE - self.buf.len(),
        };
        let start = self.buf.len();
        self.buf.resize(start + missing.max(MIN_READ), 0);

        loop {
            match self.inner.read(&mut self.buf[start..]) {
                Ok(n) => {
                    self.buf.truncate(start + n);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(FrameError::Io(err));
                }
            }
        }
    }

    /// Bytes received but not yet consumed as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<CosmoStream> {
    /// Wrap a connected stream, applying the configured read timeout.
    pub fn with_config_stream(inner: CosmoStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
