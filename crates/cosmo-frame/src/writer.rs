use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use cosmo_transport::CosmoStream;
use tracing::trace;

use crate::codec::{encode_message, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::message::Message;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete messages to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<usize> {
        self.send(frame.id, &frame.message)
    }

    /// Encode and send a message with the given id.
    ///
    /// Returns the number of bytes put on the stream. The message is fully
    /// encoded before anything is written, so an encoding failure leaves the
    /// stream untouched. A write that hits the stream's write timeout fails
    /// with `ErrorKind::TimedOut` and may leave a partial message behind.
    pub fn send(&mut self, id: u16, message: &Message) -> Result<usize> {
        if let Some(max) = self.config.max_write_size {
            let size = message.payload_len();
            if size > max {
                return Err(FrameError::PayloadTooLarge { size, max });
            }
        }

        self.buf.clear();
        encode_message(message, id, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(write_failure(err, offset)),
            }
        }

        self.flush()?;
        trace!(kind = %message.kind(), id, bytes = offset, "frame written");
        Ok(offset)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(write_failure(err, 0)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<CosmoStream> {
    /// Create a frame writer for `CosmoStream` and apply write timeout from config.
    pub fn with_config_stream(inner: CosmoStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

/// Blocking sockets report an expired `SO_SNDTIMEO` as `WouldBlock` on Unix.
fn write_failure(err: std::io::Error, written: usize) -> FrameError {
    if err.kind() == ErrorKind::WouldBlock {
        return FrameError::Io(std::io::Error::new(
            ErrorKind::TimedOut,
            format!("write timed out after {written} bytes"),
        ));
    }
    FrameError::Io(err)
}

pub(crate) fn transport_to_frame_error(err: cosmo_transport::TransportError) -> FrameError {
    match err {
        cosmo_transport::TransportError::Io(io) => FrameError::Io(io),
        cosmo_transport::TransportError::Resolve { source, .. }
        | cosmo_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        cosmo_transport::TransportError::Shutdown => FrameError::ConnectionClosed,
    }
}
