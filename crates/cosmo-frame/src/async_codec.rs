//! `tokio_util::codec` adapter for async streams.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_message, encode_message, Frame, DEFAULT_MAX_PAYLOAD};
use crate::error::{FrameError, Result};

/// Codec for use with `FramedRead` / `FramedWrite`.
///
/// The payload cap applies to decoding only. Outbound frames are limited
/// only when [`CosmoCodec::with_max_write`] sets a cap.
#[derive(Debug, Clone)]
pub struct CosmoCodec {
    max_payload_size: usize,
    max_write_size: Option<usize>,
}

impl CosmoCodec {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self {
            max_payload_size,
            max_write_size: None,
        }
    }

    /// Reject outbound payloads larger than `max`.
    pub fn with_max_write(mut self, max: usize) -> Self {
        self.max_write_size = Some(max);
        self
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    pub fn max_write_size(&self) -> Option<usize> {
        self.max_write_size
    }
}

impl Default for CosmoCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for CosmoCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        decode_message(src, self.max_payload_size)
    }
}

impl Encoder<Frame> for CosmoCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        if let Some(max) = self.max_write_size {
            let size = frame.message.payload_len();
            if size > max {
                return Err(FrameError::PayloadTooLarge { size, max });
            }
        }
        encode_message(&frame.message, frame.id, dst)
    }
}
