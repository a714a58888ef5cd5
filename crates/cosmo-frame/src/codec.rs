use bytes::{Buf, BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::kind::MessageKind;
use crate::message::Message;

/// Frame header: tag (1) + id (2) + payload length (4) = 7 bytes.
pub const HEADER_SIZE: usize = 7;

/// Default maximum payload size accepted when decoding: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Fixed-size header preceding every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub tag: MessageKind,
    pub id: u16,
    pub plen: u32,
}

impl MessageHeader {
    /// Serialize to the 7-byte big-endian wire form.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0] = self.tag.tag();
        out[1..3].copy_from_slice(&self.id.to_be_bytes());
        out[3..7].copy_from_slice(&self.plen.to_be_bytes());
        out
    }

    /// Parse a header from the first [`HEADER_SIZE`] bytes of `src`.
    ///
    /// Returns `Ok(None)` if fewer bytes are available.
    pub fn parse(src: &[u8]) -> Result<Option<Self>> {
        let Some(head) = src.get(..HEADER_SIZE) else {
            return Ok(None);
        };
        let tag = MessageKind::try_from(head[0])?;
        let id = u16::from_be_bytes([head[1], head[2]]);
        let plen = u32::from_be_bytes([head[3], head[4], head[5], head[6]]);
        Ok(Some(Self { tag, id, plen }))
    }
}

/// A decoded message together with the id it was framed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Header id (0 for the handshake and unsolicited messages).
    pub id: u16,
    /// The typed message.
    pub message: Message,
}

impl Frame {
    /// Create a new frame.
    pub fn new(id: u16, message: Message) -> Self {
        Self { id, message }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.message.payload_len()
    }
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌─────────┬──────────┬────────────┬────────────────────┐
/// │ Tag     │ Id       │ Length     │ Payload            │
/// │ (1B)    │ (2B BE)  │ (4B BE)    │ (Length bytes)     │
/// └─────────┴──────────┴────────────┴────────────────────┘
/// ```
pub fn encode_message(message: &Message, id: u16, dst: &mut BytesMut) -> Result<()> {
    let payload_len = message.payload_len();
    let plen = u32::try_from(payload_len).map_err(|_| FrameError::PayloadTooLarge {
        size: payload_len,
        max: u32::MAX as usize,
    })?;
    let header = MessageHeader {
        tag: message.kind(),
        id,
        plen,
    };
    dst.reserve(HEADER_SIZE + payload_len);
    dst.put_slice(&header.encode());
    message.encode_payload(dst);
    Ok(())
}

/// Decode one message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. An unknown tag is
/// reported as soon as the header is available.
pub fn decode_message(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    let Some(header) = MessageHeader::parse(src)? else {
        return Ok(None); // Need more data
    };

    let payload_len = header.plen as usize;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len);
    let message = Message::decode_payload(header.tag, &payload)?;

    Ok(Some(Frame {
        id: header.id,
        message,
    }))
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest inbound payload accepted when decoding. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Optional cap on outbound payloads. `None` leaves only the 32-bit
    /// length field as a limit.
    pub max_write_size: Option<usize>,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            max_write_size: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
