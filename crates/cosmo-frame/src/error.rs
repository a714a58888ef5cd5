use crate::kind::MessageKind;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the header length field or the configured cap.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The message id does not fit the 16-bit header field.
    #[error("message id {0} does not fit in 16 bits")]
    IdOutOfRange(u32),

    /// The header carries a tag outside the known message set.
    #[error("unknown message tag 0x{0:02x}")]
    UnknownTag(u8),

    /// The payload does not match the layout required by its tag.
    #[error("malformed {kind} payload: {reason}")]
    Malformed {
        kind: MessageKind,
        reason: &'static str,
    },

    /// A text field is not valid UTF-8.
    #[error("invalid UTF-8 in {kind} payload: {source}")]
    InvalidUtf8 {
        kind: MessageKind,
        source: std::str::Utf8Error,
    },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was transferred.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True for failures raised while serializing an outgoing message.
    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::PayloadTooLarge { .. } | Self::IdOutOfRange(_))
    }

    /// True for failures of the underlying stream rather than the data.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
