//! Message tags.
//!
//! The tag is the first header byte and selects the payload layout.

use std::fmt;

use crate::error::FrameError;

/// Wire discriminant for each message variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Protocol version announcement, always id 0.
    Handshake = 0x01,
    /// Status code plus text, sent by the remote host.
    Response = 0x02,
    /// Read a named register.
    GetRegister = 0x03,
    /// Write a named register.
    PutRegister = 0x04,
    /// Opaque text data.
    Write = 0x05,
    /// Leveled log line.
    Log = 0x06,
    /// End of session.
    Close = 0x07,
}

impl MessageKind {
    /// All kinds in tag order.
    pub const ALL: [MessageKind; 7] = [
        MessageKind::Handshake,
        MessageKind::Response,
        MessageKind::GetRegister,
        MessageKind::PutRegister,
        MessageKind::Write,
        MessageKind::Log,
        MessageKind::Close,
    ];

    /// The tag byte written on the wire.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Handshake => "HANDSHAKE",
            MessageKind::Response => "RESPONSE",
            MessageKind::GetRegister => "GETREGISTER",
            MessageKind::PutRegister => "PUTREGISTER",
            MessageKind::Write => "WRITE",
            MessageKind::Log => "LOG",
            MessageKind::Close => "CLOSE",
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = FrameError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0x01 => Ok(MessageKind::Handshake),
            0x02 => Ok(MessageKind::Response),
            0x03 => Ok(MessageKind::GetRegister),
            0x04 => Ok(MessageKind::PutRegister),
            0x05 => Ok(MessageKind::Write),
            0x06 => Ok(MessageKind::Log),
            0x07 => Ok(MessageKind::Close),
            other => Err(FrameError::UnknownTag(other)),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
