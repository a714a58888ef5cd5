use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::encode_message;
use crate::error::{FrameError, Result};
use crate::kind::MessageKind;

/// Byte placed between the two text-like fields of `PutRegister` and
/// after the level byte of `Log`.
///
/// Fields are not length-prefixed, so a register name containing this byte
/// cannot be recovered by [`Message::decode_payload`].
pub const FIELD_SEPARATOR: u8 = 0x00;

/// A cosmo message. Each variant maps to exactly one [`MessageKind`].
///
/// Payload layouts:
/// ```text
/// Handshake    [version:u16 BE]
/// Response     [code:u8][data...]
/// GetRegister  [type:u8][name...]
/// PutRegister  [type:u8][name...][0x00][data...]
/// Write        [data...]
/// Log          [level:u8][0x00][message...]
/// Close        (empty)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Handshake {
        version: u16,
    },
    Response {
        code: u8,
        data: String,
    },
    GetRegister {
        register_type: u8,
        name: String,
    },
    PutRegister {
        register_type: u8,
        name: String,
        data: String,
    },
    Write {
        data: String,
    },
    Log {
        level: u8,
        message: String,
    },
    Close,
}

impl Message {
    pub fn handshake(version: u16) -> Self {
        Self::Handshake { version }
    }

    pub fn response(code: u8, data: impl Into<String>) -> Self {
        Self::Response {
            code,
            data: data.into(),
        }
    }

    pub fn get_register(register_type: u8, name: impl Into<String>) -> Self {
        Self::GetRegister {
            register_type,
            name: name.into(),
        }
    }

    pub fn put_register(
        register_type: u8,
        name: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self::PutRegister {
            register_type,
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn write(data: impl Into<String>) -> Self {
        Self::Write { data: data.into() }
    }

    pub fn log(level: u8, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// The tag this message is sent with.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Handshake { .. } => MessageKind::Handshake,
            Message::Response { .. } => MessageKind::Response,
            Message::GetRegister { .. } => MessageKind::GetRegister,
            Message::PutRegister { .. } => MessageKind::PutRegister,
            Message::Write { .. } => MessageKind::Write,
            Message::Log { .. } => MessageKind::Log,
            Message::Close => MessageKind::Close,
        }
    }

    /// Serialized payload length in bytes (the header's `plen`).
    pub fn payload_len(&self) -> usize {
        match self {
            Message::Handshake { .. } => 2,
            Message::Response { data, .. } => 1 + data.len(),
            Message::GetRegister { name, .. } => 1 + name.len(),
            Message::PutRegister { name, data, .. } => 1 + name.len() + 1 + data.len(),
            Message::Write { data } => data.len(),
            Message::Log { message, .. } => 2 + message.len(),
            Message::Close => 0,
        }
    }

    /// Append the payload bytes to `dst`.
    pub fn encode_payload(&self, dst: &mut BytesMut) {
        dst.reserve(self.payload_len());
        match self {
            Message::Handshake { version } => dst.put_u16(*version),
            Message::Response { code, data } => {
                dst.put_u8(*code);
                dst.put_slice(data.as_bytes());
            }
            Message::GetRegister {
                register_type,
                name,
            } => {
                dst.put_u8(*register_type);
                dst.put_slice(name.as_bytes());
            }
            Message::PutRegister {
                register_type,
                name,
                data,
            } => {
                dst.put_u8(*register_type);
                dst.put_slice(name.as_bytes());
                dst.put_u8(FIELD_SEPARATOR);
                dst.put_slice(data.as_bytes());
            }
            Message::Write { data } => dst.put_slice(data.as_bytes()),
            Message::Log { level, message } => {
                dst.put_u8(*level);
                dst.put_u8(FIELD_SEPARATOR);
                dst.put_slice(message.as_bytes());
            }
            Message::Close => {}
        }
    }

    /// Parse a payload using the layout selected by `kind`.
    pub fn decode_payload(kind: MessageKind, payload: &[u8]) -> Result<Self> {
        match kind {
            MessageKind::Handshake => {
                let bytes: [u8; 2] = payload.try_into().map_err(|_| FrameError::Malformed {
                    kind,
                    reason: "handshake payload must be exactly 2 bytes",
                })?;
                Ok(Message::Handshake {
                    version: u16::from_be_bytes(bytes),
                })
            }
            MessageKind::Response => {
                let (code, rest) = split_leading_byte(kind, payload)?;
                Ok(Message::Response {
                    code,
                    data: text(kind, rest)?,
                })
            }
            MessageKind::GetRegister => {
                let (register_type, rest) = split_leading_byte(kind, payload)?;
                Ok(Message::GetRegister {
                    register_type,
                    name: text(kind, rest)?,
                })
            }
            MessageKind::PutRegister => {
                let (register_type, rest) = split_leading_byte(kind, payload)?;
                let sep = rest
                    .iter()
                    .position(|b| *b == FIELD_SEPARATOR)
                    .ok_or(FrameError::Malformed {
                        kind,
                        reason: "missing name/data separator",
                    })?;
                Ok(Message::PutRegister {
                    register_type,
                    name: text(kind, &rest[..sep])?,
                    data: text(kind, &rest[sep + 1..])?,
                })
            }
            MessageKind::Write => Ok(Message::Write {
                data: text(kind, payload)?,
            }),
            MessageKind::Log => {
                let (level, rest) = split_leading_byte(kind, payload)?;
                match rest.split_first() {
                    Some((&FIELD_SEPARATOR, message)) => Ok(Message::Log {
                        level,
                        message: text(kind, message)?,
                    }),
                    _ => Err(FrameError::Malformed {
                        kind,
                        reason: "missing separator after level",
                    }),
                }
            }
            MessageKind::Close => {
                if payload.is_empty() {
                    Ok(Message::Close)
                } else {
                    Err(FrameError::Malformed {
                        kind,
                        reason: "close payload must be empty",
                    })
                }
            }
        }
    }

    /// Encode header and payload into a standalone buffer.
    pub fn to_bytes(&self, id: u16) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        encode_message(self, id, &mut buf)?;
        Ok(buf.freeze())
    }
}

fn split_leading_byte(kind: MessageKind, payload: &[u8]) -> Result<(u8, &[u8])> {
    payload
        .split_first()
        .map(|(first, rest)| (*first, rest))
        .ok_or(FrameError::Malformed {
            kind,
            reason: "payload shorter than its fixed fields",
        })
}

fn text(kind: MessageKind, bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|source| FrameError::InvalidUtf8 { kind, source })
}
