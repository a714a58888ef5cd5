//! Tagged, length-prefixed message codec for the cosmo protocol.
//!
//! Every message is framed with a 7-byte big-endian header:
//! - A 1-byte tag selecting the message variant
//! - A 2-byte message id (0 for the handshake)
//! - A 4-byte payload length
//!
//! The payload layout is a pure function of the tag; see [`Message`].

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod kind;
pub mod message;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::CosmoCodec;
pub use codec::{
    decode_message, encode_message, Frame, FrameConfig, MessageHeader, DEFAULT_MAX_PAYLOAD,
    HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use kind::MessageKind;
pub use message::{Message, FIELD_SEPARATOR};
pub use reader::FrameReader;
pub use writer::FrameWriter;
