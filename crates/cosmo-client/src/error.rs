use cosmo_frame::{FrameError, MessageKind};
use cosmo_transport::TransportError;

use crate::config::ConfigError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport could not be established or was lost mid-session.
    #[error("connection error: {0}")]
    Connection(#[from] TransportError),

    /// An outgoing message could not be serialized.
    #[error("encoding error: {0}")]
    Encoding(FrameError),

    /// An incoming message could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(FrameError),

    /// The session configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Handshake and Close are sent by the session itself, never through `send`.
    #[error("{0} is sent by the session lifecycle, not by send")]
    Lifecycle(MessageKind),
}

impl ClientError {
    /// Classify a failure from the send path.
    pub(crate) fn from_send(err: FrameError) -> Self {
        match err {
            FrameError::Io(io) => Self::Connection(TransportError::Io(io)),
            FrameError::ConnectionClosed => Self::Connection(TransportError::Shutdown),
            other => Self::Encoding(other),
        }
    }

    /// Classify a failure from the receive path.
    pub(crate) fn from_recv(err: FrameError) -> Self {
        match err {
            FrameError::Io(io) => Self::Connection(TransportError::Io(io)),
            FrameError::ConnectionClosed => Self::Connection(TransportError::Shutdown),
            other => Self::Protocol(other),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::Encoding(_))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
