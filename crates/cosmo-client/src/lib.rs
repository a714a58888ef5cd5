//! Client session management for the cosmo protocol.
//!
//! A session owns one connection and one message-id counter. Connecting
//! sends the handshake (id 0); every later id-bearing send draws the next id
//! from the counter, starting at 1. Closing sends a final `Close` message and
//! consumes the session.

#[cfg(feature = "async")]
pub mod async_session;
pub mod config;
pub mod connector;
pub mod error;
pub mod session;

#[cfg(feature = "async")]
pub use async_session::{connect_async, with_async_session, AsyncSession};
pub use config::{ClientConfig, ConfigError, DEFAULT_HOST, PORT_ENV, PROTOCOL_VERSION};
pub use connector::{connect, connect_with_config, with_session};
pub use error::{ClientError, Result};
pub use session::Session;
