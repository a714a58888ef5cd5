//! TCP stream transport for the cosmo protocol.
//!
//! This is the lowest layer of cosmo. It opens byte-stream connections to a
//! host/port pair and hands back a [`CosmoStream`] that everything else
//! builds on. With the `async` feature, [`connect_async`] returns a tokio
//! stream for the async session.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::CosmoStream;
#[cfg(feature = "async")]
pub use tcp::connect_async;
pub use tcp::{connect, connect_timeout, display_addr};
