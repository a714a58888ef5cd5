//! Client for the cosmo tagged binary message protocol.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP stream transport
//! - [`frame`]: message header, variants and the wire codec
//! - [`client`]: session lifecycle and id sequencing (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use cosmo_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cosmo_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use cosmo_client::*;
}
